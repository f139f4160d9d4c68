//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Argument, result and failure encoding.
//!
//! Every value that crosses the invocation boundary by copy goes through a
//! [`Codec`]. Values marked `#[bypass]` never enter the codec; they travel as
//! [`BypassValue`](crate::invocation::BypassValue)s instead.
//!
//! # Backends
//!
//! - [`PostcardCodec`] (default): compact binary encoding, optional size limit
//!   on the decoding side.
//! - `JsonCodec` (feature `json`): human-readable, useful when invocation
//!   records are logged or inspected.
//!
//! Both sides of an invocation must use the same codec. Generated proxies and
//! invokers default to [`PostcardCodec`].
//!
//! # Failure decoding
//!
//! Failures are encoded as [`RemoteFailure`](crate::failure::RemoteFailure)
//! envelopes. The envelope decodes without any knowledge of the service's
//! declared error type; the declared error stays an opaque byte payload until
//! the dispatcher decodes it as the method's error type.

mod error;
#[cfg(feature = "json")]
mod json;
mod postcard;
mod traits;

pub use error::{DeserializationError, SerializationError};
#[cfg(feature = "json")]
pub use self::json::JsonCodec;
pub use self::postcard::PostcardCodec;
pub use traits::Codec;
