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

//! The codec trait.

use crate::codec::{DeserializationError, SerializationError};

/// Encodes and decodes values that cross the invocation boundary by copy.
///
/// Implementations must be deterministic and symmetric:
/// `deserialize(serialize(v))` reproduces a value equal in observable state
/// to `v` for every serde-compatible value used by service traits.
///
/// Codecs are cloned into every proxy and invoker, so they should be cheap to
/// clone (usually a few configuration fields).
///
/// # Examples
///
/// ```rust
/// use localrpc::codec::{Codec, PostcardCodec};
///
/// let codec = PostcardCodec::default();
/// let bytes = codec.serialize(&(42u64, "answer".to_string())).unwrap();
/// let decoded: (u64, String) = codec.deserialize(&bytes).unwrap();
/// assert_eq!(decoded, (42, "answer".to_string()));
/// ```
pub trait Codec: Clone + Send + Sync + 'static {
    /// Serializes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the value cannot be encoded, for
    /// example when it contains a variant marked `#[serde(skip)]`.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Deserializes bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the bytes are corrupted, were
    /// produced by a different codec, or describe a different type.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Returns the stable name of this codec, used in logs.
    fn name(&self) -> &'static str;
}
