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

//! Failure envelopes returned by invokers.
//!
//! A failure always crosses the boundary serialized, never by reference. The
//! envelope ([`RemoteFailure`]) is self-contained: it decodes without knowing
//! the service's declared error type. When the service returned a declared
//! error, the envelope is a *remote exception* whose first cause carries that
//! error as an opaque payload; the dispatcher decodes the payload as the
//! method's error type only when it unwraps the failure.
//!
//! # Examples
//!
//! ```rust
//! use localrpc::codec::PostcardCodec;
//! use localrpc::failure::RemoteFailure;
//!
//! #[derive(Debug, serde::Serialize, thiserror::Error)]
//! #[error("account {0} is frozen")]
//! struct Frozen(u64);
//!
//! let failure = RemoteFailure::declared(&PostcardCodec::default(), &Frozen(7));
//! assert!(failure.is_remote_exception());
//! assert!(failure.first_declared_cause().is_some());
//! assert_eq!(failure.causes()[0].message(), "account 7 is frozen");
//! ```

use crate::codec::Codec;
use crate::error::InvocationError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use tracing::warn;

/// Type name of envelopes wrapping a declared service error.
pub const REMOTE_EXCEPTION: &str = "localrpc::RemoteException";

/// Type name of failures raised by a panicking service implementation.
pub const PANIC: &str = "panic";

/// Type name of failures raised by the receiving side's dispatch logic
/// (unknown method, signature mismatch, undecodable argument).
pub const INVOCATION_ERROR: &str = "localrpc::InvocationError";

/// Serialized failure of a remote invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    type_name: String,
    message: String,
    causes: Vec<RemoteCause>,
}

/// One entry in the cause chain of a [`RemoteFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCause {
    type_name: String,
    message: String,
    declared: Option<Vec<u8>>,
}

impl RemoteFailure {
    /// Creates a failure without causes.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Wraps a declared service error in a remote exception.
    ///
    /// The first cause carries the error encoded with `codec`; the remaining
    /// causes describe its `source()` chain. If the error cannot be encoded
    /// (for example a variant marked `#[serde(skip)]`), the first cause is
    /// kept without payload and callers observe the remote exception itself.
    pub fn declared<C, E>(codec: &C, error: &E) -> Self
    where
        C: Codec,
        E: StdError + Serialize,
    {
        let type_name = std::any::type_name::<E>();
        let declared = match codec.serialize(error) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(
                    error_type = type_name,
                    codec = codec.name(),
                    error = %err,
                    "Declared error is not encodable; sending it as a remote failure"
                );
                None
            }
        };

        let mut causes = vec![RemoteCause {
            type_name: type_name.to_string(),
            message: error.to_string(),
            declared,
        }];
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(RemoteCause {
                type_name: "dyn Error".to_string(),
                message: cause.to_string(),
                declared: None,
            });
            source = cause.source();
        }

        Self {
            type_name: REMOTE_EXCEPTION.to_string(),
            message: format!("{}: {}", type_name, error),
            causes,
        }
    }

    /// Describes a panic payload caught while running the implementation.
    pub fn panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };
        Self::new(PANIC, message)
    }

    /// Describes a dispatch error raised on the receiving side.
    pub fn from_invocation_error(error: &InvocationError) -> Self {
        Self::new(INVOCATION_ERROR, error.to_string())
    }

    /// Returns the type name of the failure.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the cause chain, outermost first.
    pub fn causes(&self) -> &[RemoteCause] {
        &self.causes
    }

    /// Returns `true` if this envelope wraps a declared service error.
    #[must_use]
    pub fn is_remote_exception(&self) -> bool {
        self.type_name == REMOTE_EXCEPTION
    }

    /// Returns the encoded declared error of the first cause, if any.
    ///
    /// Only the first cause is considered: it is the error the service
    /// method returned, every later cause is part of its source chain.
    #[must_use]
    pub fn first_declared_cause(&self) -> Option<&[u8]> {
        if !self.is_remote_exception() {
            return None;
        }
        self.causes.first()?.declared.as_deref()
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl StdError for RemoteFailure {}

impl RemoteCause {
    /// Returns the type name of the cause.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the cause message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if the cause carries an encoded declared error.
    pub fn is_declared(&self) -> bool {
        self.declared.is_some()
    }
}
