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

//! Top-level error types for localrpc.
//!
//! [`InvocationError`] covers every failure the invocation layer itself can
//! produce. Failures raised *by the service* never appear here as such:
//!
//! 1. **Configuration**: a required property or factory setting is missing.
//!    Fatal, raised at construction or on the first call.
//! 2. **Local service access**: the directory has no invoker for the entry.
//!    Raised before any remote code runs, with a diagnostic message listing
//!    the registered deployment blocks.
//! 3. **Remote declared failure**: the service returned its own error type
//!    `E`. The caller receives exactly that `E`, as if the call had not been
//!    remoted at all.
//! 4. **Remote transport failure** ([`InvocationError::Remote`]): anything
//!    else raised on the receiving side, such as a panic in the
//!    implementation or an unknown method.
//!
//! Nothing in this layer retries. Every variant is serializable so that
//! service error types can embed an `InvocationError` and still cross the
//! boundary.
//!
//! # Examples
//!
//! ```rust
//! use localrpc::{FailureKind, InvocationError};
//!
//! let error = InvocationError::configuration("Property localrpc.connectionUrlList not defined");
//! assert_eq!(error.kind(), FailureKind::Configuration);
//! assert!(error.to_string().contains("localrpc.connectionUrlList"));
//! ```

use crate::codec::{DeserializationError, SerializationError};
use crate::failure::RemoteFailure;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Errors raised by the invocation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum InvocationError {
    /// A required property or factory setting is missing or malformed.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the missing setting
        message: String,
    },

    /// The target service could not be resolved in the service directory.
    ///
    /// The message enumerates the registered deployment blocks and suggests
    /// the likely configuration mistake. When the target block failed to
    /// start, the captured startup failure is attached as the source.
    #[error("{message}")]
    LocalServiceAccess {
        /// Operator-facing diagnostic message
        message: String,
        /// Startup failure of the target block, if it failed to start
        #[source]
        cause: Option<CapturedFailure>,
    },

    /// The receiving side failed with something other than a declared error.
    #[error("{0}")]
    Remote(#[from] RemoteFailure),

    /// An argument, result or failure could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure
        message: String,
    },

    /// The invocation record does not match the method it targets.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the mismatch
        message: String,
    },
}

/// Coarse classification of an [`InvocationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// See [`InvocationError::Configuration`].
    Configuration,
    /// See [`InvocationError::LocalServiceAccess`].
    LocalAccess,
    /// See [`InvocationError::Remote`].
    RemoteTransport,
    /// See [`InvocationError::Codec`].
    Codec,
    /// See [`InvocationError::Protocol`].
    Protocol,
}

impl InvocationError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration { .. } => FailureKind::Configuration,
            Self::LocalServiceAccess { .. } => FailureKind::LocalAccess,
            Self::Remote(_) => FailureKind::RemoteTransport,
            Self::Codec { .. } => FailureKind::Codec,
            Self::Protocol { .. } => FailureKind::Protocol,
        }
    }

    /// Returns `true` if the failure happened before any invoker ran.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::LocalServiceAccess { .. }
        )
    }

    /// Returns the remote failure, if this error came from the receiving side.
    #[must_use]
    pub const fn remote_failure(&self) -> Option<&RemoteFailure> {
        match self {
            Self::Remote(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<SerializationError> for InvocationError {
    fn from(error: SerializationError) -> Self {
        Self::Codec {
            message: error.to_string(),
        }
    }
}

impl From<DeserializationError> for InvocationError {
    fn from(error: DeserializationError) -> Self {
        Self::Codec {
            message: error.to_string(),
        }
    }
}

/// Serializable snapshot of an error and its `source()` chain.
///
/// Used to carry a deployment block's startup failure into diagnostics
/// without keeping the original (possibly non-`Clone`) error alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFailure {
    type_name: String,
    message: String,
    source: Option<Box<CapturedFailure>>,
}

impl CapturedFailure {
    /// Creates a snapshot with an explicit type name and no source.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Captures a typed error, walking its `source()` chain.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use localrpc::CapturedFailure;
    /// use std::io;
    ///
    /// let captured = CapturedFailure::capture(&io::Error::other("disk full"));
    /// assert!(captured.type_name().ends_with("Error"));
    /// assert_eq!(captured.message(), "disk full");
    /// ```
    pub fn capture<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        let mut captured = Self::from_dyn(error);
        captured.type_name = std::any::type_name::<E>().to_string();
        captured
    }

    /// Captures a type-erased error. The type name of erased errors and of
    /// every source in the chain is recorded as `"dyn Error"`.
    pub fn from_dyn(error: &(dyn StdError + 'static)) -> Self {
        Self {
            type_name: "dyn Error".to_string(),
            message: error.to_string(),
            source: error.source().map(|source| Box::new(Self::from_dyn(source))),
        }
    }

    /// Returns the type name recorded at capture time.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Iterates over the messages of this failure and its sources.
    pub fn chain(&self) -> impl Iterator<Item = &CapturedFailure> {
        std::iter::successors(Some(self), |failure| failure.source.as_deref())
    }
}

impl fmt::Display for CapturedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CapturedFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}
