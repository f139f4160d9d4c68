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

//! Codec error types.

use std::error::Error as StdError;
use thiserror::Error;

type BoxedSource = Box<dyn StdError + Send + Sync>;

/// Failure to encode an argument, a result or a failure envelope.
#[derive(Debug, Error)]
#[error("Serialization error: {message}")]
pub struct SerializationError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl SerializationError {
    /// Creates a new serialization error with a message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use localrpc::codec::SerializationError;
    ///
    /// let error = SerializationError::new("argument 0 is not encodable");
    /// assert_eq!(error.to_string(), "Serialization error: argument 0 is not encodable");
    /// ```
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a serialization error wrapping the codec's own error.
    ///
    /// The source's message is appended so that it survives conversion into
    /// an [`InvocationError`](crate::InvocationError).
    pub fn with_source(codec: &str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: format!("{codec}: {source}"),
            source: Some(Box::new(source)),
        }
    }
}

/// Failure to decode a payload.
#[derive(Debug, Error)]
#[error("Deserialization error: {message}")]
pub struct DeserializationError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl DeserializationError {
    /// Creates a new deserialization error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a deserialization error wrapping the codec's own error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use localrpc::codec::DeserializationError;
    /// use std::error::Error;
    /// use std::io;
    ///
    /// let io_error = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated");
    /// let error = DeserializationError::with_source("postcard", io_error);
    /// assert_eq!(error.to_string(), "Deserialization error: postcard: truncated");
    /// assert!(error.source().is_some());
    /// ```
    pub fn with_source(codec: &str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: format!("{codec}: {source}"),
            source: Some(Box::new(source)),
        }
    }

    /// Creates the error raised when a payload exceeds the configured limit.
    pub fn too_large(size: usize, max_size: usize) -> Self {
        Self::new(format!(
            "payload of {size} bytes exceeds maximum allowed size {max_size}"
        ))
    }
}

impl From<postcard::Error> for SerializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("postcard", err)
    }
}

impl From<postcard::Error> for DeserializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("postcard", err)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("json", err)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for DeserializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("json", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error_new() {
        let error = SerializationError::new("result of 'count'");
        assert_eq!(error.to_string(), "Serialization error: result of 'count'");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_source_message_kept() {
        let error = SerializationError::with_source("postcard", std::io::Error::other("io error"));
        assert_eq!(error.to_string(), "Serialization error: postcard: io error");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_too_large() {
        let error = DeserializationError::too_large(2048, 1024);
        assert!(error.to_string().contains("exceeds maximum"));
        assert!(error.source().is_none());
    }

    #[test]
    fn test_postcard_error_conversion() {
        let error: DeserializationError = postcard::Error::DeserializeUnexpectedEnd.into();
        assert!(error.to_string().starts_with("Deserialization error: postcard: "));
        assert!(error.source().is_some());
    }
}
