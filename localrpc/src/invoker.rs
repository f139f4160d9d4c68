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

//! Receiving-side invocation.
//!
//! An [`Invoker`] executes an [`Invocation`] against a service
//! implementation and reports the outcome as an [`InvocationResult`].
//! Invokers for `#[local_service]` traits are generated; the helpers in this
//! module hold the logic they share:
//!
//! - [`execute`] runs the method body, catching panics and turning dispatch
//!   errors into serialized failures.
//! - [`encode_value`] and [`encode_bypass`] turn the implementation's
//!   `Result<T, E>` into a result, wrapping a declared `E` in a remote
//!   exception.
//!
//! # Examples
//!
//! A hand-written invoker:
//!
//! ```rust
//! use localrpc::codec::PostcardCodec;
//! use localrpc::invocation::{Invocation, InvocationResult};
//! use localrpc::invoker::{Invoker, encode_value, execute};
//! use localrpc::InvocationError;
//!
//! struct Echo {
//!     codec: PostcardCodec,
//! }
//!
//! impl Invoker for Echo {
//!     fn invoke(&self, invocation: Invocation) -> InvocationResult {
//!         execute(&self.codec, invocation, |invocation| {
//!             let text: String = invocation.argument(0, &self.codec)?;
//!             encode_value(&self.codec, Ok::<_, InvocationError>(text))
//!         })
//!     }
//! }
//! ```

use crate::codec::Codec;
use crate::error::InvocationError;
use crate::failure::RemoteFailure;
use crate::invocation::{BypassValue, Invocation, InvocationResult};
use serde::Serialize;
use std::any::Any;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, warn};

/// Executes invocations against a service implementation.
pub trait Invoker: Send + Sync {
    /// Executes `invocation` and reports its outcome.
    ///
    /// Implementations never panic; a panicking service method is reported
    /// as an [`InvocationResult::Failure`].
    fn invoke(&self, invocation: Invocation) -> InvocationResult;
}

impl<F> Invoker for F
where
    F: Fn(Invocation) -> InvocationResult + Send + Sync,
{
    fn invoke(&self, invocation: Invocation) -> InvocationResult {
        self(invocation)
    }
}

/// Runs `body` and converts its outcome into an [`InvocationResult`].
///
/// A dispatch error returned by `body` becomes a failure of type
/// [`INVOCATION_ERROR`](crate::failure::INVOCATION_ERROR); a panic becomes a
/// failure of type [`PANIC`](crate::failure::PANIC) carrying the panic
/// message.
pub fn execute<C, F>(codec: &C, mut invocation: Invocation, body: F) -> InvocationResult
where
    C: Codec,
    F: FnOnce(&mut Invocation) -> Result<InvocationResult, InvocationError>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut invocation)));
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            warn!(
                method = invocation.method_name(),
                error = %err,
                "Rejected local invocation"
            );
            failure(codec, RemoteFailure::from_invocation_error(&err))
        }
        Err(payload) => {
            let failure_value = RemoteFailure::panic(payload.as_ref());
            error!(
                method = invocation.method_name(),
                panic = failure_value.message(),
                "Local service panicked"
            );
            failure(codec, failure_value)
        }
    }
}

/// Encodes a method outcome whose value is returned serialized.
pub fn encode_value<C, T, E>(codec: &C, outcome: Result<T, E>) -> Result<InvocationResult, InvocationError>
where
    C: Codec,
    T: Serialize,
    E: StdError + Serialize,
{
    match outcome {
        Ok(value) => Ok(InvocationResult::Value(codec.serialize(&value)?)),
        Err(err) => Ok(declared(codec, &err)),
    }
}

/// Encodes a method outcome whose value is returned by reference.
pub fn encode_bypass<C, T, E>(codec: &C, outcome: Result<T, E>) -> Result<InvocationResult, InvocationError>
where
    C: Codec,
    T: Any + Send,
    E: StdError + Serialize,
{
    match outcome {
        Ok(value) => Ok(InvocationResult::Bypass(BypassValue::new(value))),
        Err(err) => Ok(declared(codec, &err)),
    }
}

/// Rejects an invocation of a method the service does not have.
pub fn unknown_method(service: &str, method: &str) -> InvocationError {
    InvocationError::protocol(format!("service '{}' has no method '{}'", service, method))
}

fn declared<C, E>(codec: &C, err: &E) -> InvocationResult
where
    C: Codec,
    E: StdError + Serialize,
{
    failure(codec, RemoteFailure::declared(codec, err))
}

fn failure<C: Codec>(codec: &C, failure: RemoteFailure) -> InvocationResult {
    match codec.serialize(&failure) {
        Ok(bytes) => InvocationResult::Failure(bytes),
        Err(err) => {
            error!(
                codec = codec.name(),
                error = %err,
                failure = %failure,
                "Failed to encode failure envelope; sending it without causes"
            );
            let plain = RemoteFailure::new(failure.type_name(), failure.message());
            InvocationResult::Failure(codec.serialize(&plain).unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PostcardCodec;
    use crate::failure::{INVOCATION_ERROR, PANIC};
    use serde::Deserialize;
    use thiserror::Error;

    #[derive(Debug, Error, Serialize, Deserialize, PartialEq)]
    #[error("not found: {0}")]
    struct NotFound(String);

    fn decode_failure(result: InvocationResult) -> RemoteFailure {
        match result {
            InvocationResult::Failure(bytes) => PostcardCodec::default().deserialize(&bytes).unwrap(),
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn test_closure_invoker() {
        let invoker = |invocation: Invocation| {
            InvocationResult::Value(invocation.method_name().as_bytes().to_vec())
        };
        match invoker.invoke(Invocation::builder("ping").build()) {
            InvocationResult::Value(bytes) => assert_eq!(bytes, b"ping"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_execute_value() {
        let codec = PostcardCodec::default();
        let result = execute(&codec, Invocation::builder("answer").build(), |_| {
            encode_value(&codec, Ok::<u32, NotFound>(42))
        });
        match result {
            InvocationResult::Value(bytes) => assert_eq!(codec.deserialize::<u32>(&bytes).unwrap(), 42),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_execute_declared_error() {
        let codec = PostcardCodec::default();
        let result = execute(&codec, Invocation::builder("find").build(), |_| {
            encode_value(&codec, Err::<u32, _>(NotFound("alice".to_string())))
        });
        let failure = decode_failure(result);
        assert!(failure.is_remote_exception());
        let declared: NotFound = codec.deserialize(failure.first_declared_cause().unwrap()).unwrap();
        assert_eq!(declared, NotFound("alice".to_string()));
    }

    #[test]
    fn test_execute_panic() {
        let codec = PostcardCodec::default();
        let result = execute(&codec, Invocation::builder("explode").build(), |_| {
            panic!("balance overflow")
        });
        let failure = decode_failure(result);
        assert_eq!(failure.type_name(), PANIC);
        assert_eq!(failure.message(), "balance overflow");
    }

    #[test]
    fn test_execute_dispatch_error() {
        let codec = PostcardCodec::default();
        let result = execute(&codec, Invocation::builder("missing").build(), |invocation| {
            Err(unknown_method("UserService", invocation.method_name()))
        });
        let failure = decode_failure(result);
        assert_eq!(failure.type_name(), INVOCATION_ERROR);
        assert!(failure.message().contains("has no method 'missing'"));
    }

    #[test]
    fn test_encode_bypass() {
        let codec = PostcardCodec::default();
        let shared = std::sync::Arc::new(5u8);
        let result = encode_bypass(&codec, Ok::<_, NotFound>(std::sync::Arc::clone(&shared))).unwrap();
        match result {
            InvocationResult::Bypass(value) => {
                let value: std::sync::Arc<u8> = value.downcast().unwrap();
                assert!(std::sync::Arc::ptr_eq(&value, &shared));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
