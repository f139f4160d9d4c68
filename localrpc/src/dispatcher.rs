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

//! Calling-side dispatch.
//!
//! A [`Dispatcher`] is bound to one service name and performs every call a
//! proxy makes:
//!
//! 1. resolve the target block from [`CONNECTION_URL_LIST`] and look up the
//!    invoker registered as `{block}{service_name}`;
//! 2. marshal the arguments into an [`Invocation`], serializing ordinary
//!    arguments and moving `#[bypass]` arguments by reference;
//! 3. attach the caller's session attributes;
//! 4. run the invoker inside a `local_invocation` span;
//! 5. unmarshal the result, or turn a failure back into the caller's error
//!    type.
//!
//! Step 1 happens in [`Dispatcher::call`], before any argument is marshaled,
//! so a missing target is reported without touching the arguments.
//!
//! [`CONNECTION_URL_LIST`]: crate::config::CONNECTION_URL_LIST

use crate::codec::{Codec, PostcardCodec};
use crate::config::target_block_name;
use crate::context::SecurityContext;
use crate::environment::LocalEnvironment;
use crate::error::InvocationError;
use crate::failure::RemoteFailure;
use crate::invocation::{BypassValue, Invocation, InvocationBuilder, InvocationResult};
use crate::invoker::Invoker;
use crate::observability::log_error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use tracing::{Span, debug, debug_span, field, trace, warn};

/// Normalizes a service name to begin with `/`.
///
/// An empty name is a configuration error.
pub fn normalize_service_name(name: &str) -> Result<String, InvocationError> {
    let name = name.trim();
    if name.is_empty() || name == "/" {
        return Err(InvocationError::configuration("Service name is not set"));
    }
    if name.starts_with('/') {
        Ok(name.to_string())
    } else {
        Ok(format!("/{name}"))
    }
}

/// Performs calls on behalf of a proxy bound to one service name.
#[derive(Clone)]
pub struct Dispatcher<C: Codec = PostcardCodec> {
    service_name: Arc<str>,
    environment: LocalEnvironment,
    codec: C,
    security_context: Option<SecurityContext>,
}

impl Dispatcher<PostcardCodec> {
    /// Creates a dispatcher using the default codec.
    pub fn new(service_name: &str, environment: LocalEnvironment) -> Result<Self, InvocationError> {
        Self::with_codec(service_name, environment, PostcardCodec::default())
    }
}

impl<C: Codec> Dispatcher<C> {
    /// Creates a dispatcher using `codec`.
    ///
    /// Nothing is resolved until the first call.
    pub fn with_codec(
        service_name: &str,
        environment: LocalEnvironment,
        codec: C,
    ) -> Result<Self, InvocationError> {
        Ok(Self {
            service_name: normalize_service_name(service_name)?.into(),
            environment,
            codec,
            security_context: None,
        })
    }

    /// Attaches the caller's security context to every call.
    #[must_use]
    pub fn with_security_context(mut self, context: SecurityContext) -> Self {
        self.security_context = Some(context);
        self
    }

    /// Returns the normalized service name.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the environment calls are routed through.
    pub fn environment(&self) -> &LocalEnvironment {
        &self.environment
    }

    /// Returns the codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Returns the attached security context.
    pub fn security_context(&self) -> Option<&SecurityContext> {
        self.security_context.as_ref()
    }

    /// Starts a call of `method`, resolving its invoker.
    pub fn call<'a>(&'a self, method: &'a str) -> Result<Call<'a, C>, InvocationError> {
        self.environment.metrics().record_call();
        let target = Target {
            dispatcher: self,
            method,
            entry_name: String::new(),
        };
        let (entry_name, invoker) = self.resolve().map_err(|err| target.reject(err))?;

        let mut builder = Invocation::builder(method);
        if let Some(context) = &self.security_context {
            builder = builder.security_context(context);
        }
        Ok(Call {
            target: Target {
                entry_name,
                ..target
            },
            invoker,
            builder,
        })
    }

    fn resolve(&self) -> Result<(String, Arc<dyn Invoker>), InvocationError> {
        let block_name = target_block_name(self.environment.properties())?;
        let entry_name = format!("{}{}", block_name, self.service_name);
        match self.environment.directory().lookup(&entry_name) {
            Some(invoker) => Ok((entry_name, invoker)),
            None => Err(self.environment.blocks().access_error(&block_name, &entry_name)),
        }
    }
}

impl<C: Codec> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("service_name", &self.service_name)
            .field("codec", &self.codec.name())
            .field("security_context", &self.security_context)
            .finish_non_exhaustive()
    }
}

/// One call in progress.
///
/// Arguments are appended in declaration order; [`Call::invoke`] or
/// [`Call::invoke_bypass`] completes the call.
pub struct Call<'a, C: Codec> {
    target: Target<'a, C>,
    invoker: Arc<dyn Invoker>,
    builder: InvocationBuilder,
}

impl<C: Codec> Call<'_, C> {
    /// Appends a serialized argument.
    pub fn argument<T: Serialize>(self, value: &T) -> Result<Self, InvocationError> {
        match self.target.dispatcher.codec.serialize(value) {
            Ok(payload) => Ok(Self {
                builder: self.builder.argument(type_name::<T>(), payload),
                ..self
            }),
            Err(err) => Err(self.target.reject(err.into())),
        }
    }

    /// Appends a serialized `Option<T>` argument; `None` is passed as null.
    pub fn optional_argument<T: Serialize>(self, value: Option<&T>) -> Result<Self, InvocationError> {
        let parameter_type = type_name::<Option<T>>();
        let Some(value) = value else {
            return Ok(Self {
                builder: self.builder.null_argument(parameter_type),
                ..self
            });
        };
        match self.target.dispatcher.codec.serialize(value) {
            Ok(payload) => Ok(Self {
                builder: self.builder.argument(parameter_type, payload),
                ..self
            }),
            Err(err) => Err(self.target.reject(err.into())),
        }
    }

    /// Appends an argument passed by reference.
    pub fn bypass_argument<T: Any + Send>(self, value: T) -> Result<Self, InvocationError> {
        Ok(Self {
            builder: self
                .builder
                .bypass_argument(type_name::<T>(), BypassValue::new(value)),
            ..self
        })
    }

    /// Appends an `Option<T>` argument passed by reference; `None` is passed
    /// as null.
    pub fn optional_bypass_argument<T: Any + Send>(
        self,
        value: Option<T>,
    ) -> Result<Self, InvocationError> {
        let parameter_type = type_name::<Option<T>>();
        let builder = match value {
            Some(value) => self
                .builder
                .bypass_argument(parameter_type, BypassValue::new(value)),
            None => self.builder.null_argument(parameter_type),
        };
        Ok(Self { builder, ..self })
    }

    /// Completes a call whose result is returned serialized.
    ///
    /// A declared failure of the service is returned as `E` unchanged; any
    /// other failure is converted with `E::from`.
    pub fn invoke<T, E>(self) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: DeserializeOwned + From<InvocationError>,
    {
        let Call {
            target,
            invoker,
            builder,
        } = self;
        let invocation = builder.result_bypass(false).build();
        let span = target.span(&invocation);
        let _entered = span.enter();

        match target.run(invoker.as_ref(), invocation) {
            InvocationResult::Value(bytes) => match target.dispatcher.codec.deserialize(&bytes) {
                Ok(value) => Ok(target.succeed(value)),
                Err(err) => Err(E::from(target.reject(err.into()))),
            },
            InvocationResult::Bypass(_) => Err(E::from(target.reject(InvocationError::protocol(
                format!(
                    "'{}' returned its result by reference but the caller expects it serialized",
                    target.method
                ),
            )))),
            InvocationResult::Failure(bytes) => Err(target.unpack_failure(&bytes)),
        }
    }

    /// Completes a call whose result is returned by reference.
    pub fn invoke_bypass<T, E>(self) -> Result<T, E>
    where
        T: Any,
        E: DeserializeOwned + From<InvocationError>,
    {
        let Call {
            target,
            invoker,
            builder,
        } = self;
        let invocation = builder.result_bypass(true).build();
        let span = target.span(&invocation);
        let _entered = span.enter();

        match target.run(invoker.as_ref(), invocation) {
            InvocationResult::Bypass(value) => match value.downcast::<T>() {
                Ok(value) => Ok(target.succeed(value)),
                Err(_) => Err(E::from(target.reject(InvocationError::protocol(format!(
                    "result of '{}' is not a {}",
                    target.method,
                    type_name::<T>()
                ))))),
            },
            InvocationResult::Value(_) => Err(E::from(target.reject(InvocationError::protocol(
                format!(
                    "'{}' returned its result serialized but the caller expects it by reference",
                    target.method
                ),
            )))),
            InvocationResult::Failure(bytes) => Err(target.unpack_failure(&bytes)),
        }
    }
}

impl<C: Codec> fmt::Debug for Call<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("entry", &self.target.entry_name)
            .field("method", &self.target.method)
            .finish_non_exhaustive()
    }
}

struct Target<'a, C: Codec> {
    dispatcher: &'a Dispatcher<C>,
    method: &'a str,
    entry_name: String,
}

impl<C: Codec> Target<'_, C> {
    fn span(&self, invocation: &Invocation) -> Span {
        let span = debug_span!(
            "local_invocation",
            service = %self.dispatcher.service_name,
            method = self.method,
            session_id = field::Empty,
        );
        if let Some(session_id) = invocation.session_id() {
            span.record("session_id", field::display(session_id));
        }
        span
    }

    fn run(&self, invoker: &dyn Invoker, invocation: Invocation) -> InvocationResult {
        trace!(
            entry = %self.entry_name,
            arity = invocation.arity(),
            result_bypass = invocation.result_bypass(),
            "Dispatching local invocation"
        );
        invoker.invoke(invocation)
    }

    fn succeed<T>(&self, value: T) -> T {
        self.dispatcher.environment.metrics().record_success();
        value
    }

    fn reject(&self, err: InvocationError) -> InvocationError {
        self.dispatcher.environment.metrics().record_error(&err);
        let entry: &str = if self.entry_name.is_empty() {
            &self.dispatcher.service_name
        } else {
            &self.entry_name
        };
        log_error(entry, self.method, &err);
        err
    }

    fn unpack_failure<E>(&self, bytes: &[u8]) -> E
    where
        E: DeserializeOwned + From<InvocationError>,
    {
        let codec = &self.dispatcher.codec;
        let failure: RemoteFailure = match codec.deserialize(bytes) {
            Ok(failure) => failure,
            Err(err) => return E::from(self.reject(err.into())),
        };

        if let Some(payload) = failure.first_declared_cause() {
            match codec.deserialize::<E>(payload) {
                Ok(declared) => {
                    self.dispatcher.environment.metrics().record_declared_failure();
                    debug!(
                        entry = %self.entry_name,
                        method = self.method,
                        error = failure.message(),
                        "Local service returned a declared error"
                    );
                    return declared;
                }
                Err(err) => {
                    warn!(
                        entry = %self.entry_name,
                        method = self.method,
                        error = %err,
                        "Declared error does not decode as the method's error type"
                    );
                }
            }
        }
        E::from(self.reject(InvocationError::Remote(failure)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;
    use crate::config::{CONNECTION_URL_LIST, StaticProperties};
    use crate::context::UserSession;
    use crate::invoker::{encode_bypass, encode_value, execute};
    use serde::Deserialize;
    use std::sync::Mutex;
    use thiserror::Error;
    use uuid::Uuid;

    #[derive(Debug, Error, Serialize, Deserialize, PartialEq)]
    enum AccountError {
        #[error("account {0} not found")]
        NotFound(u64),
        #[error(transparent)]
        Invocation(#[from] InvocationError),
    }

    #[derive(Debug, Error, Serialize, Deserialize, PartialEq)]
    #[error("unrelated")]
    struct Unrelated(String);

    fn environment() -> LocalEnvironment {
        LocalEnvironment::new().with_properties(
            StaticProperties::new().with_property(CONNECTION_URL_LIST, "http://localhost:8080/core"),
        )
    }

    fn register(environment: &LocalEnvironment, entry: &str, invoker: impl Invoker + 'static) {
        environment.blocks().try_record_started("core", "core");
        environment.directory().register(entry, Arc::new(invoker));
    }

    fn balance_invoker(invocation: Invocation) -> InvocationResult {
        let codec = PostcardCodec::default();
        execute(&codec, invocation, |invocation| {
            let id: u64 = invocation.argument(0, &codec)?;
            if id == 0 {
                encode_value(&codec, Err::<i64, _>(AccountError::NotFound(id)))
            } else {
                encode_value(&codec, Ok::<i64, AccountError>(id as i64 * 10))
            }
        })
    }

    #[test]
    fn test_normalize_service_name() {
        assert_eq!(normalize_service_name("userService").unwrap(), "/userService");
        assert_eq!(normalize_service_name("/userService").unwrap(), "/userService");
        assert_eq!(
            normalize_service_name("").unwrap_err().kind(),
            FailureKind::Configuration
        );
    }

    #[test]
    fn test_value_round_trip() {
        let environment = environment();
        register(&environment, "core/accounts", balance_invoker);
        let dispatcher = Dispatcher::new("accounts", environment.clone()).unwrap();

        let balance: Result<i64, AccountError> = dispatcher
            .call("balance")
            .and_then(|call| call.argument(&4u64))
            .map_or_else(|err| Err(err.into()), Call::invoke);
        assert_eq!(balance.unwrap(), 40);
        assert_eq!(environment.metrics().successes(), 1);
    }

    #[test]
    fn test_declared_error_preserved() {
        let environment = environment();
        register(&environment, "core/accounts", balance_invoker);
        let dispatcher = Dispatcher::new("/accounts", environment.clone()).unwrap();

        let result = dispatcher
            .call("balance")
            .and_then(|call| call.argument(&0u64))
            .map_or_else(|err| Err(err.into()), Call::invoke::<i64, AccountError>);
        assert_eq!(result.unwrap_err(), AccountError::NotFound(0));
        assert_eq!(environment.metrics().declared_failures(), 1);
    }

    #[test]
    fn test_undecodable_declared_error_falls_back() {
        let environment = environment();
        register(&environment, "core/accounts", |invocation: Invocation| {
            let codec = PostcardCodec::default();
            execute(&codec, invocation, |_| {
                encode_value(&codec, Err::<u8, _>(Unrelated("x".repeat(300))))
            })
        });
        let dispatcher = Dispatcher::new("accounts", environment.clone()).unwrap();

        let error = dispatcher
            .call("balance")
            .map_or_else(|err| Err(err.into()), Call::invoke::<u8, AccountError>)
            .unwrap_err();
        match error {
            AccountError::Invocation(InvocationError::Remote(failure)) => {
                assert!(failure.is_remote_exception());
                assert!(failure.message().contains("unrelated"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(environment.metrics().remote_failures(), 1);
    }

    #[test]
    fn test_missing_property() {
        let environment = LocalEnvironment::new().with_properties(StaticProperties::new());
        let dispatcher = Dispatcher::new("accounts", environment.clone()).unwrap();
        let error = dispatcher.call("balance").unwrap_err();
        assert_eq!(error.kind(), FailureKind::Configuration);
        assert_eq!(environment.metrics().configuration_failures(), 1);
    }

    #[test]
    fn test_missing_block_names_entry() {
        let environment = environment();
        let dispatcher = Dispatcher::new("accounts", environment.clone()).unwrap();
        let error = dispatcher.call("balance").unwrap_err();
        assert_eq!(error.kind(), FailureKind::LocalAccess);
        assert!(error.to_string().contains("core/accounts"));
        assert_eq!(environment.metrics().local_access_failures(), 1);
    }

    #[test]
    fn test_representation_mismatch() {
        let environment = environment();
        register(&environment, "core/handles", |invocation: Invocation| {
            let codec = PostcardCodec::default();
            execute(&codec, invocation, |_| {
                encode_bypass(&codec, Ok::<_, AccountError>(Arc::new(1u8)))
            })
        });
        let dispatcher = Dispatcher::new("handles", environment).unwrap();

        let error = dispatcher
            .call("open")
            .map_or_else(|err| Err(err.into()), Call::invoke::<u8, AccountError>)
            .unwrap_err();
        match error {
            AccountError::Invocation(err) => assert_eq!(err.kind(), FailureKind::Protocol),
            other => panic!("unexpected error: {other:?}"),
        }

        let handle = dispatcher
            .call("open")
            .map_or_else(|err| Err(err.into()), Call::invoke_bypass::<Arc<u8>, AccountError>)
            .unwrap();
        assert_eq!(*handle, 1);
    }

    #[test]
    fn test_session_attributes_propagate() {
        let environment = environment();
        let seen = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&seen);
        register(&environment, "core/sessions", move |invocation: Invocation| {
            *recorder.lock().unwrap() = Some((
                invocation.session_id(),
                invocation.locale().map(str::to_string),
            ));
            let codec = PostcardCodec::default();
            execute(&codec, invocation, |_| encode_value(&codec, Ok::<(), AccountError>(())))
        });

        let session = UserSession::new(Uuid::new_v4())
            .with_locale("fr")
            .with_request_scoped_info(true);
        let dispatcher = Dispatcher::new("sessions", environment)
            .unwrap()
            .with_security_context(SecurityContext::from_session(session.clone()));
        dispatcher
            .call("touch")
            .map_or_else(|err| Err(err.into()), Call::invoke::<(), AccountError>)
            .unwrap();

        let seen = seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen, (Some(session.id()), Some("fr".to_string())));
    }

    #[test]
    fn test_optional_and_bypass_arguments() {
        let environment = environment();
        let shared = Arc::new(String::from("payload"));
        let expected = Arc::clone(&shared);
        register(&environment, "core/store", move |invocation: Invocation| {
            let codec = PostcardCodec::default();
            execute(&codec, invocation, |invocation| {
                let label: Option<String> = invocation.optional_argument(0, &codec)?;
                let value: Arc<String> = invocation.take_bypass(1)?;
                let missing: Option<Arc<String>> = invocation.take_optional_bypass(2)?;
                let same = Arc::ptr_eq(&value, &expected) && label.is_none() && missing.is_none();
                encode_value(&codec, Ok::<bool, AccountError>(same))
            })
        });
        let dispatcher = Dispatcher::new("store", environment).unwrap();

        let same = dispatcher
            .call("put")
            .and_then(|call| call.optional_argument::<String>(None))
            .and_then(|call| call.bypass_argument(shared))
            .and_then(|call| call.optional_bypass_argument::<Arc<String>>(None))
            .map_or_else(|err| Err(err.into()), Call::invoke::<bool, AccountError>)
            .unwrap();
        assert!(same);
    }
}
