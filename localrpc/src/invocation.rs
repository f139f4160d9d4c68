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

//! Invocation records.
//!
//! An [`Invocation`] is the self-describing record of one method call: the
//! method name, the declared parameter types, one slot per argument and the
//! caller's session attributes. Every argument occupies exactly one of two
//! slots: a serialized payload, or a by-reference [`BypassValue`] for
//! parameters marked `#[bypass]`. An argument with neither slot set is null,
//! which only `Option<T>` parameters accept.
//!
//! Records are assembled with [`InvocationBuilder`] on the calling side and
//! taken apart by the generated invoker on the receiving side.

use crate::codec::Codec;
use crate::context::SecurityContext;
use crate::error::InvocationError;
use serde::de::DeserializeOwned;
use std::any::{Any, type_name};
use std::fmt;
use uuid::Uuid;

/// A value passed by reference instead of being serialized.
///
/// Passing an `Arc<T>` as a bypass argument delivers the same allocation to
/// the implementation, so identity is preserved across the call.
pub struct BypassValue(Box<dyn Any + Send>);

impl BypassValue {
    /// Wraps a value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Returns `true` if the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }

    /// Unwraps the value as a `T`, returning `self` unchanged on mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        self.0.downcast::<T>().map(|value| *value).map_err(Self)
    }
}

impl fmt::Debug for BypassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BypassValue(..)")
    }
}

/// The record of one method call.
#[derive(Debug)]
pub struct Invocation {
    method_name: String,
    parameter_types: Vec<String>,
    arguments: Vec<Option<Vec<u8>>>,
    bypass_arguments: Vec<Option<BypassValue>>,
    result_bypass: bool,
    session_id: Option<Uuid>,
    locale: Option<String>,
    time_zone: Option<String>,
    address: Option<String>,
    client_info: Option<String>,
}

impl Invocation {
    /// Starts a record for `method_name`.
    pub fn builder(method_name: impl Into<String>) -> InvocationBuilder {
        InvocationBuilder {
            invocation: Self {
                method_name: method_name.into(),
                parameter_types: Vec::new(),
                arguments: Vec::new(),
                bypass_arguments: Vec::new(),
                result_bypass: false,
                session_id: None,
                locale: None,
                time_zone: None,
                address: None,
                client_info: None,
            },
        }
    }

    /// Returns the name of the invoked method.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns the declared parameter types, one per argument.
    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    /// Returns the number of arguments.
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Returns the serialized payload of argument `index`, if it has one.
    pub fn argument_payload(&self, index: usize) -> Option<&[u8]> {
        self.arguments.get(index)?.as_deref()
    }

    /// Returns `true` if argument `index` was passed by reference.
    pub fn is_bypass_argument(&self, index: usize) -> bool {
        matches!(self.bypass_arguments.get(index), Some(Some(_)))
    }

    /// Returns `true` if argument `index` is null.
    pub fn is_null_argument(&self, index: usize) -> bool {
        index < self.arity()
            && self.argument_payload(index).is_none()
            && !self.is_bypass_argument(index)
    }

    /// Returns `true` if the caller expects the result by reference.
    pub fn result_bypass(&self) -> bool {
        self.result_bypass
    }

    /// Returns the caller's session id.
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Returns the caller's locale, for sessions with request-scoped info.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Returns the caller's time zone, for sessions with request-scoped info.
    pub fn time_zone(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }

    /// Returns the caller's address, for sessions with request-scoped info.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the caller's client info, for sessions with request-scoped info.
    pub fn client_info(&self) -> Option<&str> {
        self.client_info.as_deref()
    }

    /// Checks that the record matches the receiving method's signature.
    ///
    /// Parameter types are compared by their `std::any::type_name`, so both
    /// sides must be compiled into the same program.
    pub fn expect_signature(
        &self,
        parameter_types: &[&str],
        result_bypass: bool,
    ) -> Result<(), InvocationError> {
        if self.parameter_types.len() != parameter_types.len()
            || self
                .parameter_types
                .iter()
                .zip(parameter_types)
                .any(|(actual, expected)| actual != expected)
        {
            return Err(InvocationError::protocol(format!(
                "method '{}' expects parameters ({}) but the invocation carries ({})",
                self.method_name,
                parameter_types.join(", "),
                self.parameter_types.join(", ")
            )));
        }
        if self.result_bypass != result_bypass {
            return Err(InvocationError::protocol(format!(
                "method '{}' returns its result {} but the caller expects it {}",
                self.method_name,
                representation(result_bypass),
                representation(self.result_bypass)
            )));
        }
        Ok(())
    }

    /// Decodes serialized argument `index`.
    pub fn argument<T, C>(&self, index: usize, codec: &C) -> Result<T, InvocationError>
    where
        T: DeserializeOwned,
        C: Codec,
    {
        match self.optional_argument(index, codec)? {
            Some(value) => Ok(value),
            None => Err(self.null_argument(index)),
        }
    }

    /// Decodes serialized argument `index`, mapping null to `None`.
    pub fn optional_argument<T, C>(
        &self,
        index: usize,
        codec: &C,
    ) -> Result<Option<T>, InvocationError>
    where
        T: DeserializeOwned,
        C: Codec,
    {
        self.check_index(index)?;
        if self.is_bypass_argument(index) {
            return Err(InvocationError::protocol(format!(
                "argument {} of '{}' was passed by reference but the parameter is serialized",
                index, self.method_name
            )));
        }
        match self.argument_payload(index) {
            Some(payload) => Ok(Some(codec.deserialize(payload)?)),
            None => Ok(None),
        }
    }

    /// Takes by-reference argument `index`.
    pub fn take_bypass<T: Any>(&mut self, index: usize) -> Result<T, InvocationError> {
        match self.take_optional_bypass(index)? {
            Some(value) => Ok(value),
            None => Err(self.null_argument(index)),
        }
    }

    /// Takes by-reference argument `index`, mapping null to `None`.
    pub fn take_optional_bypass<T: Any>(
        &mut self,
        index: usize,
    ) -> Result<Option<T>, InvocationError> {
        self.check_index(index)?;
        if self.argument_payload(index).is_some() {
            return Err(InvocationError::protocol(format!(
                "argument {} of '{}' was serialized but the parameter is passed by reference",
                index, self.method_name
            )));
        }
        let Some(value) = self.bypass_arguments[index].take() else {
            return Ok(None);
        };
        match value.downcast::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(value) => {
                self.bypass_arguments[index] = Some(value);
                Err(InvocationError::protocol(format!(
                    "argument {} of '{}' is not a {}",
                    index,
                    self.method_name,
                    type_name::<T>()
                )))
            }
        }
    }

    fn check_index(&self, index: usize) -> Result<(), InvocationError> {
        if index >= self.arity() {
            return Err(InvocationError::protocol(format!(
                "method '{}' has no argument {} (arity {})",
                self.method_name,
                index,
                self.arity()
            )));
        }
        Ok(())
    }

    fn null_argument(&self, index: usize) -> InvocationError {
        InvocationError::protocol(format!(
            "argument {} of '{}' is null but the parameter is not optional",
            index, self.method_name
        ))
    }
}

fn representation(bypass: bool) -> &'static str {
    if bypass { "by reference" } else { "serialized" }
}

/// Builder for [`Invocation`].
///
/// Each argument method appends one parameter, so the slot invariant holds
/// by construction.
#[derive(Debug)]
pub struct InvocationBuilder {
    invocation: Invocation,
}

impl InvocationBuilder {
    /// Appends a serialized argument.
    #[must_use]
    pub fn argument(mut self, parameter_type: impl Into<String>, payload: Vec<u8>) -> Self {
        self.push(parameter_type.into(), Some(payload), None);
        self
    }

    /// Appends a by-reference argument.
    #[must_use]
    pub fn bypass_argument(mut self, parameter_type: impl Into<String>, value: BypassValue) -> Self {
        self.push(parameter_type.into(), None, Some(value));
        self
    }

    /// Appends a null argument.
    #[must_use]
    pub fn null_argument(mut self, parameter_type: impl Into<String>) -> Self {
        self.push(parameter_type.into(), None, None);
        self
    }

    /// Requests the result by reference.
    #[must_use]
    pub fn result_bypass(mut self, result_bypass: bool) -> Self {
        self.invocation.result_bypass = result_bypass;
        self
    }

    /// Attaches the caller's session attributes.
    ///
    /// The session id is always copied. Locale, time zone, address and
    /// client info are copied only when the session carries request-scoped
    /// info.
    #[must_use]
    pub fn security_context(mut self, context: &SecurityContext) -> Self {
        self.invocation.session_id = Some(context.session_id());
        if let Some(session) = context.session().filter(|s| s.has_request_scoped_info()) {
            self.invocation.locale = session.locale().map(str::to_string);
            self.invocation.time_zone = session.time_zone().map(str::to_string);
            self.invocation.address = session.address().map(str::to_string);
            self.invocation.client_info = session.client_info().map(str::to_string);
        }
        self
    }

    /// Finishes the record.
    pub fn build(self) -> Invocation {
        self.invocation
    }

    fn push(&mut self, parameter_type: String, payload: Option<Vec<u8>>, value: Option<BypassValue>) {
        self.invocation.parameter_types.push(parameter_type);
        self.invocation.arguments.push(payload);
        self.invocation.bypass_arguments.push(value);
    }
}

/// Outcome of an invocation, produced by the invoker.
#[derive(Debug)]
pub enum InvocationResult {
    /// Serialized return value.
    Value(Vec<u8>),
    /// Return value passed by reference.
    Bypass(BypassValue),
    /// Serialized [`RemoteFailure`](crate::failure::RemoteFailure).
    Failure(Vec<u8>),
}

impl InvocationResult {
    /// Returns `true` for [`InvocationResult::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}
