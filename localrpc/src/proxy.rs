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

//! Proxy creation.
//!
//! [`ProxyFactory::create`] turns a service name into an `Arc<dyn Service>`
//! for any trait annotated with `#[local_service]`. The returned proxy
//! forwards each method to a [`Dispatcher`] bound to that name; nothing is
//! looked up until the first call, so proxies can be created before the
//! target block starts.
//!
//! # Examples
//!
//! ```rust
//! use localrpc::{InvocationError, ProxyFactory, local_service};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, thiserror::Error, Serialize, Deserialize)]
//! pub enum GreeterError {
//!     #[error(transparent)]
//!     Invocation(#[from] InvocationError),
//! }
//!
//! #[local_service]
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self, name: String) -> Result<String, GreeterError>;
//! }
//!
//! let greeter = ProxyFactory::new().create::<dyn Greeter>("greeter").unwrap();
//! // No block is running, so the first call reports the missing target.
//! assert!(greeter.greet("Ada".to_string()).is_err());
//! ```

use crate::codec::{Codec, PostcardCodec};
use crate::context::SecurityContext;
use crate::dispatcher::Dispatcher;
use crate::environment::LocalEnvironment;
use crate::error::InvocationError;
use std::sync::Arc;
use tracing::debug;

/// A service trait that proxies can be created for.
///
/// Implemented for `dyn Trait` by `#[local_service]`.
pub trait LocalService {
    /// Static description of the service interface.
    const INTERFACE: &'static ServiceInterface;

    /// Wraps a dispatcher in a proxy implementing the service trait.
    fn from_dispatcher<C: Codec>(dispatcher: Dispatcher<C>) -> Arc<Self>;
}

/// Description of a service trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInterface {
    /// Trait name
    pub name: &'static str,
    /// Methods in declaration order
    pub methods: &'static [MethodDescriptor],
}

/// Description of one service method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Method name
    pub name: &'static str,
    /// Parameters in declaration order
    pub parameters: &'static [ParameterDescriptor],
    /// Whether the return value is passed by reference
    pub result_bypass: bool,
}

/// Description of one method parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescriptor {
    /// Parameter name
    pub name: &'static str,
    /// Whether the argument is passed by reference
    pub bypass: bool,
    /// Whether the argument may be null (`Option<T>`)
    pub optional: bool,
}

impl ServiceInterface {
    /// Returns the method named `name`.
    pub fn method(&self, name: &str) -> Option<&'static MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }
}

impl MethodDescriptor {
    /// Returns the indices of by-reference parameters.
    pub fn bypass_parameters(&self) -> impl Iterator<Item = usize> + '_ {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, parameter)| parameter.bypass)
            .map(|(index, _)| index)
    }
}

/// Creates service proxies.
#[derive(Debug, Clone)]
pub struct ProxyFactory<C: Codec = PostcardCodec> {
    environment: LocalEnvironment,
    codec: C,
    security_context: Option<SecurityContext>,
}

impl ProxyFactory<PostcardCodec> {
    /// Creates a factory for the process-wide environment and the default
    /// codec.
    pub fn new() -> Self {
        Self {
            environment: LocalEnvironment::global(),
            codec: PostcardCodec::default(),
            security_context: None,
        }
    }
}

impl Default for ProxyFactory<PostcardCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> ProxyFactory<C> {
    /// Routes calls through `environment`.
    #[must_use]
    pub fn with_environment(mut self, environment: LocalEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Marshals values with `codec`.
    #[must_use]
    pub fn with_codec<D: Codec>(self, codec: D) -> ProxyFactory<D> {
        ProxyFactory {
            environment: self.environment,
            codec,
            security_context: self.security_context,
        }
    }

    /// Attaches `context` to every call of the created proxies.
    #[must_use]
    pub fn with_security_context(mut self, context: SecurityContext) -> Self {
        self.security_context = Some(context);
        self
    }

    /// Creates a proxy for service trait `S` bound to `service_name`.
    ///
    /// Fails only if the service name is empty.
    pub fn create<S>(&self, service_name: &str) -> Result<Arc<S>, InvocationError>
    where
        S: LocalService + ?Sized,
    {
        let mut dispatcher =
            Dispatcher::with_codec(service_name, self.environment.clone(), self.codec.clone())?;
        if let Some(context) = &self.security_context {
            dispatcher = dispatcher.with_security_context(context.clone());
        }
        debug!(
            service = dispatcher.service_name(),
            interface = S::INTERFACE.name,
            codec = self.codec.name(),
            "Created local service proxy"
        );
        Ok(S::from_dispatcher(dispatcher))
    }
}
