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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # localrpc - Local Service Invocation
//!
//! localrpc lets one deployment block call the services of another block
//! running in the same process as if the call were remote:
//!
//! - **Typed proxies**: [`ProxyFactory::create`] returns an `Arc<dyn Service>`
//!   for any trait annotated with [`local_service`]
//! - **Remote semantics**: arguments and results are serialized, so the
//!   callee never shares mutable state with the caller
//! - **By-reference escape hatch**: `#[bypass]` parameters and results are
//!   moved without serialization, keeping their identity
//! - **Faithful errors**: a service's declared error arrives as the same
//!   error type; panics and dispatch errors arrive as
//!   [`InvocationError::Remote`]
//! - **Actionable diagnostics**: a missing target names the entry and lists
//!   the deployment blocks that are running
//!
//! ## Architecture
//!
//! - **[`codec`]**: value encoding (Postcard by default, JSON optional)
//! - **[`invocation`]**: the self-describing call record
//! - **[`directory`]**: entry name to invoker registry
//! - **[`status`]**: deployment block startup outcomes
//! - **[`deployment`]**: starting and stopping blocks
//! - **[`invoker`]**: receiving-side execution
//! - **[`dispatcher`]**: calling-side marshaling and unmarshaling
//! - **[`proxy`]**: proxy creation and service descriptors
//! - **[`config`]**: property sources
//! - **[`observability`]**: metrics and structured logging
//!
//! ## Error Handling
//!
//! - [`InvocationError`]: failures of the invocation layer itself
//! - [`RemoteFailure`]: the serialized failure envelope
//! - [`BlockStartError`]: deployment block startup failures
//!
//! ## Safety
//!
//! localrpc is written in 100% safe Rust with `#![deny(unsafe_code)]`.
//! Calls are synchronous and run on the caller's thread.

extern crate self as localrpc;

pub mod codec;
pub mod config;
pub mod context;
pub mod deployment;
pub mod directory;
pub mod dispatcher;
pub mod environment;
pub mod error;
pub mod failure;
pub mod invocation;
pub mod invoker;
pub mod observability;
pub mod proxy;
pub mod status;

// Re-export procedural macros when the derive feature is enabled
#[cfg(feature = "derive")]
pub use localrpc_macros::local_service;

pub use codec::{Codec, PostcardCodec};
pub use config::{EnvProperties, PropertySource, StaticProperties};
pub use context::{SecurityContext, UserSession};
pub use deployment::{BlockStartError, DeploymentBlock, RunningBlock};
pub use directory::ServiceDirectory;
pub use dispatcher::{Call, Dispatcher};
pub use environment::LocalEnvironment;
pub use error::{CapturedFailure, FailureKind, InvocationError};
pub use failure::RemoteFailure;
pub use invocation::{BypassValue, Invocation, InvocationResult};
pub use invoker::Invoker;
pub use observability::{InvocationMetrics, log_error};
pub use proxy::{LocalService, MethodDescriptor, ParameterDescriptor, ProxyFactory, ServiceInterface};
pub use status::{BlockOutcome, BlockStatus, BlockStatusDirectory};
