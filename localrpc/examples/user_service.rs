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

//! # User Service Example - Using #[localrpc::local_service]
//!
//! Deploys a user service in a deployment block named `core` and calls it
//! through a generated proxy, the way a caller in another block would.
//!
//! ## What This Example Shows
//!
//! - Defining a service trait with the `#[local_service]` macro
//! - Registering the generated invoker in a deployment block
//! - Creating a proxy with `ProxyFactory` and calling it
//! - Declared errors, bypass arguments and session propagation
//! - The diagnostic raised after the block shuts down
//!
//! ## Running This Example
//!
//! ```bash
//! cargo run --example user_service
//! ```

use localrpc::config::{CONNECTION_URL_LIST, StaticProperties};
use localrpc::{
    DeploymentBlock, InvocationError, LocalEnvironment, ProxyFactory, SecurityContext,
    UserSession, local_service,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

// ============================================================================
// STEP 1: Define the service trait with the macro
// ============================================================================

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
pub enum UserError {
    #[error("user '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// Counters shared between the caller and the service.
#[derive(Debug, Default)]
pub struct Stats {
    lookups: Mutex<u32>,
}

/// Generates `USER_SERVICE_INTERFACE`, `UserServiceProxy` and
/// `UserServiceInvoker`.
#[local_service]
pub trait UserService: Send + Sync {
    fn count(&self) -> Result<u32, UserError>;
    fn email(&self, name: String, #[bypass] stats: Arc<Stats>) -> Result<String, UserError>;
}

// ============================================================================
// STEP 2: Implement the service
// ============================================================================

struct Directory {
    emails: BTreeMap<String, String>,
}

impl UserService for Directory {
    fn count(&self) -> Result<u32, UserError> {
        Ok(42)
    }

    fn email(&self, name: String, stats: Arc<Stats>) -> Result<String, UserError> {
        if let Ok(mut lookups) = stats.lookups.lock() {
            *lookups += 1;
        }
        self.emails
            .get(&name)
            .cloned()
            .ok_or(UserError::NotFound(name))
    }
}

// ============================================================================
// STEP 3: Deploy and call
// ============================================================================

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let environment = LocalEnvironment::new().with_properties(
        StaticProperties::new().with_property(CONNECTION_URL_LIST, "http://localhost:8080/core"),
    );

    let directory = Directory {
        emails: BTreeMap::from([("alice".to_string(), "alice@example.com".to_string())]),
    };
    let block = DeploymentBlock::new("core")
        .with_service("/userService", UserServiceInvoker::new(Arc::new(directory)))
        .start(&environment)?;
    info!(entries = ?block.entries(), "Deployment block started");

    let session = UserSession::new(Uuid::new_v4()).with_locale("en-US");
    let users = ProxyFactory::new()
        .with_environment(environment.clone())
        .with_security_context(SecurityContext::from_session(session))
        .create::<dyn UserService>("userService")?;

    println!("count = {}", users.count()?);

    let stats = Arc::new(Stats::default());
    println!("alice = {}", users.email("alice".to_string(), Arc::clone(&stats))?);
    match users.email("mallory".to_string(), Arc::clone(&stats)) {
        Err(UserError::NotFound(name)) => println!("no such user: {name}"),
        other => println!("unexpected: {other:?}"),
    }
    if let Ok(lookups) = stats.lookups.lock() {
        println!("lookups seen by the caller = {}", *lookups);
    }

    block.shutdown();
    if let Err(err) = users.count() {
        println!("after shutdown: {err}");
    }

    let metrics = environment.metrics();
    println!(
        "calls = {}, successes = {}, failures = {}",
        metrics.total_calls(),
        metrics.successes(),
        metrics.total_failures()
    );
    Ok(())
}
