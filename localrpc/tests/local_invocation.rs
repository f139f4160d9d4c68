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

//! Integration tests for calls routed through generated proxies.
//!
//! Each test builds its own [`LocalEnvironment`] so that blocks started here
//! never leak into other tests.

use localrpc::config::{CONNECTION_URL_LIST, StaticProperties};
use localrpc::failure::{INVOCATION_ERROR, PANIC};
use localrpc::invoker::{encode_value, execute};
use localrpc::{
    DeploymentBlock, Dispatcher, FailureKind, Invocation, InvocationError, LocalEnvironment,
    PostcardCodec, ProxyFactory, RunningBlock, SecurityContext, UserSession, local_service,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum UserError {
    #[error("user {0} not found")]
    NotFound(u64),
    #[error("user name '{name}' rejected: {reason}")]
    Rejected { name: String, reason: String },
    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

/// Handle passed by reference to the service.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<String>>,
}

#[local_service]
pub trait UserService: Send + Sync {
    fn count(&self) -> Result<u32, UserError>;
    fn create(&self, name: String) -> Result<User, UserError>;
    fn find(&self, id: u64) -> Result<User, UserError>;
    fn rename(&self, user: User, name: Option<String>) -> Result<User, UserError>;
    fn audit(&self, #[bypass] log: Arc<AuditLog>, action: String) -> Result<usize, UserError>;
    fn crash(&self, message: String) -> Result<(), UserError>;
}

#[derive(Default)]
struct InMemoryUsers {
    next_id: AtomicU32,
    users: Mutex<Vec<User>>,
}

impl UserService for InMemoryUsers {
    fn count(&self) -> Result<u32, UserError> {
        Ok(42)
    }

    fn create(&self, name: String) -> Result<User, UserError> {
        if name.is_empty() {
            return Err(UserError::Rejected {
                name,
                reason: "empty".to_string(),
            });
        }
        let user = User {
            id: u64::from(self.next_id.fetch_add(1, Ordering::SeqCst)) + 1,
            name,
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    fn find(&self, id: u64) -> Result<User, UserError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or(UserError::NotFound(id))
    }

    fn rename(&self, mut user: User, name: Option<String>) -> Result<User, UserError> {
        if let Some(name) = name {
            user.name = name;
        }
        Ok(user)
    }

    fn audit(&self, log: Arc<AuditLog>, action: String) -> Result<usize, UserError> {
        let mut entries = log.entries.lock().unwrap();
        entries.push(action);
        Ok(entries.len())
    }

    fn crash(&self, message: String) -> Result<(), UserError> {
        panic!("{message}");
    }
}

fn environment() -> LocalEnvironment {
    LocalEnvironment::new().with_properties(
        StaticProperties::new().with_property(CONNECTION_URL_LIST, "http://localhost:8080/core"),
    )
}

fn start_core(environment: &LocalEnvironment) -> RunningBlock {
    DeploymentBlock::new("core")
        .with_service(
            "/userService",
            UserServiceInvoker::new(Arc::new(InMemoryUsers::default())),
        )
        .start(environment)
        .unwrap()
}

fn user_service(environment: &LocalEnvironment) -> Arc<dyn UserService> {
    ProxyFactory::new()
        .with_environment(environment.clone())
        .create::<dyn UserService>("userService")
        .unwrap()
}

#[test]
fn test_serialized_round_trip() {
    let environment = environment();
    let _core = start_core(&environment);
    let users = user_service(&environment);

    assert_eq!(users.count(), Ok(42));
    let alice = users.create("alice".to_string()).unwrap();
    assert_eq!(users.find(alice.id), Ok(alice.clone()));

    // Serialized arguments arrive as copies; the caller's value is untouched.
    let renamed = users.rename(alice.clone(), Some("bob".to_string())).unwrap();
    assert_eq!(renamed.name, "bob");
    assert_eq!(alice.name, "alice");
    assert_eq!(users.rename(alice.clone(), None), Ok(alice));

    assert_eq!(environment.metrics().total_calls(), 5);
    assert_eq!(environment.metrics().successes(), 5);
}

#[test]
fn test_declared_error_preserved() {
    let environment = environment();
    let _core = start_core(&environment);
    let users = user_service(&environment);

    assert_eq!(users.find(7), Err(UserError::NotFound(7)));
    assert_eq!(
        users.create(String::new()),
        Err(UserError::Rejected {
            name: String::new(),
            reason: "empty".to_string(),
        })
    );
    assert_eq!(environment.metrics().declared_failures(), 2);
    assert_eq!(environment.metrics().remote_failures(), 0);
}

#[test]
fn test_bypass_argument_is_shared() {
    let environment = environment();
    let _core = start_core(&environment);
    let users = user_service(&environment);

    let log = Arc::new(AuditLog::default());
    assert_eq!(users.audit(Arc::clone(&log), "login".to_string()), Ok(1));
    assert_eq!(users.audit(Arc::clone(&log), "logout".to_string()), Ok(2));
    assert_eq!(*log.entries.lock().unwrap(), vec!["login", "logout"]);
}

#[test]
fn test_panic_becomes_remote_failure() {
    let environment = environment();
    let _core = start_core(&environment);
    let users = user_service(&environment);

    match users.crash("database on fire".to_string()) {
        Err(UserError::Invocation(InvocationError::Remote(failure))) => {
            assert_eq!(failure.type_name(), PANIC);
            assert_eq!(failure.message(), "database on fire");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // The block keeps serving after a panic.
    assert_eq!(users.count(), Ok(42));
}

#[test]
fn test_unknown_method_is_remote_failure() {
    let environment = environment();
    let _core = start_core(&environment);

    let dispatcher = Dispatcher::new("userService", environment.clone()).unwrap();
    let error = dispatcher
        .call("delete")
        .unwrap()
        .invoke::<(), InvocationError>()
        .unwrap_err();

    let failure = error.remote_failure().unwrap();
    assert_eq!(failure.type_name(), INVOCATION_ERROR);
    assert!(failure.message().contains("delete"));
    assert_eq!(environment.metrics().remote_failures(), 1);
}

#[test]
fn test_signature_mismatch_is_remote_failure() {
    let environment = environment();
    let _core = start_core(&environment);

    let dispatcher = Dispatcher::new("userService", environment).unwrap();
    let error = dispatcher
        .call("find")
        .and_then(|call| call.argument(&"not a number".to_string()))
        .unwrap()
        .invoke::<User, InvocationError>()
        .unwrap_err();

    assert_eq!(error.kind(), FailureKind::RemoteTransport);
    assert_eq!(error.remote_failure().unwrap().type_name(), INVOCATION_ERROR);
}

#[test]
fn test_concurrent_callers() {
    let environment = environment();
    let _core = start_core(&environment);
    let users = user_service(&environment);

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let users = Arc::clone(&users);
            thread::spawn(move || {
                let name = format!("user-{n}");
                let created = users.create(name.clone()).unwrap();
                assert_eq!(created.name, name);

                // Each thread's bypass argument stays its own.
                let log = Arc::new(AuditLog::default());
                for _ in 0..10 {
                    users.audit(Arc::clone(&log), name.clone()).unwrap();
                }
                let entries = log.entries.lock().unwrap();
                assert_eq!(entries.len(), 10);
                assert!(entries.iter().all(|entry| *entry == name));
                drop(entries);

                users.find(created.id).unwrap()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=8).collect::<Vec<u64>>());
}

#[test]
fn test_session_propagation() {
    let environment = environment();
    let codec = PostcardCodec::default();
    let _block = DeploymentBlock::new("core")
        .with_service("/whoami", move |invocation: Invocation| {
            execute(&codec, invocation, |invocation| {
                let described = format!(
                    "{:?}/{:?}",
                    invocation.session_id(),
                    invocation.locale()
                );
                encode_value(&codec, Ok::<_, InvocationError>(described))
            })
        })
        .start(&environment)
        .unwrap();

    let session_id = Uuid::from_u128(7);
    let dispatcher = Dispatcher::new("whoami", environment.clone()).unwrap();

    let anonymous: String = dispatcher
        .call("describe")
        .unwrap()
        .invoke::<_, InvocationError>()
        .unwrap();
    assert_eq!(anonymous, "None/None");

    let scoped = SecurityContext::from_session(
        UserSession::new(session_id)
            .with_locale("de-DE")
            .with_request_scoped_info(true),
    );
    let described: String = dispatcher
        .clone()
        .with_security_context(scoped)
        .call("describe")
        .unwrap()
        .invoke::<_, InvocationError>()
        .unwrap();
    assert_eq!(described, format!("Some({session_id:?})/Some(\"de-DE\")"));

    let unscoped = SecurityContext::from_session(UserSession::new(session_id).with_locale("de-DE"));
    let described: String = dispatcher
        .with_security_context(unscoped)
        .call("describe")
        .unwrap()
        .invoke::<_, InvocationError>()
        .unwrap();
    assert_eq!(described, format!("Some({session_id:?})/None"));
}

#[test]
fn test_proxy_security_context() {
    let environment = environment();
    let _core = start_core(&environment);

    let users = ProxyFactory::new()
        .with_environment(environment)
        .with_security_context(SecurityContext::new(Uuid::from_u128(1)))
        .create::<dyn UserService>("/userService")
        .unwrap();
    assert_eq!(users.count(), Ok(42));
}
