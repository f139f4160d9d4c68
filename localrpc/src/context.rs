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

//! Caller session context.
//!
//! The context travels explicitly with the proxy or dispatcher that makes the
//! call; nothing is read from thread-local state.

use std::sync::Arc;
use uuid::Uuid;

/// A user session as seen by the invocation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    id: Uuid,
    locale: Option<String>,
    time_zone: Option<String>,
    address: Option<String>,
    client_info: Option<String>,
    request_scoped: bool,
}

impl UserSession {
    /// Creates a session without request-scoped info.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            locale: None,
            time_zone: None,
            address: None,
            client_info: None,
            request_scoped: false,
        }
    }

    /// Sets the session locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the session time zone.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Sets the client address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the client info string.
    #[must_use]
    pub fn with_client_info(mut self, client_info: impl Into<String>) -> Self {
        self.client_info = Some(client_info.into());
        self
    }

    /// Marks whether locale, time zone, address and client info belong to the
    /// current request and should travel with each invocation.
    #[must_use]
    pub fn with_request_scoped_info(mut self, request_scoped: bool) -> Self {
        self.request_scoped = request_scoped;
        self
    }

    /// Returns the session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the session locale.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Returns the session time zone.
    pub fn time_zone(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }

    /// Returns the client address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the client info string.
    pub fn client_info(&self) -> Option<&str> {
        self.client_info.as_deref()
    }

    /// Returns `true` if session attributes travel with each invocation.
    pub fn has_request_scoped_info(&self) -> bool {
        self.request_scoped
    }
}

/// Security context of a caller.
///
/// A context always has a session id; the full session is optional, for
/// example when only the id is known to a system caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityContext {
    session_id: Uuid,
    session: Option<Arc<UserSession>>,
}

impl SecurityContext {
    /// Creates a context that knows only the session id.
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            session: None,
        }
    }

    /// Creates a context for a full session.
    pub fn from_session(session: UserSession) -> Self {
        Self::from_shared_session(Arc::new(session))
    }

    /// Creates a context for a shared session.
    pub fn from_shared_session(session: Arc<UserSession>) -> Self {
        Self {
            session_id: session.id(),
            session: Some(session),
        }
    }

    /// Returns the session id.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Returns the full session, if known.
    pub fn session(&self) -> Option<&UserSession> {
        self.session.as_deref()
    }
}
