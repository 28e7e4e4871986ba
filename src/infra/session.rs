//! Bearer credential shared by every API adapter.
//!
//! The credential is attached to each request. When the backend rejects it the
//! session moves to [`SessionState::Expired`] and the token is dropped; every
//! subscriber sees the change, so the front end can route back to sign-in.

use std::fmt;
use std::sync::RwLock;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::util::lock::{rw_read, rw_write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Active,
    Expired,
    LoggedOut,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Active => "active",
            SessionState::Expired => "expired",
            SessionState::LoggedOut => "logged_out",
        }
    }
}

pub struct Session {
    token: RwLock<Option<String>>,
    state: watch::Sender<SessionState>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            token: RwLock::new(None),
            state,
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(token);
        session
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            warn!("ignoring empty credential");
            return;
        }
        *rw_write(&self.token, "infra::session") = Some(token.to_string());
        self.state.send_replace(SessionState::Active);
        info!("session active");
    }

    /// Header value for the current credential, if any.
    pub fn bearer(&self) -> Option<String> {
        rw_read(&self.token, "infra::session")
            .as_deref()
            .map(|token| format!("Bearer {token}"))
    }

    /// Drop the credential after the backend rejected it.
    pub fn invalidate(&self) {
        let had_token = rw_write(&self.token, "infra::session").take().is_some();
        if had_token {
            self.state.send_replace(SessionState::Expired);
            warn!("credential rejected; session expired");
        }
    }

    pub fn logout(&self) {
        rw_write(&self.token, "infra::session").take();
        self.state.send_replace(SessionState::LoggedOut);
        info!("session logged out");
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
