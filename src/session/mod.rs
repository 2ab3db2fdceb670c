//! Session provider: who is signed in, and notification when that changes

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// Identifier of an authenticated user; every stored row is scoped by it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Source of the current identity
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, if any
    fn current_user(&self) -> Option<UserId>;

    /// Receiver that observes every sign-in and sign-out
    fn subscribe(&self) -> watch::Receiver<Option<UserId>>;
}

/// In-process session backed by a watch channel
///
/// Sign-in credentials are verified by the hosted auth service; this type only
/// tracks the identity that service handed back.
pub struct LocalSession {
    current: watch::Sender<Option<UserId>>,
}

impl LocalSession {
    /// A session with nobody signed in
    pub fn anonymous() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// A session already signed in as `user`
    pub fn signed_in(user: UserId) -> Self {
        let (current, _) = watch::channel(Some(user));
        Self { current }
    }

    pub fn sign_in(&self, user: UserId) {
        tracing::info!("session: signed in as {}", user);
        self.current.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        if self.current.send_replace(None).is_some() {
            tracing::info!("session: signed out");
        }
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl SessionProvider for LocalSession {
    fn current_user(&self) -> Option<UserId> {
        self.current.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<UserId>> {
        self.current.subscribe()
    }
}
