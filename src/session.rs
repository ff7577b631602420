//! Login-state capability
//!
//! The page only reads the `logged_user` entry; writing it belongs to
//! whichever front-end authenticates the user.

use crate::error::{ExplorerError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Session key holding the logged-in user name
pub const LOGGED_USER_KEY: &str = "logged_user";

/// Read access to shared session state
pub trait SessionStore: Send + Sync {
    /// Look up a session value
    fn get(&self, key: &str) -> Option<String>;

    /// The logged-in user, if any
    fn logged_user(&self) -> Option<String> {
        self.get(LOGGED_USER_KEY)
    }
}

/// Session state kept in memory for the lifetime of one user session
#[derive(Debug, Clone, Default)]
pub struct InMemorySession {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with `logged_user` already set
    pub fn with_user(user: &str) -> Self {
        let session = Self::new();
        session.insert(LOGGED_USER_KEY, user);
        session
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

impl SessionStore for InMemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

/// Return the logged-in user or stop the page.
pub fn require_logged_user(session: &dyn SessionStore) -> Result<String> {
    match session.logged_user() {
        Some(user) if !user.trim().is_empty() => Ok(user),
        _ => {
            warn!("page requested without a logged-in user");
            Err(ExplorerError::NotLoggedIn)
        }
    }
}
