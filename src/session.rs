//! The single owner of the authentication session.
//!
//! The durable store is written first and the in-memory mirror second, so a
//! guard check never sees a session that would not survive a restart.

use crate::error::{ClientError, Result};
use crate::models::{Session, UserSummary};
use crate::storage::KeyValueStore;
use std::cell::RefCell;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

pub struct SessionStore {
    storage: Box<dyn KeyValueStore>,
    current: RefCell<Option<Session>>,
}

impl SessionStore {
    /// Open the store, restoring any session persisted by a previous run
    pub fn open(storage: Box<dyn KeyValueStore>) -> Self {
        let restored = Self::restore(storage.as_ref());
        let store = Self {
            storage,
            current: RefCell::new(None),
        };
        match restored {
            Some(session) => {
                tracing::debug!(user = %session.user.username, "restored persisted session");
                *store.current.borrow_mut() = Some(session);
            }
            None if store.storage.get(TOKEN_KEY).is_some() => {
                tracing::warn!("discarding persisted token without a readable user");
                store.clear();
            }
            None => {}
        }
        store
    }

    fn restore(storage: &dyn KeyValueStore) -> Option<Session> {
        let token = storage.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
        let user: UserSummary = serde_json::from_str(&storage.get(USER_KEY)?).ok()?;
        Some(Session { token, user })
    }

    pub fn set(&self, session: Session) -> Result<()> {
        let user = serde_json::to_string(&session.user)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.storage
            .set(TOKEN_KEY, &session.token)
            .and_then(|_| self.storage.set(USER_KEY, &user))
            .map_err(|e| ClientError::Storage(format!("{:#}", e)))?;
        *self.current.borrow_mut() = Some(session);
        Ok(())
    }

    /// Remove the session. The in-memory mirror is always cleared, even when
    /// the durable store fails.
    pub fn clear(&self) {
        self.current.borrow_mut().take();
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, error = %format!("{:#}", err), "failed to remove persisted session key");
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn current_token(&self) -> Option<String> {
        self.current.borrow().as_ref().map(|s| s.token.clone())
    }

    pub fn current_user(&self) -> Option<UserSummary> {
        self.current.borrow().as_ref().map(|s| s.user.clone())
    }

    /// Replace the cached user after a confirmed profile change; the id learned
    /// at login is kept when the server omits it.
    pub fn update_user(&self, user: UserSummary) -> Result<()> {
        let current = self.current.borrow().clone();
        let Some(mut session) = current else {
            return Ok(());
        };
        session.user = UserSummary {
            id: user.id.or(session.user.id),
            ..user
        };
        self.set(session)
    }
}
