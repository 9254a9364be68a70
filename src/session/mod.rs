mod store;

use std::sync::Arc;

use crate::error::{Result, ScrobbleError};
use crate::models::Session;

pub use store::{KeyValueStore, MemoryStore, SqliteStore};

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const AUTH_KEY_KEY: &str = "auth_key";
pub const USER_NAME_KEY: &str = "user_name";

/// In-memory session mirrored into a key-value store.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    session: Session,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Reads each persisted value independently; absent values leave the
    /// in-memory field untouched.
    pub fn load(&mut self) -> Result<()> {
        if let Some(token) = self.read(AUTH_TOKEN_KEY)? {
            self.session.auth_token = Some(token);
        }
        if let Some(key) = self.read(AUTH_KEY_KEY)? {
            self.session.auth_key = Some(key);
        }
        if let Some(user) = self.read(USER_NAME_KEY)? {
            self.session.user_name = Some(user);
        }
        Ok(())
    }

    pub fn set_auth_token(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(value) = non_empty(value) {
            self.write(AUTH_TOKEN_KEY, value)?;
            self.session.auth_token = Some(value.to_string());
        }
        Ok(())
    }

    pub fn set_auth_key(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(value) = non_empty(value) {
            self.write(AUTH_KEY_KEY, value)?;
            self.session.auth_key = Some(value.to_string());
        }
        Ok(())
    }

    pub fn set_user_name(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(value) = non_empty(value) {
            self.write(USER_NAME_KEY, value)?;
            self.session.user_name = Some(value.to_string());
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.session = Session::default();
        for key in [AUTH_TOKEN_KEY, AUTH_KEY_KEY, USER_NAME_KEY] {
            self.store.remove(key).map_err(ScrobbleError::Storage)?;
        }
        tracing::info!("Cleared Last.fm session");
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).map_err(ScrobbleError::Storage)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key, value).map_err(ScrobbleError::Storage)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
