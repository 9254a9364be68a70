use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use crate::db::{self, DbPool};

/// Scoped string storage for session credentials.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Values kept in the SQLite `session_store` table under one scope.
pub struct SqliteStore {
    pool: DbPool,
    scope: String,
}

impl SqliteStore {
    pub fn new(pool: DbPool, scope: impl Into<String>) -> Self {
        Self {
            pool,
            scope: scope.into(),
        }
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        db::get_value(&self.pool, &self.scope, key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        db::set_value(&self.pool, &self.scope, key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        db::delete_value(&self.pool, &self.scope, key)
    }
}

/// Process-lifetime store. Nothing survives a restart; the server persists
/// sessions through `SqliteStore`.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| anyhow!("memory store poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| anyhow!("memory store poisoned"))?;
        values.remove(key);
        Ok(())
    }
}
