use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;

pub const TOKEN_KEY: &str = "token";

/// Persisted holder of the backend token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_token(&self) -> anyhow::Result<Option<String>>;
    async fn set_token(&self, token: &str) -> anyhow::Result<()>;
    async fn clear_token(&self) -> anyhow::Result<()>;
}

pub struct SqliteCredentialStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteCredentialStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, crate::errors::AppError>,
    ) -> anyhow::Result<T> {
        let conn = self
            .db
            .lock()
            .map_err(|_| anyhow!("credential database lock poisoned"))?;
        Ok(f(&*conn)?)
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get_token(&self) -> anyhow::Result<Option<String>> {
        self.with_conn(|conn| queries::get_credential(conn, TOKEN_KEY))
    }

    async fn set_token(&self, token: &str) -> anyhow::Result<()> {
        self.with_conn(|conn| queries::set_credential(conn, TOKEN_KEY, token))
    }

    async fn clear_token(&self) -> anyhow::Result<()> {
        let removed = self.with_conn(|conn| queries::delete_credential(conn, TOKEN_KEY))?;
        if !removed {
            tracing::debug!("no stored token to clear");
        }
        Ok(())
    }
}

/// Process-local store, for tests and short-lived sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.token
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_token(&self) -> anyhow::Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    async fn set_token(&self, token: &str) -> anyhow::Result<()> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    async fn clear_token(&self) -> anyhow::Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
