use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::db;
use crate::services::api::http::HttpServiceApi;
use crate::services::api::ServiceApi;
use crate::services::auth::AuthService;
use crate::services::booking::{BookingFormEngine, EngineOptions};
use crate::services::credentials::{CredentialStore, SqliteCredentialStore};
use crate::services::navigation::Navigator;

pub struct AppState {
    pub config: AppConfig,
    pub api: Arc<dyn ServiceApi>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let conn = db::init_db(&config.database_url)?;
        Ok(Self {
            api: Arc::new(HttpServiceApi::new(config.api_base_url.clone())),
            credentials: Arc::new(SqliteCredentialStore::new(Arc::new(Mutex::new(conn)))),
            config,
        })
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(Arc::clone(&self.api), Arc::clone(&self.credentials))
    }

    pub fn booking_engine(&self, navigator: Arc<dyn Navigator>) -> BookingFormEngine {
        BookingFormEngine::new(
            Arc::clone(&self.api),
            Arc::clone(&self.credentials),
            navigator,
            EngineOptions {
                require_token: self.config.require_token,
                ..EngineOptions::default()
            },
        )
    }
}
