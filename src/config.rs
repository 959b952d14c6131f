use std::env;

use crate::errors::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub database_url: String,
    /// Refuse to submit bookings when no token is stored.
    pub require_token: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let api_base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "API_BASE_URL must be an http(s) URL, got {api_base_url:?}"
            )));
        }

        let require_token = match env::var("REQUIRE_TOKEN") {
            Ok(v) => parse_flag(&v)
                .ok_or_else(|| AppError::Config(format!("REQUIRE_TOKEN: invalid value {v:?}")))?,
            Err(_) => false,
        };

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "aquabook.db".to_string()),
            require_token,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
