use std::sync::Arc;

use crate::models::{AuthResponse, LoginRequest, RegisterRequest, Role};
use crate::services::api::ServiceApi;
use crate::services::credentials::CredentialStore;
use crate::services::navigation::Route;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("All fields are required")]
    MissingFields,

    #[error("{0}")]
    Rejected(String),

    #[error("failed to store credential: {0}")]
    Storage(String),
}

pub struct AuthService {
    api: Arc<dyn ServiceApi>,
    credentials: Arc<dyn CredentialStore>,
}

impl AuthService {
    pub fn new(api: Arc<dyn ServiceApi>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { api, credentials }
    }

    /// Logs in and stores the token. Admins land on the dashboard, everyone else on home.
    pub async fn login(&self, email: &str, password: &str) -> Result<Route, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.api.login(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "login rejected");
            AuthError::Rejected("Login failed: invalid credentials".to_string())
        })?;

        let role = resp.user.as_ref().map(|u| u.role).unwrap_or_default();
        self.store(&resp).await?;
        tracing::info!(role = role.as_str(), "logged in");

        Ok(match role {
            Role::Admin => Route::Dashboard,
            _ => Route::Home,
        })
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<Route, AuthError> {
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password.to_string(),
            role: role.unwrap_or_default(),
        };
        let resp = self.api.register(&request).await.map_err(|e| {
            tracing::warn!(error = %e, "registration rejected");
            AuthError::Rejected(
                e.server_message()
                    .unwrap_or("Registration failed")
                    .to_string(),
            )
        })?;

        self.store(&resp).await?;
        tracing::info!(role = request.role.as_str(), "registered");
        Ok(Route::Home)
    }

    pub async fn logout(&self) -> Result<Route, AuthError> {
        self.credentials
            .clear_token()
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        tracing::info!("logged out");
        Ok(Route::Login)
    }

    async fn store(&self, resp: &AuthResponse) -> Result<(), AuthError> {
        self.credentials
            .set_token(&resp.token)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))
    }
}
