pub mod http;

use async_trait::async_trait;

use crate::errors::ApiError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, ServiceRequestPayload};

/// Written in place of the token when none is stored. The backend then answers 401.
pub const MISSING_TOKEN_PLACEHOLDER: &str = "null";

#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// `POST /api/services`. Any 2xx counts as accepted; the body is ignored.
    async fn create_service_request(
        &self,
        payload: &ServiceRequestPayload,
        token: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;
}
