use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{ServiceApi, MISSING_TOKEN_PLACEHOLDER};
use crate::errors::ApiError;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, ServiceRequestPayload};

pub struct HttpServiceApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpServiceApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let resp = check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Turns a non-2xx response into `ApiError::Status`, keeping the backend's
/// `message` field when the body has one.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_default();

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ServiceApi for HttpServiceApi {
    async fn create_service_request(
        &self,
        payload: &ServiceRequestPayload,
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url("/api/services"))
            .bearer_auth(token.unwrap_or(MISSING_TOKEN_PLACEHOLDER))
            .json(payload)
            .send()
            .await?;

        check_status(resp).await?;
        Ok(())
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/login"))
            .json(request)
            .send()
            .await?;

        Self::decode(resp).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let resp = self
            .client
            .post(self.url("/api/register"))
            .json(request)
            .send()
            .await?;

        Self::decode(resp).await
    }
}
