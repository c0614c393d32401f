use crate::api::models::{ApiEnvelope, User};
use crate::config::{AppConfig, ClientConfig};
use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Typed client for the QingYu REST API. Holds the persisted config store
/// (token lives there) and the most recent authenticated user snapshot.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<RwLock<AppConfig>>,
    current_user: Arc<RwLock<Option<User>>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, store: Arc<RwLock<AppConfig>>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("QingYu/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            config,
            store,
            current_user: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RwLock<AppConfig>> {
        &self.store
    }

    /// Snapshot of the last successfully fetched user. Failed requests never
    /// touch this; it only moves forward on success.
    pub async fn current_user(&self) -> Option<User> {
        self.current_user.read().await.clone()
    }

    pub(crate) async fn set_current_user(&self, user: Option<User>) {
        *self.current_user.write().await = user;
    }

    pub(crate) fn language(&self) -> String {
        self.config.language.clone()
    }

    async fn request_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        {
            let store = self.store.read().await;
            if let Some(token) = &store.auth_token {
                let auth_value = format!("Bearer {}", token);
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&auth_value)
                        .map_err(|e| AppError::Config(e.to_string()))?,
                );
            }
        }

        let device = &self.config.device;
        headers.insert(
            "x-device-id",
            HeaderValue::from_str(&device.device_id).map_err(|e| AppError::Config(e.to_string()))?,
        );
        headers.insert(
            "x-device-model",
            HeaderValue::from_str(&device.device_model)
                .map_err(|e| AppError::Config(e.to_string()))?,
        );
        headers.insert(
            "x-os-version",
            HeaderValue::from_str(&device.os_version).map_err(|e| AppError::Config(e.to_string()))?,
        );
        headers.insert(
            "x-app-version",
            HeaderValue::from_str(&device.app_version)
                .map_err(|e| AppError::Config(e.to_string()))?,
        );

        Ok(headers)
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> AppResult<reqwest::Response> {
        let url = format!("{}{}", self.config.api_root(), path);
        let mut headers = self.request_headers().await?;
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let mut builder = self.http.request(method, &url).headers(headers);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Decode an envelope response. Transport failures, protocol-level
    /// failures (`success=false`) and undecodable bodies all surface as the
    /// matching [`AppError`] variant.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<ApiEnvelope<T>> {
        let status = response.status();
        let bytes = response.bytes().await?;

        let envelope: ApiEnvelope<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(err) if status.is_success() => return Err(AppError::Json(err)),
            Err(_) => return Err(Self::status_error(status, &bytes)),
        };

        if !envelope.success {
            return Err(Self::envelope_error(status, envelope.code, envelope.message));
        }

        Ok(envelope)
    }

    /// Error body that is not an envelope: classify by HTTP status alone.
    fn status_error(status: StatusCode, body: &[u8]) -> AppError {
        let message = String::from_utf8_lossy(body).trim().to_string();
        let message = if message.is_empty() {
            status.to_string()
        } else {
            message
        };
        match status {
            StatusCode::UNAUTHORIZED => AppError::Auth(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited(message),
            _ => AppError::InvalidResponse(format!("HTTP {}: {}", status.as_u16(), message)),
        }
    }

    /// `success=false` envelope: the error code decides, status breaks ties.
    fn envelope_error(
        status: StatusCode,
        code: Option<String>,
        message: Option<String>,
    ) -> AppError {
        let message = message.unwrap_or_else(|| "Request failed".to_string());
        let code_str = code.as_deref().unwrap_or("");

        if code_str.starts_with("AUTH") || status == StatusCode::UNAUTHORIZED {
            AppError::Auth(message)
        } else if code_str.starts_with("NOT_FOUND") || status == StatusCode::NOT_FOUND {
            AppError::NotFound(message)
        } else if code_str.starts_with("RATE_LIMIT") || status == StatusCode::TOO_MANY_REQUESTS {
            AppError::RateLimited(message)
        } else {
            AppError::Server { message, code }
        }
    }

    /// GET expecting a data payload.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let response = self.execute(Method::GET, path, query, None).await?;
        let envelope = Self::decode::<T>(response).await?;
        envelope
            .data
            .ok_or_else(|| AppError::InvalidResponse("Response missing data".into()))
    }

    /// POST expecting a data payload.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> AppResult<T> {
        let response = self.execute(Method::POST, path, &[], Some(body)).await?;
        let envelope = Self::decode::<T>(response).await?;
        envelope
            .data
            .ok_or_else(|| AppError::InvalidResponse("Response missing data".into()))
    }

    /// PUT expecting a data payload.
    pub(crate) async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> AppResult<T> {
        let response = self.execute(Method::PUT, path, &[], Some(body)).await?;
        let envelope = Self::decode::<T>(response).await?;
        envelope
            .data
            .ok_or_else(|| AppError::InvalidResponse("Response missing data".into()))
    }

    /// POST where a successful envelope is enough; `data` may be absent.
    pub(crate) async fn post_unit(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        let response = self.execute(Method::POST, path, &[], body).await?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// DELETE with an optional body; `data` may be absent.
    pub(crate) async fn delete_unit(
        &self,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        let response = self.execute(Method::DELETE, path, &[], body).await?;
        Self::decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    /// Plain fetch outside the envelope protocol, for CDN audio downloads.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_maps_common_codes() {
        let err = ApiClient::status_error(StatusCode::UNAUTHORIZED, b"nope");
        assert_eq!(err.kind(), "auth");
        let err = ApiClient::status_error(StatusCode::NOT_FOUND, b"");
        assert_eq!(err.kind(), "not_found");
        let err = ApiClient::status_error(StatusCode::TOO_MANY_REQUESTS, b"slow down");
        assert_eq!(err.kind(), "rate_limit");
        let err = ApiClient::status_error(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(err.kind(), "invalid_response");
    }

    #[test]
    fn envelope_error_prefers_code_over_status() {
        let err = ApiClient::envelope_error(
            StatusCode::OK,
            Some("AUTH_401".into()),
            Some("token expired".into()),
        );
        assert_eq!(err.kind(), "auth");

        let err = ApiClient::envelope_error(
            StatusCode::OK,
            Some("NOT_FOUND_AUDIO".into()),
            Some("no such audio".into()),
        );
        assert_eq!(err.kind(), "not_found");

        let err = ApiClient::envelope_error(
            StatusCode::OK,
            Some("RATE_LIMIT_EXCEEDED".into()),
            None,
        );
        assert_eq!(err.kind(), "rate_limit");
    }

    #[test]
    fn envelope_error_falls_back_to_status_then_server() {
        let err = ApiClient::envelope_error(StatusCode::UNAUTHORIZED, None, None);
        assert_eq!(err.kind(), "auth");

        let err = ApiClient::envelope_error(
            StatusCode::OK,
            Some("VALIDATION_FAILED".into()),
            Some("bad input".into()),
        );
        match err {
            AppError::Server { message, code } => {
                assert_eq!(message, "bad input");
                assert_eq!(code.as_deref(), Some("VALIDATION_FAILED"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }
}
