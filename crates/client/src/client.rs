//! HTTP calls for the quotation lock endpoints.

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use studio_core::lease::LockStatus;
use studio_core::types::{DbId, Timestamp};

use crate::error::ClientError;

/// `{ "data": T }` response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ReleaseBody {
    released: bool,
}

/// JSON error body produced by the API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    code: String,
    locked_by: Option<DbId>,
    locked_by_name: Option<String>,
    locked_at: Option<Timestamp>,
}

/// Authenticated client for `/api/v1/quotations/{id}/lock`.
///
/// The server derives the holder from the bearer token, so one client is one
/// holder. Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct LockClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl LockClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn lock_url(&self, quotation_id: DbId) -> String {
        format!("{}/api/v1/quotations/{quotation_id}/lock", self.base_url)
    }

    /// Take or re-take the lock.
    pub async fn acquire(&self, quotation_id: DbId) -> Result<LockStatus, ClientError> {
        let response = self.send(Method::POST, quotation_id).await?;
        read_data(response).await
    }

    /// Renew the caller's lease.
    pub async fn heartbeat(&self, quotation_id: DbId) -> Result<LockStatus, ClientError> {
        let response = self.send(Method::PATCH, quotation_id).await?;
        read_data(response).await
    }

    /// Release the caller's lock. `Ok(false)` means there was nothing to release.
    pub async fn release(&self, quotation_id: DbId) -> Result<bool, ClientError> {
        let response = self.send(Method::DELETE, quotation_id).await?;
        let body: ReleaseBody = read_data(response).await?;
        Ok(body.released)
    }

    /// Current lock status.
    pub async fn status(&self, quotation_id: DbId) -> Result<LockStatus, ClientError> {
        let response = self.send(Method::GET, quotation_id).await?;
        read_data(response).await
    }

    async fn send(&self, method: Method, quotation_id: DbId) -> Result<Response, ClientError> {
        let response = self
            .http
            .request(method, self.lock_url(quotation_id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(response)
    }
}

/// Unwrap a success envelope, or turn an error body into a [`ClientError`].
async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        let envelope: Envelope<T> = response.json().await?;
        return Ok(envelope.data);
    }

    // Error bodies are JSON from our handlers, but proxies and extractor
    // rejections may send plain text.
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_else(|_| ErrorBody {
        error: text,
        ..ErrorBody::default()
    });
    Err(classify_error(status, body))
}

fn classify_error(status: StatusCode, body: ErrorBody) -> ClientError {
    match (status, body.code.as_str()) {
        (StatusCode::CONFLICT, "LOCK_CONFLICT") => ClientError::Conflict {
            holder_id: body.locked_by,
            holder_name: body.locked_by_name.unwrap_or_else(|| "another user".to_string()),
            locked_at: body.locked_at,
        },
        (StatusCode::CONFLICT, "LOCK_LOST") => ClientError::LockLost,
        _ => ClientError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.error,
        },
    }
}
