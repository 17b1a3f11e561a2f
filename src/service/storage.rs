// service/storage.rs
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Failure kinds the upload pipeline reacts to. Backends classify their own
/// errors so callers never inspect message text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Network error talking to storage: {0}")]
    Network(String),

    #[error("Storage request timed out")]
    Timeout,

    #[error("Storage server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Storage rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Maps an HTTP status (or the `statusCode` the storage API embeds in its
    /// error body) to a failure kind.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            413 | 507 => StorageError::QuotaExceeded(message),
            408 | 504 => StorageError::Timeout,
            500..=599 => StorageError::Server { status, message },
            _ => StorageError::Rejected { status, message },
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StorageError::Timeout
        } else if let Some(status) = err.status() {
            StorageError::from_status(status.as_u16(), err.to_string())
        } else {
            StorageError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        // ENOSPC / EDQUOT
        match err.raw_os_error() {
            Some(28) | Some(122) => StorageError::QuotaExceeded(err.to_string()),
            _ => StorageError::Io(err.to_string()),
        }
    }
}

/// Object storage used for property media, contracts, vouchers and
/// franchise documents.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores `data` under `bucket/key` and returns its public URL.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Whether `url` points at an object this backend serves.
    fn owns_url(&self, url: &str) -> bool;
}

/// Supabase-compatible storage REST API.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn object_path(bucket: &str, key: &str) -> String {
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", urlencoding::encode(bucket), encoded_key)
    }
}

/// The storage API answers some failures with HTTP 400 and the real code in
/// the body, e.g. `{"statusCode":"413","error":"Payload too large"}`.
fn embedded_status(body: &str) -> Option<u16> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("statusCode")? {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        _ => None,
    }
}

#[async_trait]
impl StorageBackend for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.base_url,
            Self::object_path(bucket, key)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Stored object {}/{}", bucket, key);
            return Ok(self.public_url(bucket, key));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "No response body".to_string());
        let effective = match (status, embedded_status(&body)) {
            (StatusCode::BAD_REQUEST, Some(code)) => code,
            _ => status.as_u16(),
        };

        tracing::warn!("Storage upload to {}/{} failed ({}): {}", bucket, key, effective, body);
        Err(StorageError::from_status(effective, body))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}",
            self.base_url,
            Self::object_path(bucket, key)
        )
    }

    fn owns_url(&self, url: &str) -> bool {
        url.starts_with(&format!("{}/storage/v1/object/public/", self.base_url))
    }
}

/// Filesystem storage for local development; files are served under `/files`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    pub fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        if key.split('/').any(|s| s == ".." || s.is_empty()) || bucket.contains('/') {
            return Err(StorageError::Rejected {
                status: 400,
                message: format!("Invalid object key {}/{}", bucket, key),
            });
        }
        Ok(self.base_path.join(bucket).join(key))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let path = self.get_path(bucket, key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        Ok(self.public_url(bucket, key))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/files/{}/{}", self.base_url, bucket, key)
    }

    fn owns_url(&self, url: &str) -> bool {
        url.starts_with(&format!("{}/files/", self.base_url))
    }
}
