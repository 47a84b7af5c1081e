// Detector API Client
// Implements the extraction and classification endpoint calls

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::models::{PredictRequest, PredictResponse, UploadResponse};

use super::config_store::AppConfig;
use super::upload::{FileSource, PendingFile};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const UPLOAD_PATH: &str = "/api/upload";
const PREDICT_PATH: &str = "/api/predict";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server error: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("Invalid JSON response: {0}")]
    Decode(String),
    #[error("Failed to read file: {0}")]
    Io(String),
}

/// Transport seam between the controller and the two endpoints.
pub trait DetectorApi: Send + Sync {
    /// `POST /api/upload` with the file as multipart field `file`.
    fn extract_text(
        &self,
        file: &PendingFile,
    ) -> impl Future<Output = Result<UploadResponse, ClientError>> + Send;

    /// `POST /api/predict` with `{ "text": ... }`.
    fn predict(&self, text: &str) -> impl Future<Output = Result<PredictResponse, ClientError>> + Send;
}

pub struct ApiClient {
    client: Client,
    upload_url: String,
    predict_url: String,
}

impl ApiClient {
    /// Client without a request timeout.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder().build().unwrap_or_default();
        Self::with_client(client, base_url)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs.filter(|s| *s > 0) {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(proxy) = config.proxy.as_ref().filter(|p| p.enabled) {
            if let Some(url) = proxy.url.as_deref().filter(|u| !u.trim().is_empty()) {
                builder = builder.proxy(reqwest::Proxy::all(url)?);
            }
        }
        let client = builder.build()?;
        Ok(Self::with_client(client, &config.base_url))
    }

    fn with_client(client: Client, base_url: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        Self {
            client,
            upload_url: format!("{}{}", base, UPLOAD_PATH),
            predict_url: format!("{}{}", base, PREDICT_PATH),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    /// Both endpoints answer errors with a JSON body and a 4xx/5xx status, so the body
    /// is decoded first and the status only matters when it is not JSON.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<T>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ClientError::Status {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(ClientError::Decode(e.to_string())),
        }
    }
}

impl DetectorApi for ApiClient {
    async fn extract_text(&self, file: &PendingFile) -> Result<UploadResponse, ClientError> {
        let bytes = match &file.source {
            FileSource::Memory(bytes) => bytes.clone(),
            FileSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ClientError::Io(e.to_string()))?,
        };
        let part = Part::bytes(bytes).file_name(file.meta.name.clone());
        let form = Form::new().part("file", part);

        let start = Instant::now();
        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;
        debug!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "api.upload"
        );
        Self::decode(response).await
    }

    async fn predict(&self, text: &str) -> Result<PredictResponse, ClientError> {
        let request = PredictRequest {
            text: text.to_string(),
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.predict_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        debug!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "api.predict"
        );
        Self::decode(response).await
    }
}
