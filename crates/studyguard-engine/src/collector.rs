//! HTTP client for the local collector.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use studyguard_common::protocol::ApiResponse;
use studyguard_common::{Course, StatusEvent};
use thiserror::Error;
use url::Url;

use crate::config::schema::CollectorConfig;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Invalid collector URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Collector returned HTTP {0}")]
    Status(StatusCode),
    #[error("Collector rejected the request: {0}")]
    Rejected(String),
}

/// Where the course registry gets its list from.
#[async_trait]
pub trait CourseSource: Send + Sync {
    async fn fetch_courses(&self) -> Result<Vec<Course>, CollectorError>;
}

#[derive(Debug, Clone)]
pub struct CollectorClient {
    base: Url,
    http: reqwest::Client,
}

impl CollectorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CollectorError> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    pub fn from_config(config: &CollectorConfig) -> Result<Self, CollectorError> {
        Self::new(&config.base_url, config.timeout())
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, CollectorError> {
        Ok(self.base.join(path)?)
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, CollectorError> {
        let response = self.http.get(self.endpoint(path)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Status(status));
        }
        Ok(response.json().await?)
    }

    /// `GET /courses`
    pub async fn fetch_courses(&self) -> Result<Vec<Course>, CollectorError> {
        let envelope: ApiResponse<Vec<Course>> = self.get_envelope("courses").await?;
        if !envelope.success {
            return Err(CollectorError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "success=false".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| CollectorError::Rejected("response carried no course data".into()))
    }

    /// `POST /status`. The acknowledgement body is returned as-is.
    pub async fn send_status(&self, event: &StatusEvent) -> Result<serde_json::Value, CollectorError> {
        let response = self
            .http
            .post(self.endpoint("status")?)
            .json(event)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Status(status));
        }
        Ok(response.json().await?)
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<bool, CollectorError> {
        let envelope: ApiResponse<serde_json::Value> = self.get_envelope("health").await?;
        Ok(envelope.success)
    }
}

#[async_trait]
impl CourseSource for CollectorClient {
    async fn fetch_courses(&self) -> Result<Vec<Course>, CollectorError> {
        CollectorClient::fetch_courses(self).await
    }
}
