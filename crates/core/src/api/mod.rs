//! # API Client
//!
//! Typed client for the research backend. The streaming endpoint hands its
//! raw response to the session manager; everything else is plain
//! request/response JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LabConfig;
use crate::error::LabError;

/// Payload for starting a research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// Research topic, must be non-empty
    pub topic: String,
    /// Free-text constraints, may be empty
    #[serde(default)]
    pub constraints: String,
}

impl ResearchRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            constraints: String::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = constraints.into();
        self
    }
}

/// Backend health probe response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// One entry in the saved-reports listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub filename: String,
    /// Size in bytes
    pub size: u64,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// A saved report with its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// Payload for regenerating one report section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateRequest {
    /// Target section title
    pub section: String,
    /// Reviewer feedback steering the rewrite
    pub feedback: String,
    /// The full current report text
    pub current_report: String,
}

/// Result of a section regeneration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegenerateResponse {
    pub updated_report: String,
    pub section: String,
    pub message: String,
}

/// Payload for translating a report to English.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    /// The full report text to translate
    pub content: String,
}

/// Result of a translation.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateResponse {
    pub translated: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client bound to one backend base URL. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Open the streaming research endpoint and return the raw response
    /// once the backend has accepted the run. Consumed chunk by chunk by
    /// the session manager.
    pub async fn research_stream(
        &self,
        request: &ResearchRequest,
    ) -> Result<reqwest::Response, LabError> {
        let response = self
            .http
            .post(self.url("/api/research/stream"))
            .json(request)
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus, LabError> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    pub async fn list_reports(&self) -> Result<Vec<ReportSummary>, LabError> {
        let response = self.http.get(self.url("/api/reports")).send().await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    pub async fn get_report(&self, filename: &str) -> Result<Report, LabError> {
        let path = format!("/api/reports/{}", urlencoding::encode(filename));
        let response = self.http.get(self.url(&path)).send().await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    pub async fn delete_report(&self, filename: &str) -> Result<(), LabError> {
        let path = format!("/api/reports/{}", urlencoding::encode(filename));
        let response = self.http.delete(self.url(&path)).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    pub async fn regenerate_section(
        &self,
        request: &RegenerateRequest,
    ) -> Result<RegenerateResponse, LabError> {
        let response = self
            .http
            .post(self.url("/api/report/regenerate"))
            .json(request)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    pub async fn translate_report(
        &self,
        request: &TranslateRequest,
    ) -> Result<TranslateResponse, LabError> {
        let response = self
            .http
            .post(self.url("/api/report/translate"))
            .json(request)
            .send()
            .await?;
        Ok(Self::check_status(response).await?.json().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LabError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        Err(LabError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}
