use serde::{Deserialize, Serialize};

use crate::batch::{BatchResult, ScrapeRequest, UrlOutcome};
use crate::error::{AppError, ErrorKind, Result};

/// Body of `POST /scrape`.
#[derive(Debug, Deserialize)]
pub struct ScrapeRequestBody {
    #[serde(default)]
    pub links: Option<Vec<String>>,
    #[serde(default)]
    pub raw: bool,
    #[serde(default)]
    pub summarize: bool,
}

impl ScrapeRequestBody {
    pub fn into_request(self) -> Result<ScrapeRequest> {
        let links = self.links.ok_or_else(|| {
            AppError::InvalidRequest("links field is required and must be an array".to_string())
        })?;

        Ok(ScrapeRequest {
            links,
            raw: self.raw,
            summarize: self.summarize,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LinkResult {
    Success {
        link: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    Error {
        link: String,
        error: String,
        error_kind: ErrorKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
}

impl From<UrlOutcome> for LinkResult {
    fn from(outcome: UrlOutcome) -> Self {
        match outcome {
            UrlOutcome::Success { link, content, note } => {
                LinkResult::Success { link, content, note }
            }
            UrlOutcome::Failure { link, error } => LinkResult::Error {
                link,
                error: error.to_string(),
                error_kind: error.kind(),
                status_code: error.status_code(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub results: Vec<LinkResult>,
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub degraded: bool,
}

impl From<BatchResult> for ScrapeResponse {
    fn from(batch: BatchResult) -> Self {
        Self {
            total_processed: batch.total_processed,
            successful: batch.success_count,
            failed: batch.failure_count,
            degraded: batch.degraded,
            results: batch.results.into_iter().map(LinkResult::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: f64,
    pub gemini_configured: bool,
}
