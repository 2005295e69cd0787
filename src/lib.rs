pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod llm;
pub mod scraper;

use std::sync::Arc;

use tracing::warn;

use crate::batch::BatchOrchestrator;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::llm::{GeminiSummarizer, Summarizer};
use crate::scraper::HttpFetcher;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<BatchOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: BatchOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wires the real HTTP fetcher and, when a key is configured, the Gemini summarizer.
    pub fn from_config(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new().map_err(|e| AppError::Internal(e.to_string()))?;

        let summarizer = GeminiSummarizer::from_config(&config)
            .map(|s| Arc::new(s) as Arc<dyn Summarizer>);
        if summarizer.is_none() {
            warn!("GEMINI_API_KEY not set. AI features will not work.");
        }

        let orchestrator =
            BatchOrchestrator::new(config.batch_config(), Arc::new(fetcher), summarizer);
        Ok(Self::new(config, orchestrator))
    }
}
