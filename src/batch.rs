//! Batch orchestration: runs fetch, extract and summarize for every link of a
//! request on a fixed-size worker pool and collects one outcome per link.
//!
//! Results land in slots indexed by input position, so output order never
//! depends on completion order. Each worker claims the next unprocessed index
//! from a shared counter and is the only writer of that slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use once_cell::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::{BatchConfig, SummarizeFailurePolicy};
use crate::error::{AppError, LlmError, ScrapeError};
use crate::llm::Summarizer;
use crate::scraper::{self, Fetcher};

/// What the pipeline does after a successful fetch. Chosen once per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    RawPassthrough,
    ExtractOnly,
    ExtractAndSummarize,
}

impl Mode {
    /// `raw` wins over `summarize`.
    pub fn from_flags(raw: bool, summarize: bool) -> Self {
        match (raw, summarize) {
            (true, _) => Mode::RawPassthrough,
            (false, false) => Mode::ExtractOnly,
            (false, true) => Mode::ExtractAndSummarize,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeRequest {
    pub links: Vec<String>,
    pub raw: bool,
    pub summarize: bool,
}

impl ScrapeRequest {
    pub fn new(links: Vec<String>) -> Self {
        Self {
            links,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_flags(self.raw, self.summarize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    Success {
        link: String,
        content: String,
        /// Set when summarization was requested but not applied.
        note: Option<String>,
    },
    Failure {
        link: String,
        error: ScrapeError,
    },
}

impl UrlOutcome {
    pub fn link(&self) -> &str {
        match self {
            UrlOutcome::Success { link, .. } | UrlOutcome::Failure { link, .. } => link,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UrlOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&ScrapeError> {
        match self {
            UrlOutcome::Failure { error, .. } => Some(error),
            UrlOutcome::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub results: Vec<UrlOutcome>,
    pub total_processed: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// True when at least one link fell back to unsummarized text.
    pub degraded: bool,
}

impl BatchResult {
    fn from_outcomes(results: Vec<UrlOutcome>) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        let degraded = results
            .iter()
            .any(|r| matches!(r, UrlOutcome::Success { note: Some(_), .. }));

        Self {
            total_processed: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            degraded,
            results,
        }
    }
}

/// Runs batches. Cheap to clone; every field is shared and read-only.
#[derive(Clone)]
pub struct BatchOrchestrator {
    config: BatchConfig,
    fetcher: Arc<dyn Fetcher>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl BatchOrchestrator {
    pub fn new(
        config: BatchConfig,
        fetcher: Arc<dyn Fetcher>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Self {
        Self {
            config: BatchConfig {
                max_concurrent_requests: config.max_concurrent_requests.max(1),
                ..config
            },
            fetcher,
            summarizer,
        }
    }

    /// Whether a summarization provider is configured.
    pub fn summarization_available(&self) -> bool {
        self.summarizer.is_some()
    }

    #[instrument(skip_all, fields(links = request.links.len(), mode = ?request.mode()))]
    pub async fn run_batch(&self, request: ScrapeRequest) -> Result<BatchResult, AppError> {
        if request.links.is_empty() {
            return Err(AppError::InvalidRequest("At least one link is required".to_string()));
        }

        let mode = request.mode();
        if mode == Mode::ExtractAndSummarize && self.summarizer.is_none() {
            warn!("Summarization requested without a provider; returning extracted text");
        }

        let start = Instant::now();
        // Every link is parsed before any worker is dispatched
        let targets: Arc<Vec<(String, Result<Url, ScrapeError>)>> = Arc::new(
            request
                .links
                .into_iter()
                .map(|link| {
                    let parsed = scraper::validate_url(&link);
                    (link, parsed)
                })
                .collect(),
        );
        let invalid = targets.iter().filter(|(_, parsed)| parsed.is_err()).count();
        if invalid > 0 {
            debug!(invalid, "Links failed validation and will not be fetched");
        }

        let total = targets.len();
        let slots: Arc<Vec<OnceCell<UrlOutcome>>> =
            Arc::new((0..total).map(|_| OnceCell::new()).collect());
        let next_index = Arc::new(AtomicUsize::new(0));

        let worker_count = self.config.max_concurrent_requests.min(total);
        let mut workers = JoinSet::new();

        for worker_id in 0..worker_count {
            let this = self.clone();
            let targets = Arc::clone(&targets);
            let slots = Arc::clone(&slots);
            let next_index = Arc::clone(&next_index);

            workers.spawn(async move {
                loop {
                    let index = next_index.fetch_add(1, Ordering::Relaxed);
                    let Some((link, target)) = targets.get(index) else {
                        break;
                    };
                    debug!(worker_id, index, %link, "Processing link");

                    let outcome = this.process_link(link, target, mode).await;
                    if slots[index].set(outcome).is_err() {
                        error!(index, "Result slot written twice");
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Batch worker terminated abnormally: {}", e);
            }
        }

        // All workers are done, so this is the last reference unless a task leaked
        let slots = Arc::try_unwrap(slots).unwrap_or_else(|shared| {
            shared
                .iter()
                .map(|slot| slot.get().cloned().map(OnceCell::with_value).unwrap_or_default())
                .collect()
        });

        let results: Vec<UrlOutcome> = slots
            .into_iter()
            .zip(targets.iter())
            .map(|(slot, (link, _))| {
                slot.into_inner().unwrap_or_else(|| UrlOutcome::Failure {
                    link: link.clone(),
                    error: ScrapeError::WorkerAborted,
                })
            })
            .collect();

        let batch = BatchResult::from_outcomes(results);
        info!(
            total = batch.total_processed,
            successful = batch.success_count,
            failed = batch.failure_count,
            degraded = batch.degraded,
            "Batch completed in {:?}",
            start.elapsed()
        );

        Ok(batch)
    }

    /// Runs the full pipeline for one link. Never fails; errors become outcomes.
    async fn process_link(
        &self,
        link: &str,
        target: &Result<Url, ScrapeError>,
        mode: Mode,
    ) -> UrlOutcome {
        match self.run_pipeline(link, target, mode).await {
            Ok((content, note)) => UrlOutcome::Success {
                link: link.to_string(),
                content,
                note,
            },
            Err(error) => {
                warn!(%link, kind = ?error.kind(), "Link failed: {}", error);
                UrlOutcome::Failure {
                    link: link.to_string(),
                    error,
                }
            }
        }
    }

    async fn run_pipeline(
        &self,
        link: &str,
        target: &Result<Url, ScrapeError>,
        mode: Mode,
    ) -> Result<(String, Option<String>), ScrapeError> {
        let url = target.as_ref().map_err(ScrapeError::clone)?;

        let fetch_start = Instant::now();
        let page = self.fetcher.fetch(url, self.config.request_timeout).await?;
        debug!(
            %link,
            final_url = %page.url,
            status = page.status,
            bytes = page.body.len(),
            "Fetched in {:?}",
            fetch_start.elapsed()
        );

        if mode == Mode::RawPassthrough {
            return Ok((scraper::passthrough(&page.body), None));
        }

        let text = scraper::extract_text(&page.body, page.content_type.as_deref())?;

        if mode == Mode::ExtractOnly {
            return Ok((text, None));
        }

        let Some(summarizer) = &self.summarizer else {
            return Ok((text, Some(LlmError::MissingCredential.to_string())));
        };

        let llm_start = Instant::now();
        let timeout = self.config.summarize_timeout;
        let summarized = match tokio::time::timeout(timeout, summarizer.summarize(&text)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(timeout)),
        };

        match summarized {
            Ok(summary) => {
                debug!(%link, "Summarized in {:?}", llm_start.elapsed());
                Ok((summary, None))
            }
            Err(e) => match self.config.summarize_failure_policy {
                SummarizeFailurePolicy::Fail => Err(e.into()),
                SummarizeFailurePolicy::Fallback => {
                    warn!(%link, "Summarization failed, keeping extracted text: {}", e);
                    Ok((text, Some(format!("AI processing failed: {}", e))))
                }
            },
        }
    }
}
