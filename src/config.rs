use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SUMMARIZE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// What happens to a link whose summarization call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummarizeFailurePolicy {
    /// Keep the extracted text, attach a note and mark the batch degraded.
    #[default]
    Fallback,
    /// Report the link as a `SummarizationError` failure.
    Fail,
}

impl FromStr for SummarizeFailurePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "fail" => Ok(Self::Fail),
            other => Err(AppError::ConfigError(format!(
                "Invalid SUMMARIZE_FAILURE_POLICY '{}', expected 'fallback' or 'fail'",
                other
            ))),
        }
    }
}

/// Settings the batch orchestrator is constructed with. Read-only once built.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
    pub summarize_timeout: Duration,
    pub summarize_failure_policy: SummarizeFailurePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            summarize_timeout: Duration::from_secs(DEFAULT_SUMMARIZE_TIMEOUT_SECS),
            summarize_failure_policy: SummarizeFailurePolicy::Fallback,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub api_key: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
    pub summarize_timeout: Duration,
    pub summarize_failure_policy: SummarizeFailurePolicy,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_addr", &self.server_addr)
            .field("gemini_configured", &self.gemini_api_key.is_some())
            .field("gemini_model", &self.gemini_model)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("request_timeout", &self.request_timeout)
            .field("summarize_timeout", &self.summarize_timeout)
            .field("summarize_failure_policy", &self.summarize_failure_policy)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::ConfigError("API_KEY must be set".to_string()))?;

        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|v| !v.trim().is_empty());
        let gemini_model =
            lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let gemini_base_url = lookup("GEMINI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        // Load server configuration with defaults
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "5000".to_string());
        let port = port
            .parse::<u16>()
            .map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let max_concurrent_requests = parse_positive(
            &lookup,
            "MAX_CONCURRENT_REQUESTS",
            DEFAULT_MAX_CONCURRENT_REQUESTS as u64,
        )? as usize;
        let request_timeout = Duration::from_secs(parse_positive(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let summarize_timeout = Duration::from_secs(parse_positive(
            &lookup,
            "SUMMARIZE_TIMEOUT_SECS",
            DEFAULT_SUMMARIZE_TIMEOUT_SECS,
        )?);
        let summarize_failure_policy = match lookup("SUMMARIZE_FAILURE_POLICY") {
            Some(v) => v.parse()?,
            None => SummarizeFailurePolicy::default(),
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            api_key,
            gemini_api_key,
            gemini_model,
            gemini_base_url,
            max_concurrent_requests,
            request_timeout,
            summarize_timeout,
            summarize_failure_policy,
        })
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: self.request_timeout,
            summarize_timeout: self.summarize_timeout,
            summarize_failure_policy: self.summarize_failure_policy,
        }
    }
}

fn parse_positive<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e)))?,
        None => default,
    };
    if value == 0 {
        return Err(AppError::ConfigError(format!("{} must be at least 1", key)));
    }
    Ok(value)
}
