//! timeline-harvest: a resumable timeline crawler
//!
//! This crate drives a real browser session over a social timeline, rebuilds
//! structured items from the network responses the page makes, and keeps a
//! per-target checkpoint and archive so an interrupted crawl can pick up where
//! it stopped without losing or duplicating items.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid login transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::LoginState,
        to: state::LoginState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Returns true for failures worth retrying at the navigation boundary
    ///
    /// Only network-class failures qualify. Authentication, rate limits and
    /// structural problems are surfaced to the caller instead.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Browser(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOptions, CrawlOrchestrator, CrawlReport};
pub use model::{AuthorSummary, Item};
pub use state::{LoginState, SessionState};
