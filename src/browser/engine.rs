//! Browser engine boundary
//!
//! The crawler never talks to a browser directly. Everything it needs from one
//! (navigation, script evaluation, bounded element waits, form input, cookies
//! and a stream of captured data responses) goes through [`BrowserEngine`].

use crate::config::BrowserConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by a browser engine
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timed out after {after:?}: {what}")]
    Timeout { what: String, after: Duration },

    #[error("No such element: {0}")]
    NoSuchElement(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Script error: {0}")]
    Script(String),

    #[error("Browser not launched")]
    NotLaunched,
}

impl BrowserError {
    /// Returns true for failures that may clear up on a retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout(),
            Self::Timeout { .. } | Self::Navigation { .. } => true,
            _ => false,
        }
    }
}

/// A browser cookie in WebDriver wire form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

/// One network response observed by the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedResponse {
    pub url: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub content_type: String,
    /// "xhr" or "fetch"
    #[serde(default)]
    pub resource_type: String,
    /// Raw body text; decoding is left to the consumer
    #[serde(default)]
    pub body: String,
}

/// Browser launch parameters
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub proxy_server: Option<String>,
}

impl LaunchOptions {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            locale: config.locale.clone(),
            proxy_server: config.proxy_server.clone(),
        }
    }
}

/// Operations the crawler needs from a browser
///
/// Scripts passed to [`evaluate`](BrowserEngine::evaluate) are function
/// bodies: use `return` to hand a value back.
///
/// Captured responses are delivered on the channel returned by
/// [`subscribe`](BrowserEngine::subscribe). An engine forwards whatever the
/// page has captured before any of its async operations returns, so the
/// receiver is complete up to the last awaited call.
#[async_trait]
pub trait BrowserEngine: Send {
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BrowserError>;

    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn current_url(&mut self) -> Result<String, BrowserError>;

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError>;

    /// Waits until an element matches; Ok(false) on timeout
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError>;

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError>;

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;

    async fn cookies(&mut self) -> Result<Vec<Cookie>, BrowserError>;

    async fn set_cookies(&mut self, cookies: &[Cookie]) -> Result<(), BrowserError>;

    /// Returns a fresh receiver for captured responses, replacing any earlier one
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CapturedResponse>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}
