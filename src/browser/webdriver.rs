//! W3C WebDriver engine
//!
//! Drives a Chrome instance through a WebDriver server (chromedriver or a
//! Selenium node) over plain HTTP. Response capture relies on the in-page hook
//! from [`capture`](crate::browser::capture); the hook is registered for new
//! documents through the DevTools passthrough when the driver offers it, and
//! re-installed after every navigation.

use crate::browser::capture::{drain_script, hook_script, parse_drained};
use crate::browser::engine::{BrowserEngine, BrowserError, CapturedResponse, Cookie, LaunchOptions};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

/// W3C element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Selector prefix that switches lookup to XPath
pub const XPATH_PREFIX: &str = "xpath:";

/// Poll interval for element waits
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser engine backed by a WebDriver server
pub struct WebDriverEngine {
    client: Client,
    endpoint: String,
    session_id: Option<String>,
    sender: Option<mpsc::UnboundedSender<CapturedResponse>>,
    cdp_hook: bool,
}

impl WebDriverEngine {
    /// Creates an engine for the WebDriver server at `endpoint`
    ///
    /// No browser is started until [`launch`](BrowserEngine::launch).
    pub fn new(endpoint: &str) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session_id: None,
            sender: None,
            cdp_hook: false,
        })
    }

    /// Returns the active WebDriver session id, if launched
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns true if the capture hook runs on every new document
    pub fn has_document_hook(&self) -> bool {
        self.cdp_hook
    }

    fn session_path(&self, suffix: &str) -> Result<String, BrowserError> {
        let id = self.session_id.as_deref().ok_or(BrowserError::NotLaunched)?;
        Ok(format!("/session/{}{}", id, suffix))
    }

    /// Sends one WebDriver command and unwraps its `value`
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if status.is_success() {
            return Ok(value);
        }

        Err(wire_error(&value, status.as_u16()))
    }

    /// Runs a script without forwarding captured responses
    async fn execute_raw(&self, script: &str) -> Result<Value, BrowserError> {
        let path = self.session_path("/execute/sync")?;
        self.command(
            Method::POST,
            &path,
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    /// Forwards everything the page has captured since the last drain
    async fn drain(&self) -> Result<(), BrowserError> {
        let Some(sender) = self.sender.as_ref() else {
            return Ok(());
        };

        let captured = self.execute_raw(&drain_script()).await?;
        for response in parse_drained(captured) {
            // receiver gone means nobody is listening any more
            if sender.send(response).is_err() {
                break;
            }
        }
        Ok(())
    }

    /// Drains the capture queue, logging instead of failing
    async fn drain_quietly(&self) {
        if let Err(e) = self.drain().await {
            tracing::debug!("Failed to drain captured responses: {}", e);
        }
    }

    async fn find_element(&self, selector: &str) -> Result<String, BrowserError> {
        let (using, value) = locator(selector);
        let path = self.session_path("/element")?;
        let result = self
            .command(
                Method::POST,
                &path,
                Some(json!({ "using": using, "value": value })),
            )
            .await?;

        result
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol(format!("No element reference for {}", selector)))
    }

    /// Registers the capture hook for every new document via DevTools
    async fn register_cdp_hook(&mut self) {
        let path = match self.session_path("/goog/cdp/execute") {
            Ok(path) => path,
            Err(_) => return,
        };
        let body = json!({
            "cmd": "Page.addScriptToEvaluateOnNewDocument",
            "params": { "source": hook_script() },
        });

        match self.command(Method::POST, &path, Some(body)).await {
            Ok(_) => {
                self.cdp_hook = true;
                tracing::debug!("Capture hook registered for new documents");
            }
            Err(e) => {
                tracing::debug!(
                    "DevTools passthrough unavailable ({}), hook installs after navigation only",
                    e
                );
            }
        }
    }
}

/// Splits a selector into a WebDriver locator strategy and value
fn locator(selector: &str) -> (&'static str, &str) {
    match selector.strip_prefix(XPATH_PREFIX) {
        Some(xpath) => ("xpath", xpath),
        None => ("css selector", selector),
    }
}

/// Maps a WebDriver error payload to a [`BrowserError`]
fn wire_error(value: &Value, status: u16) -> BrowserError {
    let error = value.get("error").and_then(Value::as_str).unwrap_or("");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    match error {
        "no such element" => BrowserError::NoSuchElement(message),
        "timeout" | "script timeout" => BrowserError::Timeout {
            what: message,
            after: Duration::ZERO,
        },
        "javascript error" => BrowserError::Script(message),
        "invalid session id" | "no such window" => BrowserError::NotLaunched,
        "" => BrowserError::Protocol(format!("HTTP {} without error payload", status)),
        other => BrowserError::Protocol(format!("{}: {}", other, message)),
    }
}

/// Chrome capabilities for a new session
fn capabilities(options: &LaunchOptions) -> Value {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-infobars".to_string(),
        format!(
            "--window-size={},{}",
            options.viewport_width, options.viewport_height
        ),
        format!("--user-agent={}", options.user_agent),
        format!("--lang={}", options.locale),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
    }
    if let Some(proxy) = &options.proxy_server {
        args.push(format!("--proxy-server={}", proxy));
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": {
                    "args": args,
                    "excludeSwitches": ["enable-automation"],
                    "prefs": { "intl.accept_languages": options.locale },
                },
            },
        },
    })
}

#[async_trait]
impl BrowserEngine for WebDriverEngine {
    async fn launch(&mut self, options: &LaunchOptions) -> Result<(), BrowserError> {
        let result = self
            .command(Method::POST, "/session", Some(capabilities(options)))
            .await?;

        let session_id = result
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("New session without sessionId".to_string()))?;

        tracing::info!("WebDriver session {} started", session_id);
        self.session_id = Some(session_id.to_string());
        self.register_cdp_hook().await;
        Ok(())
    }

    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let timeouts = self.session_path("/timeouts")?;
        self.command(
            Method::POST,
            &timeouts,
            Some(json!({ "pageLoad": timeout.as_millis() as u64 })),
        )
        .await?;

        let path = self.session_path("/url")?;
        match self
            .command(Method::POST, &path, Some(json!({ "url": url })))
            .await
        {
            Ok(_) => {}
            Err(BrowserError::Timeout { what, .. }) => {
                return Err(BrowserError::Timeout {
                    what: format!("loading {}: {}", url, what),
                    after: timeout,
                })
            }
            Err(BrowserError::Protocol(message)) => {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    message,
                })
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self.execute_raw(&hook_script()).await {
            tracing::debug!("Failed to install capture hook on {}: {}", url, e);
        }
        self.drain_quietly().await;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        let path = self.session_path("/url")?;
        let value = self.command(Method::GET, &path, None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol("Current URL is not a string".to_string()))
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError> {
        let value = self.execute_raw(script).await?;
        self.drain_quietly().await;
        Ok(value)
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_element(selector).await {
                Ok(_) => {
                    self.drain_quietly().await;
                    return Ok(true);
                }
                Err(BrowserError::NoSuchElement(_)) => {}
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                self.drain_quietly().await;
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self.find_element(selector).await?;
        let path = self.session_path(&format!("/element/{}/value", element))?;
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        self.drain_quietly().await;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let element = self.find_element(selector).await?;
        let path = self.session_path(&format!("/element/{}/click", element))?;
        self.command(Method::POST, &path, Some(json!({}))).await?;
        self.drain_quietly().await;
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<Cookie>, BrowserError> {
        let path = self.session_path("/cookie")?;
        let value = self.command(Method::GET, &path, None).await?;
        serde_json::from_value(value)
            .map_err(|e| BrowserError::Protocol(format!("Malformed cookie list: {}", e)))
    }

    async fn set_cookies(&mut self, cookies: &[Cookie]) -> Result<(), BrowserError> {
        let path = self.session_path("/cookie")?;
        for cookie in cookies {
            if let Err(e) = self
                .command(Method::POST, &path, Some(json!({ "cookie": cookie })))
                .await
            {
                tracing::debug!("Skipping cookie {}: {}", cookie.name, e);
            }
        }
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CapturedResponse> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sender = Some(tx);
        rx
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };
        self.sender = None;
        self.cdp_hook = false;
        self.command(Method::DELETE, &format!("/session/{}", id), None)
            .await?;
        tracing::info!("WebDriver session {} closed", id);
        Ok(())
    }
}
