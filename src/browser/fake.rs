//! Scripted in-memory engine for unit tests

use crate::browser::engine::{BrowserEngine, BrowserError, CapturedResponse, Cookie, LaunchOptions};
use crate::crawler::{AT_BOTTOM_SCRIPT, SCROLL_STEP_SCRIPT};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
struct Inner {
    current_url: String,
    visible: HashSet<String>,
    redirects: HashMap<String, String>,
    cookies: Vec<Cookie>,
    log: Vec<String>,
    scripts: Vec<String>,
    failing_gotos: usize,
    sender: Option<mpsc::UnboundedSender<CapturedResponse>>,
    scroll_batches: VecDeque<Vec<CapturedResponse>>,
    script_batches: HashMap<String, Vec<CapturedResponse>>,
    at_bottom: bool,
    closed: bool,
}

impl Inner {
    fn send(&self, responses: Vec<CapturedResponse>) {
        if let Some(sender) = &self.sender {
            for response in responses {
                let _ = sender.send(response);
            }
        }
    }
}

/// Clones share state, so a test can keep a handle after boxing one
#[derive(Clone, Default)]
pub struct FakeEngine {
    inner: Arc<Mutex<Inner>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        let engine = Self::default();
        engine.lock().current_url = "about:blank".to_string();
        engine
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Makes `wait_for_selector` find this selector
    pub fn show(&self, selector: &str) {
        self.lock().visible.insert(selector.to_string());
    }

    /// Clicking `selector` moves the page to `url`
    pub fn redirect_on_click(&self, selector: &str, url: &str) {
        self.lock()
            .redirects
            .insert(selector.to_string(), url.to_string());
    }

    pub fn set_browser_cookies(&self, cookies: Vec<Cookie>) {
        self.lock().cookies = cookies;
    }

    pub fn cookie_names(&self) -> Vec<String> {
        self.lock().cookies.iter().map(|c| c.name.clone()).collect()
    }

    /// `goto`, `fill` and `click` calls in order
    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    /// Every evaluated script in order
    pub fn scripts(&self) -> Vec<String> {
        self.lock().scripts.clone()
    }

    pub fn fail_next_gotos(&self, count: usize) {
        self.lock().failing_gotos = count;
    }

    /// Delivers a response to the current subscriber right away
    pub fn capture(&self, response: CapturedResponse) {
        self.lock().send(vec![response]);
    }

    /// Queues responses delivered by the next scroll step
    pub fn push_scroll_batch(&self, responses: Vec<CapturedResponse>) {
        self.lock().scroll_batches.push_back(responses);
    }

    /// Delivers responses the next time `script` is evaluated
    pub fn on_script(&self, script: &str, responses: Vec<CapturedResponse>) {
        self.lock()
            .script_batches
            .insert(script.to_string(), responses);
    }

    pub fn set_at_bottom(&self, at_bottom: bool) {
        self.lock().at_bottom = at_bottom;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn launch(&mut self, _options: &LaunchOptions) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        let mut inner = self.lock();
        inner.log.push(format!("goto {}", url));
        if inner.failing_gotos > 0 {
            inner.failing_gotos -= 1;
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        inner.current_url = url.to_string();
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self.lock().current_url.clone())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError> {
        let mut inner = self.lock();
        inner.scripts.push(script.to_string());

        if script == SCROLL_STEP_SCRIPT {
            if let Some(batch) = inner.scroll_batches.pop_front() {
                inner.send(batch);
            }
            return Ok(Value::Null);
        }
        if script == AT_BOTTOM_SCRIPT {
            return Ok(json!(inner.at_bottom));
        }
        if let Some(batch) = inner.script_batches.remove(script) {
            inner.send(batch);
        }
        Ok(Value::Null)
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<bool, BrowserError> {
        Ok(self.lock().visible.contains(selector))
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let mut inner = self.lock();
        if !inner.visible.contains(selector) {
            return Err(BrowserError::NoSuchElement(selector.to_string()));
        }
        inner.log.push(format!("fill {} {}", selector, text));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let mut inner = self.lock();
        if !inner.visible.contains(selector) {
            return Err(BrowserError::NoSuchElement(selector.to_string()));
        }
        inner.log.push(format!("click {}", selector));
        if let Some(url) = inner.redirects.get(selector).cloned() {
            inner.current_url = url;
        }
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<Cookie>, BrowserError> {
        Ok(self.lock().cookies.clone())
    }

    async fn set_cookies(&mut self, cookies: &[Cookie]) -> Result<(), BrowserError> {
        self.lock().cookies.extend_from_slice(cookies);
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CapturedResponse> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().sender = Some(tx);
        rx
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.lock().closed = true;
        Ok(())
    }
}

/// A `UserTweets` response listing bare items with the given ids
pub fn timeline_response(ids: &[String]) -> CapturedResponse {
    let entries: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "entryId": format!("tweet-{}", id),
                "content": { "itemContent": { "tweet_results": { "result": {
                    "rest_id": id,
                    "legacy": { "full_text": format!("item {}", id) }
                }}}}
            })
        })
        .collect();

    CapturedResponse {
        url: "https://x.com/i/api/graphql/abc/UserTweets?variables=%7B%7D".to_string(),
        status: 200,
        content_type: "application/json".to_string(),
        resource_type: "xhr".to_string(),
        body: json!({ "data": { "user": { "result": { "timeline_v2": { "timeline": {
            "instructions": [{ "type": "TimelineAddEntries", "entries": entries }]
        }}}}}})
        .to_string(),
    }
}
