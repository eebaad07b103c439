//! Shared fixtures: a scripted browser engine serving a paged timeline

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;
use timeline_harvest::browser::{
    BrowserEngine, BrowserError, CapturedResponse, Cookie, LaunchOptions, ITEM_MARKER,
    LOGIN_BUTTON,
};
use timeline_harvest::config::{Config, TimeoutConfig};
use timeline_harvest::crawler::{AT_BOTTOM_SCRIPT, SCROLL_STEP_SCRIPT};
use tokio::sync::mpsc;

const API: &str = "https://x.com/i/api/graphql/q1w2e3";

#[derive(Default)]
struct Page {
    current_url: String,
    visible: HashSet<String>,
    cookies: Vec<Cookie>,
    navigations: Vec<String>,
    fills: Vec<String>,
    sender: Option<mpsc::UnboundedSender<CapturedResponse>>,

    /// Served by profile pages
    timeline: Vec<String>,
    /// Served by search pages, one list per navigation
    searches: VecDeque<Vec<String>>,
    profile: Option<(String, u64)>,
    page_size: usize,

    /// What the current page serves and how far it has been scrolled
    showing: Vec<String>,
    on_search: bool,
    cursor: usize,
    closed: bool,
}

impl Page {
    fn send(&self, response: CapturedResponse) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(response);
        }
    }
}

/// A browser that renders a fixed timeline, one page of items per scroll
///
/// Clones share state, so a test can keep a handle after boxing one.
#[derive(Clone)]
pub struct ScriptedEngine {
    page: Arc<Mutex<Page>>,
}

impl ScriptedEngine {
    pub fn new(page_size: usize) -> Self {
        let engine = Self {
            page: Arc::new(Mutex::new(Page::default())),
        };
        {
            let mut page = engine.lock();
            page.current_url = "about:blank".to_string();
            page.page_size = page_size.max(1);
            page.visible.insert(ITEM_MARKER.to_string());
        }
        engine
    }

    fn lock(&self) -> MutexGuard<'_, Page> {
        self.page.lock().unwrap()
    }

    /// Profile timeline, newest first
    pub fn with_timeline(self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.lock().timeline = ids.into_iter().map(|id| id.to_string()).collect();
        self
    }

    /// Queues the results of the next search navigation
    pub fn with_search(self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.lock()
            .searches
            .push_back(ids.into_iter().map(|id| id.to_string()).collect());
        self
    }

    /// Profile pages also answer with this user's profile
    pub fn with_profile(self, handle: &str, followers: u64) -> Self {
        self.lock().profile = Some((handle.to_string(), followers));
        self
    }

    pub fn show(&self, selector: &str) {
        self.lock().visible.insert(selector.to_string());
    }

    pub fn hide(&self, selector: &str) {
        self.lock().visible.remove(selector);
    }

    pub fn set_browser_cookies(&self, cookies: Vec<Cookie>) {
        self.lock().cookies = cookies;
    }

    pub fn cookie_names(&self) -> Vec<String> {
        self.lock().cookies.iter().map(|c| c.name.clone()).collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Selectors that received input
    pub fn fills(&self) -> Vec<String> {
        self.lock().fills.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl BrowserEngine for ScriptedEngine {
    async fn launch(&mut self, _options: &LaunchOptions) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        let mut page = self.lock();
        page.navigations.push(url.to_string());
        page.current_url = url.to_string();
        page.cursor = 0;

        if url.contains("/search?") {
            page.on_search = true;
            page.showing = page.searches.pop_front().unwrap_or_default();
            return Ok(());
        }

        page.on_search = false;
        page.showing = page.timeline.clone();
        if let Some((handle, followers)) = page.profile.clone() {
            if url.trim_end_matches('/').ends_with(&format!("/{}", handle)) {
                page.send(profile_response(&handle, followers));
            }
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, BrowserError> {
        Ok(self.lock().current_url.clone())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, BrowserError> {
        let mut page = self.lock();

        if script == SCROLL_STEP_SCRIPT {
            let start = page.cursor.min(page.showing.len());
            let end = (start + page.page_size).min(page.showing.len());
            if start < end {
                let ids = page.showing[start..end].to_vec();
                page.cursor = end;
                let response = if page.on_search {
                    search_response(&ids)
                } else {
                    timeline_response(&ids)
                };
                page.send(response);
            }
            return Ok(Value::Null);
        }
        if script == AT_BOTTOM_SCRIPT {
            return Ok(json!(page.cursor >= page.showing.len()));
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

    async fn fill(&mut self, selector: &str, _text: &str) -> Result<(), BrowserError> {
        let mut page = self.lock();
        if !page.visible.contains(selector) {
            return Err(BrowserError::NoSuchElement(selector.to_string()));
        }
        page.fills.push(selector.to_string());
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let mut page = self.lock();
        if !page.visible.contains(selector) {
            return Err(BrowserError::NoSuchElement(selector.to_string()));
        }
        if selector == LOGIN_BUTTON {
            page.current_url = "https://x.com/home".to_string();
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

fn entries(ids: &[String]) -> Vec<Value> {
    ids.iter()
        .map(|id| {
            json!({
                "entryId": format!("tweet-{}", id),
                "content": { "itemContent": { "tweet_results": { "result": {
                    "__typename": "Tweet",
                    "rest_id": id,
                    "core": { "user_results": { "result": {
                        "rest_id": "42",
                        "legacy": { "screen_name": "someone", "followers_count": 1200 }
                    }}},
                    "legacy": {
                        "full_text": format!("post number {}", id),
                        "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                        "favorite_count": 3,
                        "lang": "en"
                    }
                }}}}
            })
        })
        .chain(std::iter::once(json!({
            "entryId": "cursor-bottom-0",
            "content": { "value": "DAABCgAB" }
        })))
        .collect()
}

fn response(operation: &str, body: Value) -> CapturedResponse {
    CapturedResponse {
        url: format!("{}/{}?variables=%7B%7D", API, operation),
        status: 200,
        content_type: "application/json; charset=utf-8".to_string(),
        resource_type: "xhr".to_string(),
        body: body.to_string(),
    }
}

fn timeline_response(ids: &[String]) -> CapturedResponse {
    response(
        "UserTweets",
        json!({ "data": { "user": { "result": { "timeline_v2": { "timeline": {
            "instructions": [
                { "type": "TimelineClearCache" },
                { "type": "TimelineAddEntries", "entries": entries(ids) }
            ]
        }}}}}}),
    )
}

fn search_response(ids: &[String]) -> CapturedResponse {
    response(
        "SearchTimeline",
        json!({ "data": { "search_by_raw_query": { "search_timeline": { "timeline": {
            "instructions": [{ "type": "TimelineAddEntries", "entries": entries(ids) }]
        }}}}}),
    )
}

fn profile_response(handle: &str, followers: u64) -> CapturedResponse {
    response(
        "UserByScreenName",
        json!({ "data": { "user": { "result": {
            "rest_id": "42",
            "is_blue_verified": true,
            "legacy": {
                "screen_name": handle,
                "name": "Some One",
                "followers_count": followers,
                "friends_count": 10,
                "statuses_count": 25
            }
        }}}}),
    )
}

/// A configuration with every delay removed, writing under `dir`
pub fn fast_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.credentials.username = "harvester".to_string();
    config.credentials.email = "harvester@example.com".to_string();
    config.credentials.password = "hunter2".to_string();
    config.browser.cookies_path = dir
        .path()
        .join("cookies.json")
        .to_string_lossy()
        .into_owned();
    config.output.data_dir = dir.path().join("data").to_string_lossy().into_owned();

    config.scraping.scroll_delay_min_ms = 0;
    config.scraping.scroll_delay_max_ms = 0;
    config.scraping.max_attempts_without_new = 5;
    config.scraping.max_items_per_session = 0;
    config.scraping.refresh_every = 0;
    config.search.delay_between_ranges_secs = 0;
    config.timeouts = TimeoutConfig {
        page_load: 10,
        element_wait: 10,
        button_click: 10,
        cookie_verification: 10,
        login_complete: 10,
        short_wait: 10,
        post_login_page_delay: 0,
        post_input_delay: 0,
        post_click_delay: 0,
        post_navigation_delay: 0,
        login_wait_delay: 0,
        refresh_short_delay: 0,
        refresh_long_delay: 0,
    };
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 1;
    config
}
