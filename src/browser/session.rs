//! Browser session lifecycle
//!
//! A [`BrowserSession`] owns one browser engine, its captured-response
//! channel, and the login state machine:
//!
//! ```text
//! Uninitialized -> CookiesPresent -> CookieReuse -> LoggedIn
//!               \                               \
//!                -> Launched --------------------> InteractiveLogin -> LoggedIn | Failed
//!                                                   (EmailChallenge when asked)
//! ```

use crate::browser::engine::{BrowserEngine, CapturedResponse, Cookie, LaunchOptions};
use crate::config::{Config, Credentials, TimeoutConfig};
use crate::crawler::{RetryDecision, RetryPolicy};
use crate::state::LoginState;
use crate::url::{is_login_route, SearchMode, SiteUrls};
use crate::{ConfigError, HarvestError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

/// Compose button, only rendered for an authenticated session
pub const HOME_INDICATOR: &str = "[data-testid=\"SideNav_NewTweet_Button\"]";
pub const USERNAME_INPUT: &str = "input[autocomplete=\"username\"]";
pub const NEXT_BUTTON: &str = "xpath://button[.//span[text()=\"Next\"]]";
/// Secondary identifier prompt shown for unusual login activity
pub const EMAIL_CHALLENGE_INPUT: &str = "input[data-testid=\"ocfEnterTextTextInput\"]";
pub const PASSWORD_INPUT: &str = "input[name=\"password\"]";
pub const LOGIN_BUTTON: &str = "button[data-testid=\"LoginForm_Login_Button\"]";
/// One rendered timeline item
pub const ITEM_MARKER: &str = "[data-testid=\"tweet\"]";
pub const ACCOUNT_MISSING_MARKER: &str =
    "xpath://*[contains(text(), \"This account doesn\u{2019}t exist\") or contains(text(), \"This account doesn't exist\")]";

/// Interval between checks while waiting for the home route
const URL_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A logged-in browser page plus everything needed to drive it
pub struct BrowserSession {
    engine: Box<dyn BrowserEngine>,
    responses: Option<mpsc::UnboundedReceiver<CapturedResponse>>,
    state: LoginState,
    urls: SiteUrls,
    credentials: Credentials,
    timeouts: TimeoutConfig,
    launch: LaunchOptions,
    cookies_path: PathBuf,
    retry: RetryPolicy,
}

impl BrowserSession {
    /// Creates a session around an engine; nothing is launched yet
    pub fn new(engine: Box<dyn BrowserEngine>, config: &Config) -> Result<Self> {
        let urls = SiteUrls::new(&config.browser.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        Ok(Self {
            engine,
            responses: None,
            state: LoginState::Uninitialized,
            urls,
            credentials: config.credentials.clone(),
            timeouts: config.timeouts.clone(),
            launch: LaunchOptions::from_config(&config.browser),
            cookies_path: PathBuf::from(&config.browser.cookies_path),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    /// Replaces the navigation retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn urls(&self) -> &SiteUrls {
        &self.urls
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    fn transition(&mut self, next: LoginState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Login state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Launches the browser, subscribes to responses and loads saved cookies
    pub async fn initialize(&mut self) -> Result<()> {
        self.engine.launch(&self.launch).await?;
        self.responses = Some(self.engine.subscribe());

        let cookies = load_cookies(&self.cookies_path);
        if cookies.is_empty() {
            tracing::info!("No saved cookies found, interactive login required");
            return self.transition(LoginState::Launched);
        }

        // cookies can only be set for the domain currently open
        let base = self.urls.base().to_string();
        self.engine
            .goto(&base, Duration::from_millis(self.timeouts.page_load))
            .await?;
        self.engine.set_cookies(&cookies).await?;
        tracing::info!(
            "Loaded {} saved cookies from {}",
            cookies.len(),
            self.cookies_path.display()
        );
        self.transition(LoginState::CookiesPresent)
    }

    /// Brings the session to `LoggedIn`
    ///
    /// Saved cookies are tried first; if they no longer grant a session the
    /// interactive form is used. A failed interactive login is returned as
    /// [`HarvestError::Authentication`] and is not retried here.
    pub async fn login(&mut self) -> Result<()> {
        match self.state {
            LoginState::LoggedIn => {
                tracing::info!("Already logged in");
                return Ok(());
            }
            LoginState::Uninitialized | LoginState::Closed => {
                return Err(HarvestError::Authentication(
                    "browser not initialized".to_string(),
                ))
            }
            _ => {}
        }

        if self.state == LoginState::CookiesPresent {
            self.transition(LoginState::CookieReuse)?;
            match self.verify_cookie_session().await {
                Ok(true) => {
                    tracing::info!("Cookie login verified");
                    return self.transition(LoginState::LoggedIn);
                }
                Ok(false) => tracing::warn!("Saved cookies expired, logging in again"),
                Err(e) => tracing::warn!("Cookie verification failed: {}, logging in again", e),
            }
        }

        self.interactive_login().await
    }

    /// Checks whether the loaded cookies reach an authenticated page
    async fn verify_cookie_session(&mut self) -> Result<bool> {
        let home = self.urls.home();
        self.engine
            .goto(&home, Duration::from_millis(self.timeouts.element_wait))
            .await?;

        tracing::info!("Verifying cookies");
        let verified = self
            .engine
            .wait_for_selector(
                HOME_INDICATOR,
                Duration::from_millis(self.timeouts.cookie_verification),
            )
            .await?;
        if verified {
            return Ok(true);
        }

        let current = self.engine.current_url().await?;
        Ok(!is_login_route(&current))
    }

    /// Drives the login form from scratch
    pub async fn interactive_login(&mut self) -> Result<()> {
        self.transition(LoginState::InteractiveLogin)?;

        match self.submit_login_form().await {
            Ok(()) => {}
            Err(e) => {
                self.fail_login()?;
                return Err(match e {
                    HarvestError::Authentication(_) => e,
                    other => HarvestError::Authentication(other.to_string()),
                });
            }
        }

        if self.wait_for_home().await? {
            self.transition(LoginState::LoggedIn)?;
            if let Err(e) = self.save_cookies().await {
                tracing::warn!("Logged in but failed to save cookies: {}", e);
            }
            tracing::info!("Successfully logged in");
            return Ok(());
        }

        let current = self.engine.current_url().await.unwrap_or_default();
        self.fail_login()?;
        Err(HarvestError::Authentication(format!(
            "login did not reach the home page (on {})",
            current
        )))
    }

    fn fail_login(&mut self) -> Result<()> {
        if self.state == LoginState::EmailChallenge {
            self.transition(LoginState::InteractiveLogin)?;
        }
        self.transition(LoginState::Failed)
    }

    async fn submit_login_form(&mut self) -> Result<()> {
        if self.credentials.username.is_empty() || self.credentials.password.is_empty() {
            return Err(HarvestError::Authentication(
                "credentials username and password are required".to_string(),
            ));
        }

        tracing::info!("Loading login page");
        let login = self.urls.login();
        self.engine
            .goto(&login, Duration::from_millis(self.timeouts.page_load))
            .await?;
        self.pause(self.timeouts.post_login_page_delay).await;

        let username = self.credentials.username.clone();
        self.require(USERNAME_INPUT, self.timeouts.element_wait, "username input")
            .await?;
        self.engine.fill(USERNAME_INPUT, &username).await?;
        self.pause(self.timeouts.post_input_delay).await;

        self.require(NEXT_BUTTON, self.timeouts.button_click, "next button")
            .await?;
        self.engine.click(NEXT_BUTTON).await?;
        self.pause(self.timeouts.post_click_delay).await;

        self.handle_email_challenge().await?;

        let password = self.credentials.password.clone();
        self.require(PASSWORD_INPUT, self.timeouts.element_wait, "password input")
            .await?;
        self.engine.fill(PASSWORD_INPUT, &password).await?;
        self.pause(self.timeouts.post_input_delay).await;

        self.require(LOGIN_BUTTON, self.timeouts.button_click, "login button")
            .await?;
        self.engine.click(LOGIN_BUTTON).await?;
        tracing::info!("Waiting for login to complete");
        self.pause(self.timeouts.login_wait_delay).await;
        Ok(())
    }

    /// Answers the email prompt if it shows up; its absence is normal
    async fn handle_email_challenge(&mut self) -> Result<()> {
        let asked = self
            .engine
            .wait_for_selector(
                EMAIL_CHALLENGE_INPUT,
                Duration::from_millis(self.timeouts.short_wait),
            )
            .await?;
        if !asked {
            tracing::debug!("No email challenge");
            return Ok(());
        }

        self.transition(LoginState::EmailChallenge)?;
        tracing::info!("Email challenge requested");
        let email = self.credentials.email.clone();
        self.engine.fill(EMAIL_CHALLENGE_INPUT, &email).await?;
        self.pause(self.timeouts.post_input_delay).await;

        if self
            .engine
            .wait_for_selector(NEXT_BUTTON, Duration::from_millis(self.timeouts.button_click))
            .await?
        {
            self.engine.click(NEXT_BUTTON).await?;
            self.pause(self.timeouts.post_click_delay).await;
        }

        self.transition(LoginState::InteractiveLogin)
    }

    /// Waits for the authenticated home route, falling back to the compose button
    async fn wait_for_home(&mut self) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_millis(self.timeouts.login_complete);
        loop {
            let current = self.engine.current_url().await?;
            if current.contains("/home") {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                tracing::info!("Current URL after login attempt: {}", current);
                if is_login_route(&current) {
                    return Ok(false);
                }
                return Ok(self
                    .engine
                    .wait_for_selector(HOME_INDICATOR, Duration::ZERO)
                    .await?);
            }
            sleep(URL_POLL_INTERVAL).await;
        }
    }

    async fn require(&mut self, selector: &str, timeout_ms: u64, what: &str) -> Result<()> {
        tracing::debug!("Waiting for {}", what);
        let found = self
            .engine
            .wait_for_selector(selector, Duration::from_millis(timeout_ms))
            .await?;
        if found {
            Ok(())
        } else {
            Err(HarvestError::Authentication(format!("{} not found", what)))
        }
    }

    /// Writes the browser's current cookies to the cookie file
    pub async fn save_cookies(&mut self) -> Result<()> {
        let cookies = self.engine.cookies().await?;
        store_cookies(&self.cookies_path, &cookies)?;
        tracing::info!(
            "Saved {} cookies to {}",
            cookies.len(),
            self.cookies_path.display()
        );
        Ok(())
    }

    /// Navigates with the retry policy applied to transient failures
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        let timeout = Duration::from_millis(self.timeouts.page_load);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::info!("Navigating to {}", url);
            let error: HarvestError = match self.engine.goto(url, timeout).await {
                Ok(()) => break,
                Err(e) => e.into(),
            };

            match self.retry.should_retry(&error, attempt) {
                RetryDecision::Retry { delay, .. } => {
                    tracing::warn!(
                        "Navigation failed (attempt {}/{}): {}; retrying in {:.1}s",
                        attempt,
                        self.retry.max_attempts(),
                        error,
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    tracing::error!("Failed to navigate to {}: {}", url, reason);
                    return Err(error);
                }
            }
        }

        self.pause(self.timeouts.post_navigation_delay).await;
        Ok(())
    }

    /// Opens a profile page and checks the account exists
    pub async fn open_profile(&mut self, handle: &str) -> Result<()> {
        let url = self.urls.profile(handle);
        self.navigate(&url).await?;

        if self.wait_for_items().await? {
            return Ok(());
        }

        let missing = self
            .engine
            .wait_for_selector(
                ACCOUNT_MISSING_MARKER,
                Duration::from_millis(self.timeouts.short_wait),
            )
            .await?;
        if missing {
            tracing::error!("Account @{} doesn't exist", handle);
            return Err(HarvestError::AccountNotFound(handle.to_string()));
        }

        tracing::warn!("No items found or page didn't load properly");
        Ok(())
    }

    /// Opens a search results page; Ok(false) if nothing rendered
    pub async fn open_search(&mut self, query: &str, mode: SearchMode) -> Result<bool> {
        let url = self.urls.search(query, mode);
        self.navigate(&url).await?;

        let found = self.wait_for_items().await?;
        if found {
            tracing::info!("Search results loaded");
        } else {
            tracing::warn!("No items found in search results");
        }
        Ok(found)
    }

    async fn wait_for_items(&mut self) -> Result<bool> {
        Ok(self
            .engine
            .wait_for_selector(ITEM_MARKER, Duration::from_millis(self.timeouts.button_click))
            .await?)
    }

    /// Runs a script on the page
    pub async fn evaluate(&mut self, script: &str) -> Result<Value> {
        Ok(self.engine.evaluate(script).await?)
    }

    /// Takes every response captured since the last call
    pub fn drain_responses(&mut self) -> Vec<CapturedResponse> {
        let mut drained = Vec::new();
        if let Some(rx) = self.responses.as_mut() {
            while let Ok(response) = rx.try_recv() {
                drained.push(response);
            }
        }
        drained
    }

    /// Sleeps for a configured number of milliseconds
    pub async fn pause(&self, millis: u64) {
        if millis > 0 {
            sleep(Duration::from_millis(millis)).await;
        }
    }

    /// Closes the browser; errors are logged, not returned
    pub async fn cleanup(&mut self) {
        self.responses = None;
        if let Err(e) = self.engine.close().await {
            tracing::error!("Error during browser cleanup: {}", e);
        }
        self.state = LoginState::Closed;
        tracing::info!("Browser resources cleaned up");
    }
}

/// Reads the cookie file; a missing or malformed file yields no cookies
pub fn load_cookies(path: &Path) -> Vec<Cookie> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };

    match serde_json::from_str::<Vec<Cookie>>(&content) {
        Ok(cookies) => cookies,
        Err(e) => {
            tracing::warn!("Failed to load cookies from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Writes cookies as a JSON array, creating parent directories
pub fn store_cookies(path: &Path, cookies: &[Cookie]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(cookies)?;
    std::fs::write(path, json)?;
    Ok(())
}
