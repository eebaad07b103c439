use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Account used for interactive login
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,

    /// Answers the email challenge step
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Browser launch and session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint (e.g. a local chromedriver)
    #[serde(rename = "webdriver-url")]
    pub webdriver_url: String,

    /// Site root used to build home, login, profile and search URLs
    #[serde(rename = "base-url")]
    pub base_url: String,

    pub headless: bool,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    pub locale: String,

    /// Where session cookies are kept between runs
    #[serde(rename = "cookies-path")]
    pub cookies_path: String,

    /// Proxy handed to the browser as-is
    #[serde(rename = "proxy-server")]
    pub proxy_server: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            base_url: "https://x.com".to_string(),
            headless: false,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            locale: "en-US".to_string(),
            cookies_path: "cookies.json".to_string(),
            proxy_server: None,
        }
    }
}

/// Scroll loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Lower bound of the randomized delay after each scroll (milliseconds)
    #[serde(rename = "scroll-delay-min-ms")]
    pub scroll_delay_min_ms: u64,

    /// Upper bound of the randomized delay after each scroll (milliseconds)
    #[serde(rename = "scroll-delay-max-ms")]
    pub scroll_delay_max_ms: u64,

    /// Hard ceiling on loop iterations
    #[serde(rename = "max-scroll-attempts")]
    pub max_scroll_attempts: u32,

    /// Consecutive empty scrolls before the timeline counts as exhausted
    #[serde(rename = "max-attempts-without-new")]
    pub max_attempts_without_new: u32,

    /// Items per session before stopping for a later resume (0 = unlimited)
    #[serde(rename = "max-items-per-session")]
    pub max_items_per_session: usize,

    /// Previously archived ids that must be seen to confirm the resume point
    #[serde(rename = "overlap-threshold")]
    pub overlap_threshold: usize,

    /// Scrolls with nothing extracted before aborting
    #[serde(rename = "zero-progress-attempts")]
    pub zero_progress_attempts: u32,

    /// Empty scrolls allowed while looking for the resume point
    #[serde(rename = "resume-search-attempts")]
    pub resume_search_attempts: u32,

    /// Empty scrolls allowed once the page reports it is at the bottom
    #[serde(rename = "bottom-stall-attempts")]
    pub bottom_stall_attempts: u32,

    /// Wall-clock ceiling for a session that has extracted nothing (seconds)
    #[serde(rename = "stall-timeout-secs")]
    pub stall_timeout_secs: u64,

    /// Wait suggested to the caller when the site rate-limits the session (seconds)
    #[serde(rename = "rate-limit-wait-secs")]
    pub rate_limit_wait_secs: u64,

    /// Iterations between top/bottom refresh maneuvers
    #[serde(rename = "refresh-every")]
    pub refresh_every: u32,

    /// Iterations between progress log lines
    #[serde(rename = "progress-every")]
    pub progress_every: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            scroll_delay_min_ms: 3000,
            scroll_delay_max_ms: 6000,
            max_scroll_attempts: 5000,
            max_attempts_without_new: 50,
            max_items_per_session: 800,
            overlap_threshold: 5,
            zero_progress_attempts: 20,
            resume_search_attempts: 100,
            bottom_stall_attempts: 10,
            stall_timeout_secs: 600,
            rate_limit_wait_secs: 900,
            refresh_every: 100,
            progress_every: 50,
        }
    }
}

impl ScrapingConfig {
    /// Returns the session cap, treating 0 as unlimited
    pub fn session_cap(&self) -> Option<usize> {
        (self.max_items_per_session > 0).then_some(self.max_items_per_session)
    }
}

/// Bounded waits and pacing delays, all in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(rename = "page-load")]
    pub page_load: u64,

    #[serde(rename = "element-wait")]
    pub element_wait: u64,

    #[serde(rename = "button-click")]
    pub button_click: u64,

    #[serde(rename = "cookie-verification")]
    pub cookie_verification: u64,

    #[serde(rename = "login-complete")]
    pub login_complete: u64,

    #[serde(rename = "short-wait")]
    pub short_wait: u64,

    #[serde(rename = "post-login-page-delay")]
    pub post_login_page_delay: u64,

    #[serde(rename = "post-input-delay")]
    pub post_input_delay: u64,

    #[serde(rename = "post-click-delay")]
    pub post_click_delay: u64,

    #[serde(rename = "post-navigation-delay")]
    pub post_navigation_delay: u64,

    #[serde(rename = "login-wait-delay")]
    pub login_wait_delay: u64,

    #[serde(rename = "refresh-short-delay")]
    pub refresh_short_delay: u64,

    #[serde(rename = "refresh-long-delay")]
    pub refresh_long_delay: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            page_load: 60_000,
            element_wait: 30_000,
            button_click: 10_000,
            cookie_verification: 15_000,
            login_complete: 20_000,
            short_wait: 5_000,
            post_login_page_delay: 5_000,
            post_input_delay: 2_000,
            post_click_delay: 3_000,
            post_navigation_delay: 3_000,
            login_wait_delay: 8_000,
            refresh_short_delay: 2_000,
            refresh_long_delay: 3_000,
        }
    }
}

/// Navigation retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    #[serde(rename = "backoff-multiplier")]
    pub backoff_multiplier: f64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 120_000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for per-target checkpoint and archive files
    #[serde(rename = "data-dir")]
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

/// Filters applied to reported items
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    #[serde(rename = "min-followers")]
    pub min_followers: u64,

    #[serde(rename = "verified-only")]
    pub verified_only: bool,

    #[serde(rename = "exclude-retweets")]
    pub exclude_retweets: bool,

    #[serde(rename = "exclude-replies")]
    pub exclude_replies: bool,

    /// Allowed language codes (empty allows all)
    pub languages: Vec<String>,
}

/// Historical search configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Date range chunking: weekly, monthly or quarterly
    pub chunk: String,

    #[serde(rename = "max-items-per-range")]
    pub max_items_per_range: usize,

    #[serde(rename = "delay-between-ranges-secs")]
    pub delay_between_ranges_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chunk: "monthly".to_string(),
            max_items_per_range: 500,
            delay_between_ranges_secs: 5,
        }
    }
}
