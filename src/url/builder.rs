use std::fmt;
use std::str::FromStr;
use url::Url;

/// Result ordering for keyword search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Latest,
    Top,
    Media,
}

impl SearchMode {
    /// Value of the `f` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Latest => "live",
            Self::Top => "top",
            Self::Media => "image",
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" | "live" => Ok(Self::Latest),
            "top" => Ok(Self::Top),
            "media" | "image" => Ok(Self::Media),
            other => Err(format!("unknown search mode '{}'", other)),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Latest => "latest",
            Self::Top => "top",
            Self::Media => "media",
        };
        write!(f, "{}", name)
    }
}

/// Builds the page URLs the crawler navigates to
#[derive(Debug, Clone)]
pub struct SiteUrls {
    base: Url,
}

impl SiteUrls {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
        })
    }

    pub fn base(&self) -> &str {
        self.base.as_str()
    }

    pub fn home(&self) -> String {
        self.join_path("home")
    }

    pub fn login(&self) -> String {
        self.join_path("i/flow/login")
    }

    /// Profile page for a handle; a leading `@` is ignored
    pub fn profile(&self, handle: &str) -> String {
        self.join_path(handle.trim_start_matches('@'))
    }

    /// Search results page for a raw query
    pub fn search(&self, query: &str, mode: SearchMode) -> String {
        let mut url = self.base.clone();
        url.set_path("search");
        url.query_pairs_mut()
            .clear()
            .append_pair("q", query)
            .append_pair("src", "typed_query")
            .append_pair("f", mode.as_param());
        url.to_string()
    }

    fn join_path(&self, path: &str) -> String {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        url.to_string()
    }
}

/// Returns true if a URL is on the login flow rather than an authenticated page
pub fn is_login_route(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("/login") || lower.contains("/flow")
}

/// Builds a `from:` search query, optionally bounded by dates (YYYY-MM-DD)
pub fn history_query(handle: &str, since: Option<&str>, until: Option<&str>) -> String {
    let mut query = format!("from:{}", handle.trim_start_matches('@'));
    if let Some(since) = since {
        query.push_str(&format!(" since:{}", since));
    }
    if let Some(until) = until {
        query.push_str(&format!(" until:{}", until));
    }
    query
}
