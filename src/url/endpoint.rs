use std::fmt;

/// Data endpoints whose responses carry timeline items or profile data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    UserByScreenName,
    UserTweets,
    TweetDetail,
    TweetResultByRestId,
    SearchTimeline,
    SearchAdaptive,
}

impl Endpoint {
    /// The allow-list, in match priority order
    pub const ALL: [Endpoint; 6] = [
        Endpoint::UserByScreenName,
        Endpoint::UserTweets,
        Endpoint::TweetDetail,
        Endpoint::TweetResultByRestId,
        Endpoint::SearchTimeline,
        Endpoint::SearchAdaptive,
    ];

    /// The operation name as it appears in request URLs
    pub fn fragment(&self) -> &'static str {
        match self {
            Self::UserByScreenName => "UserByScreenName",
            Self::UserTweets => "UserTweets",
            Self::TweetDetail => "TweetDetail",
            Self::TweetResultByRestId => "TweetResultByRestId",
            Self::SearchTimeline => "SearchTimeline",
            Self::SearchAdaptive => "SearchAdaptive",
        }
    }

    /// Returns true for endpoints that answer with a list of timeline entries
    pub fn is_timeline(&self) -> bool {
        matches!(
            self,
            Self::UserTweets | Self::SearchTimeline | Self::SearchAdaptive
        )
    }

    /// Returns true for the endpoint that carries the target's profile
    pub fn is_profile(&self) -> bool {
        matches!(self, Self::UserByScreenName)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fragment())
    }
}

/// Finds the allow-listed endpoint a response URL belongs to
///
/// # Examples
///
/// ```
/// use timeline_harvest::url::{match_endpoint, Endpoint};
///
/// let url = "https://x.com/i/api/graphql/abc123/UserTweets?variables=%7B%7D";
/// assert_eq!(match_endpoint(url), Some(Endpoint::UserTweets));
/// assert_eq!(match_endpoint("https://x.com/home"), None);
/// ```
pub fn match_endpoint(url: &str) -> Option<Endpoint> {
    Endpoint::ALL
        .iter()
        .copied()
        .find(|endpoint| url.contains(endpoint.fragment()))
}

/// Returns true if a content type denotes a JSON data payload
pub fn is_data_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("json")
}

/// Extracts the GraphQL operation name from a request URL, for debug logging
pub fn graphql_operation(url: &str) -> Option<&str> {
    let mut parts = url.split('/');
    while let Some(part) = parts.next() {
        if part.eq_ignore_ascii_case("graphql") {
            // the path segment after "graphql" is a query id; the operation follows it
            let _query_id = parts.next()?;
            let op = parts.next()?;
            return op.split('?').next().filter(|s| !s.is_empty());
        }
    }
    None
}
