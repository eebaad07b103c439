/// Login state definitions for the browser session
///
/// This module defines every state the authentication flow can be in and
/// which moves between them are legal.
use std::fmt;

/// Represents where a browser session is in its authentication lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginState {
    // ===== Setup States =====
    /// Browser has not been launched yet
    Uninitialized,

    /// Browser is up and no saved cookies were found
    Launched,

    /// Browser is up and saved cookies were loaded into it
    CookiesPresent,

    // ===== Login States =====
    /// Verifying that the saved cookies still grant a session
    CookieReuse,

    /// Driving the login form
    InteractiveLogin,

    /// The login flow asked for the account email
    EmailChallenge,

    // ===== Terminal States =====
    /// Authenticated and ready to crawl
    LoggedIn,

    /// Login did not reach the authenticated home route
    Failed,

    /// Browser has been shut down
    Closed,
}

impl LoginState {
    /// Returns true if the session can be used for crawling
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::LoggedIn)
    }

    /// Returns true while a login attempt is in flight
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::CookieReuse | Self::InteractiveLogin | Self::EmailChallenge
        )
    }

    /// Returns true if the browser has been launched and not yet closed
    pub fn is_launched(&self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Closed)
    }

    /// Checks whether moving from this state to `next` is legal
    ///
    /// Any launched state may be closed. A failed or logged-in session may
    /// start a fresh interactive login.
    pub fn can_transition_to(&self, next: LoginState) -> bool {
        use LoginState::*;

        if next == Closed {
            return true;
        }

        matches!(
            (self, next),
            (Uninitialized, Launched)
                | (Uninitialized, CookiesPresent)
                | (Launched, InteractiveLogin)
                | (CookiesPresent, CookieReuse)
                | (CookiesPresent, InteractiveLogin)
                | (CookieReuse, LoggedIn)
                | (CookieReuse, InteractiveLogin)
                | (InteractiveLogin, EmailChallenge)
                | (InteractiveLogin, LoggedIn)
                | (InteractiveLogin, Failed)
                | (EmailChallenge, InteractiveLogin)
                | (EmailChallenge, Failed)
                | (LoggedIn, InteractiveLogin)
                | (Failed, InteractiveLogin)
        )
    }

    /// Returns a short lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Launched => "launched",
            Self::CookiesPresent => "cookies_present",
            Self::CookieReuse => "cookie_reuse",
            Self::InteractiveLogin => "interactive_login",
            Self::EmailChallenge => "email_challenge",
            Self::LoggedIn => "logged_in",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
