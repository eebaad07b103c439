//! Browser module for driving the timeline page
//!
//! This module contains everything that touches a live browser:
//! - The engine trait the rest of the crate programs against
//! - A W3C WebDriver implementation of it
//! - The in-page hook that captures data responses
//! - The session wrapper owning login state and cookies

mod capture;
mod engine;
mod session;
mod webdriver;

#[cfg(test)]
pub(crate) mod fake;

// Re-export main types
pub use capture::{drain_script, hook_script, parse_drained};
pub use engine::{BrowserEngine, BrowserError, CapturedResponse, Cookie, LaunchOptions};
pub use session::{
    load_cookies, store_cookies, BrowserSession, ACCOUNT_MISSING_MARKER, EMAIL_CHALLENGE_INPUT,
    HOME_INDICATOR, ITEM_MARKER, LOGIN_BUTTON, NEXT_BUTTON, PASSWORD_INPUT, USERNAME_INPUT,
};
pub use webdriver::WebDriverEngine;
