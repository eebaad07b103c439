//! State module for tracking crawl progress
//!
//! This module provides state management for the browser login flow and for a
//! single scroll session.
//!
//! # Components
//!
//! - `LoginState`: Tracks where the browser session is in its authentication lifecycle
//! - `SessionState`: Owns the item buffer and dedup sets for one crawl invocation

mod login_state;
mod session;

// Re-export main types
pub use login_state::LoginState;
pub use session::{Ingest, SessionState};
