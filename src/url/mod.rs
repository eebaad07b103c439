//! URL handling module for timeline-harvest
//!
//! This module provides endpoint allow-list matching for captured responses
//! and builders for the pages the crawler visits.

mod builder;
mod endpoint;

// Re-export main functions
pub use builder::{history_query, is_login_route, SearchMode, SiteUrls};
pub use endpoint::{graphql_operation, is_data_content_type, match_endpoint, Endpoint};
