//! Integration tests for timeline-harvest

mod crawl_tests;
mod login_tests;
mod search_tests;
mod support;
