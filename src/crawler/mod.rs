//! Crawler module for timeline collection
//!
//! This module contains the core crawling logic, including:
//! - Payload extraction and captured response routing
//! - The scroll-driven pagination loop and its stop conditions
//! - Navigation retry with exponential backoff
//! - Overall crawl orchestration with checkpoints
//! - Report-time filters and historical date ranges

mod extractor;
mod filter;
mod listener;
mod orchestrator;
mod ranges;
mod retry;
mod scroller;

pub use extractor::{extract_item, Extraction, PayloadExtractor, TimelineExtractor};
pub use filter::ItemFilter;
pub use listener::{IngestReport, ResponseListener};
pub use orchestrator::{CrawlOptions, CrawlOrchestrator, CrawlReport};
pub use ranges::{date_ranges, parse_date_or_relative, DateRange, RangeChunk};
pub use retry::{RetryDecision, RetryPolicy};
pub use scroller::{
    ScrollOutcome, ScrollSettings, StopReason, TimelineScroller, AT_BOTTOM_SCRIPT,
    JUMP_BOTTOM_SCRIPT, JUMP_TOP_SCRIPT, SCROLL_STEP_SCRIPT,
};
