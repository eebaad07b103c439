//! Output module for crawl summaries and archive statistics
//!
//! This module handles:
//! - Summarizing a finished crawl report, with report-time filters applied
//! - Recording and printing per-target archive statistics

pub mod stats;
mod summary;

// Re-export main types
pub use stats::{compute_statistics, load_statistics, print_statistics, ArchiveStatistics};
pub use summary::{format_crawl_summary, print_crawl_summary};
