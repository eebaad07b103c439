//! Crawl report summaries
//!
//! Formats a [`CrawlReport`] for the terminal after a command finishes.
//! Report-time filters are applied here; the archive is never filtered.

use crate::crawler::{CrawlReport, ItemFilter};
use crate::model::Item;

/// How many items the summary previews
const PREVIEW_ITEMS: usize = 5;

/// Longest text preview before truncation
const PREVIEW_CHARS: usize = 80;

/// Formats a crawl report as plain text
///
/// # Arguments
///
/// * `report` - The finished crawl report
/// * `filter` - Report-time filter applied to the listed items
///
/// # Returns
///
/// A formatted multi-line string
pub fn format_crawl_summary(report: &CrawlReport, filter: &ItemFilter) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Crawl Summary: {} ===\n\n", report.target));

    let status = match (&report.error, report.stop_reason) {
        (Some(e), _) => format!("failed ({})", e),
        (None, Some(reason)) => format!("completed ({})", reason),
        (None, None) => "completed".to_string(),
    };
    out.push_str(&format!("Status: {}\n", status));
    out.push_str(&format!(
        "Duration: {:.1}s\n",
        report.elapsed.as_secs_f64()
    ));
    out.push_str(&format!("Items collected: {}\n", report.item_count));
    if report.archive_count > 0 {
        out.push_str(&format!("Archive size: {}\n", report.archive_count));
    }

    if let Some(user) = &report.user_summary {
        out.push_str(&format!(
            "Profile: @{} ({}), {} followers, {} following\n",
            user.handle, user.display_name, user.follower_count, user.following_count
        ));
    }

    let matching = filter.apply(&report.items);
    if !filter.is_empty() {
        out.push_str(&format!(
            "Matching filters: {} of {}\n",
            matching.len(),
            report.items.len()
        ));
    }

    if !matching.is_empty() {
        out.push_str("\nNewest items:\n");
        for item in matching.iter().take(PREVIEW_ITEMS) {
            out.push_str(&format!("  [{}] {}\n", item.id, preview(item)));
        }
        if matching.len() > PREVIEW_ITEMS {
            out.push_str(&format!("  ... and {} more\n", matching.len() - PREVIEW_ITEMS));
        }
    }

    out
}

/// Prints a crawl report summary to stdout
pub fn print_crawl_summary(report: &CrawlReport, filter: &ItemFilter) {
    print!("{}", format_crawl_summary(report, filter));
}

/// One-line text preview
fn preview(item: &Item) -> String {
    let flat = item.text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", cut)
}
