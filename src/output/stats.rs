//! Statistics over a stored archive
//!
//! This module provides functionality for extracting and displaying
//! per-target statistics from the checkpoint store.

use crate::model::{id_bounds, Item};
use crate::storage::{Checkpoint, CheckpointStore};
use crate::HarvestError;
use std::collections::HashMap;

/// How many hashtags and languages to list
const TOP_N: usize = 10;

/// Archive statistics summary
#[derive(Debug, Clone, Default)]
pub struct ArchiveStatistics {
    pub target: String,

    pub checkpoint: Option<Checkpoint>,

    /// Items in the archive file
    pub total_items: usize,

    /// Profile handle and follower count, when the profile was captured
    pub handle: Option<String>,
    pub followers: Option<u64>,

    pub oldest_item_id: Option<String>,
    pub newest_item_id: Option<String>,

    pub retweets: usize,
    pub replies: usize,
    pub quotes: usize,
    pub with_media: usize,

    pub total_favorites: u64,
    pub total_retweet_count: u64,
    pub total_views: u64,

    /// Most used hashtags (lowercased) with counts, descending
    pub top_hashtags: Vec<(String, usize)>,

    /// Language codes with counts, descending
    pub languages: Vec<(String, usize)>,
}

/// Loads statistics for one target
///
/// # Arguments
///
/// * `store` - The checkpoint store to read
/// * `target` - The crawl target
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Statistics, empty if the target was never crawled
/// * `Err(HarvestError)` - The checkpoint or archive could not be read
pub fn load_statistics(
    store: &dyn CheckpointStore,
    target: &str,
) -> Result<ArchiveStatistics, HarvestError> {
    let checkpoint = store.load(target)?;
    let archive = store.load_archive_record(target)?;

    let mut stats = match archive {
        Some(archive) => {
            let mut stats = compute_statistics(target, &archive.items);
            if let Some(user) = archive.user_summary {
                stats.handle = Some(user.handle);
                stats.followers = Some(user.follower_count);
            }
            stats
        }
        None => ArchiveStatistics {
            target: target.to_string(),
            ..Default::default()
        },
    };
    stats.checkpoint = checkpoint;
    Ok(stats)
}

/// Computes statistics over a set of items
pub fn compute_statistics(target: &str, items: &[Item]) -> ArchiveStatistics {
    let mut hashtags: HashMap<String, usize> = HashMap::new();
    let mut languages: HashMap<String, usize> = HashMap::new();
    let mut stats = ArchiveStatistics {
        target: target.to_string(),
        total_items: items.len(),
        ..Default::default()
    };

    if let Some((oldest, newest)) = id_bounds(items) {
        stats.oldest_item_id = Some(oldest.id.clone());
        stats.newest_item_id = Some(newest.id.clone());
    }

    for item in items {
        stats.retweets += item.flags.is_retweet as usize;
        stats.replies += item.flags.is_reply as usize;
        stats.quotes += item.flags.is_quote as usize;
        stats.with_media += !item.media.is_empty() as usize;
        stats.total_favorites += item.metrics.favorite_count;
        stats.total_retweet_count += item.metrics.retweet_count;
        stats.total_views += item.metrics.view_count;

        for tag in &item.hashtags {
            *hashtags.entry(tag.to_lowercase()).or_insert(0) += 1;
        }
        *languages.entry(item.lang.clone()).or_insert(0) += 1;
    }

    stats.top_hashtags = top_counts(hashtags);
    stats.languages = top_counts(languages);
    stats
}

/// Sorts by count descending, then key, and keeps the first few
fn top_counts(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(TOP_N);
    counts
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics: {} ===\n", stats.target);

    match &stats.checkpoint {
        Some(checkpoint) => {
            println!("Checkpoint:");
            println!("  Sessions: {}", checkpoint.session_count);
            println!("  Items recorded: {}", checkpoint.total_items);
            println!("  Last session: {} items", checkpoint.last_session_item_count);
            println!(
                "  Oldest item: {} ({})",
                checkpoint.oldest_item_id.as_deref().unwrap_or("-"),
                checkpoint.oldest_item_date.as_deref().unwrap_or("unknown")
            );
            println!(
                "  Newest item: {} ({})",
                checkpoint.newest_item_id.as_deref().unwrap_or("-"),
                checkpoint.newest_item_date.as_deref().unwrap_or("unknown")
            );
            println!("  Last updated: {}", checkpoint.last_updated.to_rfc3339());
        }
        None => println!("No checkpoint recorded"),
    }
    println!();

    if let (Some(handle), Some(followers)) = (&stats.handle, stats.followers) {
        println!("Profile: @{} ({} followers)\n", handle, followers);
    }

    println!("Archive:");
    println!("  Items: {}", stats.total_items);
    if stats.total_items == 0 {
        return;
    }
    let share = |count: usize| (count as f64 / stats.total_items as f64) * 100.0;
    println!("  Retweets: {} ({:.1}%)", stats.retweets, share(stats.retweets));
    println!("  Replies: {} ({:.1}%)", stats.replies, share(stats.replies));
    println!("  Quotes: {} ({:.1}%)", stats.quotes, share(stats.quotes));
    println!("  With media: {} ({:.1}%)", stats.with_media, share(stats.with_media));
    println!(
        "  Engagement: {} likes, {} retweets, {} views",
        stats.total_favorites, stats.total_retweet_count, stats.total_views
    );
    println!();

    if !stats.top_hashtags.is_empty() {
        println!("Top Hashtags:");
        for (tag, count) in &stats.top_hashtags {
            println!("  #{}: {}", tag, count);
        }
        println!();
    }

    println!("Languages:");
    for (lang, count) in &stats.languages {
        println!("  {}: {} ({:.1}%)", lang, count, share(*count));
    }
}
