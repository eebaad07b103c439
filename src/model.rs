//! Data models for harvested timeline items.
//!
//! These structures are the canonical form of an item after it has been
//! rebuilt from a captured response. They are what the archive file stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One timeline item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub author: AuthorSummary,
    pub metrics: Metrics,
    pub flags: ItemFlags,
    #[serde(default)]
    pub possibly_sensitive: bool,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub urls: Vec<ItemUrl>,
    pub lang: String,
    pub extracted_at: DateTime<Utc>,
}

/// Embedded subset of a user entity
///
/// Also used for the crawl target's own profile, in which case the
/// profile-only fields are filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorSummary {
    pub id: String,
    pub handle: String,
    pub display_name: String,
    pub follower_count: u64,
    pub following_count: u64,
    pub verified: bool,
    pub avatar_url: String,
    pub bio: String,
    pub item_count: u64,
    pub banner_url: String,
    pub created_at: String,
    pub location: String,
    pub url: String,
}

/// Engagement counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub retweet_count: u64,
    pub favorite_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
    pub view_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemFlags {
    pub is_retweet: bool,
    pub is_reply: bool,
    pub is_quote: bool,
}

/// Media attached to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub media_type: String,
    pub url: String,
    pub expanded_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// A link in an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUrl {
    pub url: String,
    pub expanded_url: String,
    pub display_url: String,
}

/// Compares two item ids by numeric value
///
/// Ids are decimal strings of varying length, so comparison strips leading
/// zeros and orders by digit count before comparing digits. Non-numeric ids
/// sort below every numeric id; among themselves they fall back to string
/// order so sorting stays deterministic.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use timeline_harvest::model::compare_ids;
///
/// assert_eq!(compare_ids("205", "17"), Ordering::Greater);
/// assert_eq!(compare_ids("abc", "1"), Ordering::Less);
/// ```
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (numeric_digits(a), numeric_digits(b)) {
        (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Returns the significant digits of a numeric id, or None if it is not numeric
fn numeric_digits(id: &str) -> Option<&str> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = id.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

/// Sorts items newest first (numeric id descending)
pub fn sort_newest_first(items: &mut [Item]) {
    items.sort_by(|a, b| compare_ids(&b.id, &a.id));
}

/// Returns the (oldest, newest) items by numeric id
pub fn id_bounds(items: &[Item]) -> Option<(&Item, &Item)> {
    let oldest = items.iter().min_by(|a, b| compare_ids(&a.id, &b.id))?;
    let newest = items.iter().max_by(|a, b| compare_ids(&a.id, &b.id))?;
    Some((oldest, newest))
}

#[cfg(test)]
pub(crate) fn test_item(id: &str) -> Item {
    Item {
        id: id.to_string(),
        text: format!("item {}", id),
        created_at: "Wed Oct 10 20:19:24 +0000 2018".to_string(),
        author: AuthorSummary::default(),
        metrics: Metrics::default(),
        flags: ItemFlags::default(),
        possibly_sensitive: false,
        hashtags: vec![],
        media: vec![],
        urls: vec![],
        lang: "en".to_string(),
        extracted_at: Utc::now(),
    }
}
