//! Payload extractor for captured timeline responses
//!
//! This module turns one decoded response body into canonical items:
//! - Locating the list of timeline instructions among the known payload shapes
//! - Skipping cursor, suggestion and injected entries
//! - Rebuilding each item from its nested result object
//! - Reading the target's profile from `UserByScreenName` responses
//!
//! Missing fields default to zero, empty strings or empty lists. A single bad
//! entry is logged and skipped; only a payload matching none of the known
//! shapes yields nothing at all.

use crate::model::{AuthorSummary, Item, ItemFlags, ItemUrl, MediaItem, Metrics};
use crate::url::Endpoint;
use chrono::Utc;
use serde_json::Value;

/// Where each known timeline shape keeps its instruction list, tried in order
const INSTRUCTION_PATHS: [&str; 4] = [
    "/data/user/result/timeline_v2/timeline/instructions",
    "/data/user/result/timeline/timeline/instructions",
    "/data/search_by_raw_query/search_timeline/timeline/instructions",
    "/data/threaded_conversation_with_injections_v2/instructions",
];

/// Single-result detail wrapper
const SINGLE_RESULT_PATH: &str = "/data/tweetResult/result";

/// Profile wrapper
const USER_RESULT_PATH: &str = "/data/user/result";

/// Entry id fragments that never carry content
const SKIPPED_ENTRY_MARKERS: [&str; 3] = ["cursor-", "who-to-follow", "profile-conversation"];

/// What one payload yielded
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub items: Vec<Item>,
    /// Profile of the crawl target, when the payload carried one
    pub user: Option<AuthorSummary>,
}

/// Turns a decoded response body into items
///
/// Returns None when the payload matches no known shape.
pub trait PayloadExtractor: Send + Sync {
    fn extract(&self, endpoint: Endpoint, payload: &Value) -> Option<Extraction>;
}

/// Extractor for the known timeline, search, detail and conversation shapes
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineExtractor;

impl PayloadExtractor for TimelineExtractor {
    fn extract(&self, endpoint: Endpoint, payload: &Value) -> Option<Extraction> {
        if endpoint.is_profile() {
            let user = payload.pointer(USER_RESULT_PATH).map(extract_user_profile)?;
            tracing::info!(
                "Captured user data: @{} ({} followers)",
                user.handle,
                user.follower_count
            );
            return Some(Extraction {
                items: Vec::new(),
                user: Some(user),
            });
        }

        if let Some(instructions) = find_instructions(payload) {
            return Some(Extraction {
                items: extract_from_instructions(instructions),
                user: None,
            });
        }

        if let Some(result) = payload.pointer(SINGLE_RESULT_PATH) {
            return Some(Extraction {
                items: extract_item(result).into_iter().collect(),
                user: None,
            });
        }

        tracing::warn!("No timeline instructions found in any known format");
        tracing::debug!(
            "Available data keys: {:?}",
            payload
                .get("data")
                .and_then(|data| data.as_object())
                .map(|data| data.keys().cloned().collect::<Vec<_>>())
        );
        None
    }
}

/// Finds the instruction list using the first shape that matches
fn find_instructions(payload: &Value) -> Option<&Vec<Value>> {
    INSTRUCTION_PATHS
        .iter()
        .find_map(|path| payload.pointer(path).and_then(Value::as_array))
}

/// Collects items from `TimelineAddEntries` and `TimelinePinEntry` instructions
fn extract_from_instructions(instructions: &[Value]) -> Vec<Item> {
    let mut items = Vec::new();

    for instruction in instructions {
        match str_at(instruction, "/type") {
            "TimelineAddEntries" => {
                let entries = instruction
                    .get("entries")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let before = items.len();
                let mut skipped = Vec::new();

                for entry in entries {
                    let entry_id = str_at(entry, "/entryId");
                    if SKIPPED_ENTRY_MARKERS.iter().any(|m| entry_id.contains(m)) {
                        skipped.push(entry_id);
                        continue;
                    }
                    items.extend(extract_entry(entry));
                }

                let extracted = items.len() - before;
                if extracted > 0 {
                    tracing::debug!("Extracted {} items from {} entries", extracted, entries.len());
                } else if !entries.is_empty() {
                    tracing::debug!(
                        "No items extracted from {} entries (skipped: {:?})",
                        entries.len(),
                        skipped.iter().take(5).collect::<Vec<_>>()
                    );
                }
            }
            "TimelinePinEntry" => {
                if let Some(entry) = instruction.get("entry") {
                    items.extend(extract_entry(entry));
                }
            }
            other => tracing::trace!("Ignoring instruction type {:?}", other),
        }
    }

    items
}

/// Extracts the items of one entry: a single item or a conversation module
fn extract_entry(entry: &Value) -> Vec<Item> {
    if let Some(result) = entry.pointer("/content/itemContent/tweet_results/result") {
        return extract_item(result).into_iter().collect();
    }

    entry
        .pointer("/content/items")
        .and_then(Value::as_array)
        .map(|module| {
            module
                .iter()
                .filter_map(|m| m.pointer("/item/itemContent/tweet_results/result"))
                .filter_map(extract_item)
                .collect()
        })
        .unwrap_or_default()
}

/// Rebuilds one item from its result object
///
/// Returns None if the result has no id (tombstones, unavailable items).
pub fn extract_item(result: &Value) -> Option<Item> {
    let result = if str_at(result, "/__typename") == "TweetWithVisibilityResults" {
        result.get("tweet")?
    } else {
        result
    };

    let id = str_at(result, "/rest_id");
    if id.is_empty() {
        tracing::debug!("Skipping result without rest_id");
        return None;
    }

    let legacy = result.get("legacy").unwrap_or(&Value::Null);
    let author = result
        .pointer("/core/user_results/result")
        .map(extract_author)
        .unwrap_or_default();

    Some(Item {
        id: id.to_string(),
        text: str_at(legacy, "/full_text").to_string(),
        created_at: str_at(legacy, "/created_at").to_string(),
        author,
        metrics: Metrics {
            retweet_count: u64_at(legacy, "/retweet_count"),
            favorite_count: u64_at(legacy, "/favorite_count"),
            reply_count: u64_at(legacy, "/reply_count"),
            quote_count: u64_at(legacy, "/quote_count"),
            view_count: u64_at(result, "/views/count"),
        },
        flags: ItemFlags {
            is_retweet: bool_at(legacy, "/retweeted"),
            is_reply: legacy
                .get("in_reply_to_status_id_str")
                .map_or(false, |v| !v.is_null()),
            is_quote: bool_at(legacy, "/is_quote_status"),
        },
        possibly_sensitive: bool_at(legacy, "/possibly_sensitive"),
        hashtags: array_at(legacy, "/entities/hashtags")
            .iter()
            .map(|tag| str_at(tag, "/text").to_string())
            .collect(),
        media: array_at(legacy, "/extended_entities/media")
            .iter()
            .map(extract_media)
            .collect(),
        urls: array_at(legacy, "/entities/urls")
            .iter()
            .map(|u| ItemUrl {
                url: str_at(u, "/url").to_string(),
                expanded_url: str_at(u, "/expanded_url").to_string(),
                display_url: str_at(u, "/display_url").to_string(),
            })
            .collect(),
        lang: match str_at(legacy, "/lang") {
            "" => "en".to_string(),
            lang => lang.to_string(),
        },
        extracted_at: Utc::now(),
    })
}

/// Embedded author of an item
fn extract_author(user: &Value) -> AuthorSummary {
    let legacy = user.get("legacy").unwrap_or(&Value::Null);
    AuthorSummary {
        id: str_at(user, "/rest_id").to_string(),
        handle: str_at(legacy, "/screen_name").to_string(),
        display_name: str_at(legacy, "/name").to_string(),
        follower_count: u64_at(legacy, "/followers_count"),
        following_count: u64_at(legacy, "/friends_count"),
        verified: bool_at(user, "/is_blue_verified") || bool_at(legacy, "/verified"),
        avatar_url: str_at(legacy, "/profile_image_url_https").to_string(),
        bio: str_at(legacy, "/description").to_string(),
        ..Default::default()
    }
}

/// Full profile of the crawl target
fn extract_user_profile(user: &Value) -> AuthorSummary {
    let legacy = user.get("legacy").unwrap_or(&Value::Null);
    AuthorSummary {
        item_count: u64_at(legacy, "/statuses_count"),
        banner_url: str_at(legacy, "/profile_banner_url").to_string(),
        created_at: str_at(legacy, "/created_at").to_string(),
        location: str_at(legacy, "/location").to_string(),
        url: str_at(legacy, "/url").to_string(),
        ..extract_author(user)
    }
}

fn extract_media(media: &Value) -> MediaItem {
    let media_type = str_at(media, "/type").to_string();
    let video_url = if media_type == "video" {
        array_at(media, "/video_info/variants")
            .iter()
            .filter(|v| str_at(v, "/content_type") == "video/mp4")
            .max_by_key(|v| u64_at(v, "/bitrate"))
            .map(|v| str_at(v, "/url").to_string())
    } else {
        None
    };

    MediaItem {
        media_type,
        url: str_at(media, "/media_url_https").to_string(),
        expanded_url: str_at(media, "/expanded_url").to_string(),
        video_url,
    }
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("")
}

/// Reads a count that may be encoded as a number or a numeric string
fn u64_at(value: &Value, pointer: &str) -> u64 {
    match value.pointer(pointer) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
