//! Storage module for persisting crawl progress
//!
//! This module handles everything that survives a restart:
//! - Per-target checkpoint metadata (bounds, counts, session number)
//! - The cumulative deduplicated item archive
//! - The merge law combining an archive with a session's items
//!
//! The checkpoint and archive are both plain JSON files so they can be
//! inspected and repaired by hand.

mod json_store;
mod merge;
mod traits;

pub use json_store::{sanitize_target, JsonCheckpointStore};
pub use merge::merge_items;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::model::{id_bounds, AuthorSummary, Item};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-target crawl progress, overwritten at the end of every committed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub target: String,
    pub total_items: usize,
    pub oldest_item_id: Option<String>,
    pub oldest_item_date: Option<String>,
    pub newest_item_id: Option<String>,
    pub newest_item_date: Option<String>,
    pub session_count: u32,
    pub last_session_item_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl Checkpoint {
    /// Builds the checkpoint describing a merged archive
    ///
    /// # Arguments
    ///
    /// * `target` - The crawl target
    /// * `archive` - The full merged archive
    /// * `previous` - The checkpoint this session resumed from, if any
    /// * `session_items` - Items collected in this session
    pub fn for_archive(
        target: &str,
        archive: &[Item],
        previous: Option<&Checkpoint>,
        session_items: usize,
    ) -> Self {
        let bounds = id_bounds(archive);
        Self {
            target: target.to_string(),
            total_items: archive.len(),
            oldest_item_id: bounds.map(|(oldest, _)| oldest.id.clone()),
            oldest_item_date: bounds.map(|(oldest, _)| oldest.created_at.clone()),
            newest_item_id: bounds.map(|(_, newest)| newest.id.clone()),
            newest_item_date: bounds.map(|(_, newest)| newest.created_at.clone()),
            session_count: previous.map_or(0, |p| p.session_count) + 1,
            last_session_item_count: session_items,
            last_updated: Utc::now(),
        }
    }
}

/// On-disk archive for one target, items newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Archive {
    pub target: String,
    #[serde(default)]
    pub user_summary: Option<AuthorSummary>,
    pub item_count: usize,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub session_count: u32,
    #[serde(default)]
    pub oldest_item_date: Option<String>,
    pub items: Vec<Item>,
}
