//! JSON file checkpoint store
//!
//! Layout under the data directory:
//!
//! ```text
//! <data-dir>/<target>/checkpoint.json
//! <data-dir>/<target>/items_<target>.json
//! ```
//!
//! Every write goes to a temporary sibling first and is renamed into place,
//! so an interrupted write leaves the previous file intact.

use crate::model::{sort_newest_first, AuthorSummary, Item};
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{Archive, Checkpoint};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const CHECKPOINT_FILE: &str = "checkpoint.json";

/// Checkpoint store backed by JSON files
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    data_dir: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn target_dir(&self, target: &str) -> PathBuf {
        self.data_dir.join(sanitize_target(target))
    }

    pub fn checkpoint_path(&self, target: &str) -> PathBuf {
        self.target_dir(target).join(CHECKPOINT_FILE)
    }

    pub fn archive_path(&self, target: &str) -> PathBuf {
        let name = sanitize_target(target);
        self.data_dir.join(&name).join(format!("items_{}.json", name))
    }
}

/// Turns a target into a safe directory name
///
/// A leading `@` is dropped; whitespace, path separators and other
/// characters that are awkward in file names become `_`.
///
/// # Examples
///
/// ```
/// use timeline_harvest::storage::sanitize_target;
///
/// assert_eq!(sanitize_target("@rustlang"), "rustlang");
/// assert_eq!(sanitize_target("rust lang/news"), "rust_lang_news");
/// ```
pub fn sanitize_target(target: &str) -> String {
    let cleaned: String = target
        .trim()
        .trim_start_matches('@')
        .chars()
        .map(|c| {
            if c.is_whitespace() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// Reads and decodes a JSON file; Ok(None) if it does not exist
fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Writes pretty JSON through a temporary file and a rename
fn write_json<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self, target: &str) -> StorageResult<Option<Checkpoint>> {
        let path = self.checkpoint_path(target);
        let checkpoint: Option<Checkpoint> = read_json(&path)?;

        match &checkpoint {
            Some(c) => tracing::info!(
                "Checkpoint loaded for {}: {} items, {} sessions, oldest {}",
                target,
                c.total_items,
                c.session_count,
                c.oldest_item_date.as_deref().unwrap_or("unknown")
            ),
            None => tracing::info!("No checkpoint found for {}", target),
        }
        Ok(checkpoint)
    }

    fn load_archive_record(&self, target: &str) -> StorageResult<Option<Archive>> {
        let path = self.archive_path(target);
        let archive: Option<Archive> = read_json(&path)?;
        if let Some(archive) = &archive {
            tracing::info!("Loaded {} archived items for {}", archive.items.len(), target);
        }
        Ok(archive)
    }

    fn save_archive(
        &mut self,
        target: &str,
        items: &[Item],
        user_summary: Option<&AuthorSummary>,
        checkpoint: &Checkpoint,
    ) -> StorageResult<()> {
        let mut items = items.to_vec();
        sort_newest_first(&mut items);

        let archive = Archive {
            target: target.to_string(),
            user_summary: user_summary.cloned(),
            item_count: items.len(),
            last_updated: Utc::now(),
            session_count: checkpoint.session_count,
            oldest_item_date: checkpoint.oldest_item_date.clone(),
            items,
        };

        let path = self.archive_path(target);
        write_json(&path, &archive)?;
        tracing::info!("Saved {} items to {}", archive.item_count, path.display());
        Ok(())
    }

    fn save(&mut self, target: &str, checkpoint: &Checkpoint) -> StorageResult<()> {
        write_json(&self.checkpoint_path(target), checkpoint)?;
        tracing::info!(
            "Checkpoint saved for {}: {} items, oldest {}",
            target,
            checkpoint.total_items,
            checkpoint.oldest_item_date.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }

    fn has_checkpoint(&self, target: &str) -> bool {
        self.checkpoint_path(target).exists()
    }

    fn delete(&mut self, target: &str) -> StorageResult<bool> {
        match fs::remove_file(self.checkpoint_path(target)) {
            Ok(()) => {
                tracing::info!("Deleted checkpoint for {}", target);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
