//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::model::{AuthorSummary, Item};
use crate::storage::{merge_items, Archive, Checkpoint};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Per-target checkpoint and archive persistence
///
/// A target owns exactly one checkpoint and one archive. Both are replaced
/// wholesale on every save. Callers write the archive before the checkpoint
/// so a checkpoint never describes items that were not persisted.
pub trait CheckpointStore {
    /// Loads the checkpoint for a target
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The target has never been committed
    /// * `Err(StorageError::Corrupt)` - A checkpoint exists but cannot be read
    fn load(&self, target: &str) -> StorageResult<Option<Checkpoint>>;

    /// Loads the full archive record for a target, if one exists
    fn load_archive_record(&self, target: &str) -> StorageResult<Option<Archive>>;

    /// Loads the archived items for a target (empty if there is no archive)
    fn load_archive(&self, target: &str) -> StorageResult<Vec<Item>> {
        Ok(self
            .load_archive_record(target)?
            .map(|archive| archive.items)
            .unwrap_or_default())
    }

    /// Replaces the archive for a target
    ///
    /// `items` are expected to be merged already; they are written newest first.
    fn save_archive(
        &mut self,
        target: &str,
        items: &[Item],
        user_summary: Option<&AuthorSummary>,
        checkpoint: &Checkpoint,
    ) -> StorageResult<()>;

    /// Replaces the checkpoint for a target
    fn save(&mut self, target: &str, checkpoint: &Checkpoint) -> StorageResult<()>;

    fn has_checkpoint(&self, target: &str) -> bool;

    /// Removes the checkpoint for a target; returns false if there was none
    fn delete(&mut self, target: &str) -> StorageResult<bool>;

    /// Merges a session's items into an archive
    fn merge(&self, existing: Vec<Item>, new: Vec<Item>) -> Vec<Item> {
        merge_items(existing, new)
    }
}
