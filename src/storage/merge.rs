use crate::model::{sort_newest_first, Item};
use std::collections::HashMap;

/// Merges newly collected items into an existing archive
///
/// Items are keyed by id. Existing items go in first and new items overwrite
/// them, so an item seen again carries its latest snapshot. The result is
/// sorted newest first.
///
/// Merging the same new items twice gives the same archive as merging them
/// once, and merging nothing leaves the archive as it was.
///
/// # Examples
///
/// ```
/// use timeline_harvest::storage::merge_items;
///
/// let merged = merge_items(Vec::new(), Vec::new());
/// assert!(merged.is_empty());
/// ```
pub fn merge_items(existing: Vec<Item>, new: Vec<Item>) -> Vec<Item> {
    let existing_count = existing.len();
    let mut by_id: HashMap<String, Item> = HashMap::with_capacity(existing_count + new.len());

    for item in existing {
        by_id.insert(item.id.clone(), item);
    }

    let mut added = 0;
    for item in new {
        if by_id.insert(item.id.clone(), item).is_none() {
            added += 1;
        }
    }

    let mut merged: Vec<Item> = by_id.into_values().collect();
    sort_newest_first(&mut merged);

    tracing::info!(
        "Merged: {} existing + {} new = {} total",
        existing_count,
        added,
        merged.len()
    );
    merged
}
