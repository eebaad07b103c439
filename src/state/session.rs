use crate::model::{compare_ids, AuthorSummary, Item};
use std::cmp::Ordering;
use std::collections::HashSet;

/// What happened to an item handed to [`SessionState::ingest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// New item, appended to the buffer
    Appended,

    /// Already captured this session
    Duplicate,

    /// Already in the archive; not kept
    Existing,

    /// Not older than the resume anchor once the resume point is confirmed; not kept
    Newer,

    /// This existing id reached the overlap threshold; the buffer was cleared
    OverlapConfirmed,

    /// New item dropped because the session cap is already reached
    CapReached,
}

/// Per-invocation crawl state
///
/// Owns the item buffer and the dedup sets for exactly one scroll session.
/// A fresh value is built for every crawl, search or history range and is
/// consumed when the loop ends.
///
/// While a resume anchor is set and not yet confirmed, nothing collected is
/// trusted: ids already in the archive are counted, and once enough of them
/// have been seen the buffer and captured ids are dropped so that collection
/// restarts from strictly older territory. After confirmation only ids
/// below the anchor are kept, so boundary items the page delivers again
/// (after a refresh, say) stay discarded.
#[derive(Debug)]
pub struct SessionState {
    buffer: Vec<Item>,
    scraped_ids: HashSet<String>,
    existing_ids: HashSet<String>,
    user_summary: Option<AuthorSummary>,
    resume_target: Option<String>,
    resume_confirmed: bool,
    overlap_threshold: usize,
    overlap_seen: usize,
    overlap_clears: u32,
    session_cap: Option<usize>,
    total_extracted: usize,
}

impl SessionState {
    /// Creates a session state
    ///
    /// # Arguments
    ///
    /// * `resume_target` - Oldest archived id, if this session resumes a crawl
    /// * `existing_ids` - Ids already archived for the target
    /// * `overlap_threshold` - Archived ids that must be re-seen to confirm the resume point
    /// * `session_cap` - Items to collect before stopping (None = unlimited)
    pub fn new(
        resume_target: Option<String>,
        existing_ids: HashSet<String>,
        overlap_threshold: usize,
        session_cap: Option<usize>,
    ) -> Self {
        let resume_confirmed = resume_target.is_none() || existing_ids.is_empty();
        Self {
            buffer: Vec::new(),
            scraped_ids: HashSet::new(),
            existing_ids,
            user_summary: None,
            resume_target,
            resume_confirmed,
            overlap_threshold: overlap_threshold.max(1),
            overlap_seen: 0,
            overlap_clears: 0,
            session_cap,
            total_extracted: 0,
        }
    }

    /// Creates a session state with no archive to resume from
    pub fn fresh(session_cap: Option<usize>) -> Self {
        Self::new(None, HashSet::new(), 1, session_cap)
    }

    /// Records one extracted item
    pub fn ingest(&mut self, item: Item) -> Ingest {
        self.total_extracted += 1;

        if self.scraped_ids.contains(&item.id) {
            return Ingest::Duplicate;
        }

        if self.existing_ids.contains(&item.id) {
            if self.resume_confirmed {
                return Ingest::Existing;
            }

            self.scraped_ids.insert(item.id);
            self.overlap_seen += 1;

            if self.overlap_seen >= self.effective_threshold() {
                self.buffer.clear();
                self.scraped_ids.clear();
                self.resume_confirmed = true;
                self.overlap_clears += 1;
                return Ingest::OverlapConfirmed;
            }
            return Ingest::Existing;
        }

        if self.resume_confirmed && !self.is_older_than_anchor(&item.id) {
            return Ingest::Newer;
        }

        if self.cap_reached() {
            return Ingest::CapReached;
        }

        self.scraped_ids.insert(item.id.clone());
        self.buffer.push(item);
        Ingest::Appended
    }

    fn is_older_than_anchor(&self, id: &str) -> bool {
        match &self.resume_target {
            Some(anchor) => compare_ids(id, anchor) == Ordering::Less,
            None => true,
        }
    }

    /// Overlap count needed to confirm; a small archive cannot supply more ids than it has
    fn effective_threshold(&self) -> usize {
        self.overlap_threshold.min(self.existing_ids.len()).max(1)
    }

    /// Returns true once the session cap applies and the buffer has reached it
    pub fn cap_reached(&self) -> bool {
        match self.session_cap {
            Some(cap) => self.resume_confirmed && self.buffer.len() >= cap,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.buffer
    }

    /// Items handed to `ingest` so far, whether kept or not
    pub fn total_extracted(&self) -> usize {
        self.total_extracted
    }

    pub fn is_resume_confirmed(&self) -> bool {
        self.resume_confirmed
    }

    pub fn resume_target(&self) -> Option<&str> {
        self.resume_target.as_deref()
    }

    /// Archived ids counted towards the overlap threshold
    pub fn overlap_seen(&self) -> usize {
        self.overlap_seen
    }

    /// Number of times the buffer was discarded on reaching the overlap threshold
    pub fn overlap_clears(&self) -> u32 {
        self.overlap_clears
    }

    pub fn session_cap(&self) -> Option<usize> {
        self.session_cap
    }

    pub fn set_user_summary(&mut self, summary: AuthorSummary) {
        self.user_summary = Some(summary);
    }

    pub fn user_summary(&self) -> Option<&AuthorSummary> {
        self.user_summary.as_ref()
    }

    /// Consumes the state, handing back the buffer and the captured profile
    pub fn into_parts(self) -> (Vec<Item>, Option<AuthorSummary>) {
        (self.buffer, self.user_summary)
    }
}
