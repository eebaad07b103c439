//! Crawl orchestration
//!
//! The orchestrator ties one browser session to one checkpoint store. For a
//! profile crawl it:
//! - Decides between a fresh crawl and a resume
//! - Seeds the session state with archived ids and the resume anchor
//! - Runs the scroll loop
//! - Merges, then writes the archive before the checkpoint
//!
//! Searches and historical crawls reuse the scroll loop without checkpoints.
//! Every entry point returns a [`CrawlReport`]; failures ride along in
//! `report.error` so collected items are never thrown away.

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::crawler::listener::ResponseListener;
use crate::crawler::ranges::DateRange;
use crate::crawler::scroller::{ScrollSettings, StopReason, TimelineScroller};
use crate::model::{sort_newest_first, AuthorSummary, Item};
use crate::state::SessionState;
use crate::storage::{Checkpoint, CheckpointStore};
use crate::url::{history_query, SearchMode};
use crate::HarvestError;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Per-call options for a profile crawl
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Continue from the stored checkpoint instead of starting over
    pub resume: bool,
    /// Overrides the configured session cap (Some(0) = unlimited)
    pub max_items_per_session: Option<usize>,
}

/// Outcome of one orchestrated crawl
#[derive(Debug)]
pub struct CrawlReport {
    pub target: String,
    /// Items collected by this invocation, newest first
    pub items: Vec<Item>,
    pub user_summary: Option<AuthorSummary>,
    pub item_count: usize,
    /// Archive size after the commit (0 when nothing was committed)
    pub archive_count: usize,
    pub elapsed: Duration,
    /// None when the loop never ran; multi-range crawls set it only when rate limited
    pub stop_reason: Option<StopReason>,
    pub error: Option<HarvestError>,
}

impl CrawlReport {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            items: Vec::new(),
            user_summary: None,
            item_count: 0,
            archive_count: 0,
            elapsed: Duration::ZERO,
            stop_reason: None,
            error: None,
        }
    }

    fn failed(target: &str, started: Instant, error: HarvestError) -> Self {
        tracing::error!("Crawl of {} failed: {}", target, error);
        Self {
            elapsed: started.elapsed(),
            error: Some(error),
            ..Self::new(target)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// What a profile crawl starts from
struct ResumePlan {
    previous: Option<Checkpoint>,
    archive: Vec<Item>,
    resume_target: Option<String>,
}

/// Composes browser session, scroll loop and checkpoint store
pub struct CrawlOrchestrator<S: CheckpointStore> {
    store: S,
    listener: ResponseListener,
    settings: ScrollSettings,
    overlap_threshold: usize,
    session_cap: Option<usize>,
    range_delay: Duration,
}

impl<S: CheckpointStore> CrawlOrchestrator<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            listener: ResponseListener::default(),
            settings: ScrollSettings::from_config(&config.scraping, &config.timeouts),
            overlap_threshold: config.scraping.overlap_threshold,
            session_cap: config.scraping.session_cap(),
            range_delay: Duration::from_secs(config.search.delay_between_ranges_secs),
        }
    }

    /// Replaces the response listener (and with it the extractor)
    pub fn with_listener(mut self, listener: ResponseListener) -> Self {
        self.listener = listener;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Crawls a profile timeline with checkpointing
    ///
    /// # Arguments
    ///
    /// * `session` - A logged-in browser session
    /// * `handle` - Profile handle, with or without `@`
    /// * `options` - Resume flag and session cap override
    ///
    /// # Returns
    ///
    /// The items collected by this invocation. On an aborted scroll the
    /// items are returned with an error and nothing is committed. A failed
    /// commit is reported the same way.
    pub async fn crawl(
        &mut self,
        session: &mut BrowserSession,
        handle: &str,
        options: CrawlOptions,
    ) -> CrawlReport {
        let started = Instant::now();
        let target = handle.trim().trim_start_matches('@').to_string();

        let plan = match self.plan(&target, options.resume) {
            Ok(plan) => plan,
            Err(e) => return CrawlReport::failed(&target, started, e),
        };

        if let Err(e) = session.open_profile(&target).await {
            return CrawlReport::failed(&target, started, e);
        }

        let existing_ids: HashSet<String> = match plan.resume_target {
            Some(_) => plan.archive.iter().map(|item| item.id.clone()).collect(),
            None => HashSet::new(),
        };
        let cap = match options.max_items_per_session {
            Some(0) => None,
            Some(cap) => Some(cap),
            None => self.session_cap,
        };
        let state = SessionState::new(
            plan.resume_target.clone(),
            existing_ids,
            self.overlap_threshold,
            cap,
        );

        let scroller = TimelineScroller::new(&self.listener, self.settings.clone());
        let outcome = scroller.scroll(session, state).await;
        let (mut items, user_summary) = outcome.state.into_parts();
        sort_newest_first(&mut items);

        let mut report = CrawlReport {
            item_count: items.len(),
            stop_reason: Some(outcome.stop_reason),
            user_summary,
            ..CrawlReport::new(&target)
        };

        if outcome.stop_reason.is_abort() {
            tracing::warn!(
                "Session for {} aborted ({}); {} items returned without committing",
                target,
                outcome.stop_reason,
                items.len()
            );
            report.error = outcome.error;
            report.items = items;
            report.elapsed = started.elapsed();
            return report;
        }

        if plan.resume_target.is_some() {
            tracing::info!("Resume session completed: {} new (older) items collected", items.len());
        } else {
            tracing::info!("Fresh crawl completed: {} items collected", items.len());
        }

        match self.commit(&target, plan, &items, report.user_summary.as_ref()) {
            Ok(archive_count) => report.archive_count = archive_count,
            Err(e) => {
                tracing::error!("Failed to persist session for {}: {}", target, e);
                report.error = Some(e);
            }
        }

        report.items = items;
        report.elapsed = started.elapsed();
        report
    }

    /// Loads what the crawl starts from
    ///
    /// A fresh crawl still loads the stored archive so the commit merges
    /// into it rather than replacing it.
    fn plan(&self, target: &str, resume: bool) -> crate::Result<ResumePlan> {
        let previous = self.store.load(target)?;
        let archive = self.store.load_archive(target)?;

        if !resume {
            tracing::info!("Starting fresh crawl for {}", target);
            return Ok(ResumePlan {
                previous,
                archive,
                resume_target: None,
            });
        }

        let checkpoint = match &previous {
            Some(checkpoint) => checkpoint,
            None => {
                tracing::info!("No checkpoint found for {}, starting fresh", target);
                return Ok(ResumePlan {
                    previous,
                    archive,
                    resume_target: None,
                });
            }
        };

        if archive.is_empty() {
            tracing::info!("Archive for {} is empty, starting fresh", target);
            return Ok(ResumePlan {
                previous,
                archive,
                resume_target: None,
            });
        }

        let resume_target = checkpoint.oldest_item_id.clone().or_else(|| {
            crate::model::id_bounds(&archive).map(|(oldest, _)| oldest.id.clone())
        });
        tracing::info!(
            "Resuming {} from item {} with {} archived items",
            target,
            resume_target.as_deref().unwrap_or("?"),
            archive.len()
        );

        Ok(ResumePlan {
            previous,
            archive,
            resume_target,
        })
    }

    /// Merges and persists; returns the archive size
    fn commit(
        &mut self,
        target: &str,
        plan: ResumePlan,
        items: &[Item],
        user_summary: Option<&AuthorSummary>,
    ) -> crate::Result<usize> {
        if items.is_empty() && plan.archive.is_empty() {
            tracing::warn!("Nothing collected for {}, no checkpoint written", target);
            return Ok(0);
        }

        let previous_summary = match user_summary {
            Some(_) => None,
            None => self
                .store
                .load_archive_record(target)?
                .and_then(|archive| archive.user_summary),
        };

        let merged = self.store.merge(plan.archive, items.to_vec());
        let checkpoint = Checkpoint::for_archive(target, &merged, plan.previous.as_ref(), items.len());

        tracing::info!(
            "Saving checkpoint for session #{}: {} new, {} total",
            checkpoint.session_count,
            items.len(),
            merged.len()
        );
        self.store.save_archive(
            target,
            &merged,
            user_summary.or(previous_summary.as_ref()),
            &checkpoint,
        )?;
        self.store.save(target, &checkpoint)?;
        Ok(merged.len())
    }

    /// Scrolls a keyword search; nothing is checkpointed
    ///
    /// A `max_items` of `Some(0)` means unlimited, as for the session cap.
    pub async fn search(
        &self,
        session: &mut BrowserSession,
        query: &str,
        mode: SearchMode,
        max_items: Option<usize>,
    ) -> CrawlReport {
        let started = Instant::now();
        tracing::info!("Starting {} search for '{}'", mode, query);

        match session.open_search(query, mode).await {
            Ok(true) => {}
            Ok(false) => {
                let mut report = CrawlReport::new(query);
                report.elapsed = started.elapsed();
                return report;
            }
            Err(e) => return CrawlReport::failed(query, started, e),
        }

        let max_items = max_items.filter(|&limit| limit > 0);
        let state = SessionState::new(None, HashSet::new(), self.overlap_threshold, max_items);
        let scroller = TimelineScroller::new(&self.listener, self.settings.clone());
        let outcome = scroller.scroll(session, state).await;
        let (mut items, user_summary) = outcome.state.into_parts();
        sort_newest_first(&mut items);

        tracing::info!("Total items collected for '{}': {}", query, items.len());
        CrawlReport {
            target: query.to_string(),
            item_count: items.len(),
            items,
            user_summary,
            archive_count: 0,
            elapsed: started.elapsed(),
            stop_reason: Some(outcome.stop_reason),
            error: outcome.error,
        }
    }

    /// Collects a profile's items range by range through date-bounded searches
    ///
    /// Ids from earlier ranges seed the dedup set of later ones. A range whose
    /// scroll aborts keeps its items and the crawl moves on; a navigation
    /// failure or a rate limit ends the crawl.
    pub async fn crawl_history(
        &self,
        session: &mut BrowserSession,
        handle: &str,
        ranges: &[DateRange],
        max_per_range: Option<usize>,
    ) -> CrawlReport {
        let started = Instant::now();
        let handle = handle.trim().trim_start_matches('@');
        let mut report = CrawlReport::new(handle);
        let mut seen: HashSet<String> = HashSet::new();

        tracing::info!("Searching history for @{} across {} ranges", handle, ranges.len());

        for (index, range) in ranges.iter().enumerate() {
            tracing::info!("[{}/{}] Collecting {}", index + 1, ranges.len(), range);

            let query = history_query(handle, Some(&range.since_param()), Some(&range.until_param()));
            match session.open_search(&query, SearchMode::Latest).await {
                Ok(true) => {
                    let state = SessionState::new(None, seen.clone(), self.overlap_threshold, max_per_range);
                    let scroller = TimelineScroller::new(&self.listener, self.settings.clone());
                    let outcome = scroller.scroll(session, state).await;
                    let rate_limited = outcome.stop_reason == StopReason::RateLimited;
                    if let Some(e) = outcome.error {
                        tracing::warn!("Range {} ended early: {}", range, e);
                        report.error = Some(e);
                    }

                    let (items, user_summary) = outcome.state.into_parts();
                    tracing::info!("Collected {} items from {}", items.len(), range);
                    for item in items {
                        if seen.insert(item.id.clone()) {
                            report.items.push(item);
                        }
                    }
                    if report.user_summary.is_none() {
                        report.user_summary = user_summary;
                    }
                    if rate_limited {
                        tracing::error!("Stopping history crawl at {}: rate limited", range);
                        report.stop_reason = Some(StopReason::RateLimited);
                        break;
                    }
                }
                Ok(false) => tracing::info!("No items in {}", range),
                Err(e) => {
                    tracing::error!("Stopping history crawl at {}: {}", range, e);
                    report.error = Some(e);
                    break;
                }
            }

            tracing::info!("Total unique items so far: {}", report.items.len());
            if index + 1 < ranges.len() && !self.range_delay.is_zero() {
                tracing::info!("Waiting {}s before next range", self.range_delay.as_secs());
                sleep(self.range_delay).await;
            }
        }

        sort_newest_first(&mut report.items);
        report.item_count = report.items.len();
        report.elapsed = started.elapsed();
        report
    }
}
