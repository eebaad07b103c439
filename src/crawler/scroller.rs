//! Scroll-driven pagination loop
//!
//! The timeline exposes no usable cursor, so pagination means scrolling the
//! page and waiting for the responses it triggers. Each iteration scrolls one
//! step, sleeps a jittered delay, drains captured responses into the session
//! state and then evaluates the stop conditions in a fixed order.
//!
//! The loop aborts when nothing is ever extracted, when the resume point never
//! shows up, when it stalls for too long with nothing to show, or as soon as
//! the site answers a data request with HTTP 429. An abort still hands back
//! whatever was collected, together with an error.

use crate::browser::BrowserSession;
use crate::config::{ScrapingConfig, TimeoutConfig};
use crate::crawler::listener::{IngestReport, ResponseListener};
use crate::state::SessionState;
use crate::HarvestError;
use rand::Rng;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Scrolls down by most of a viewport
pub const SCROLL_STEP_SCRIPT: &str = "window.scrollBy(0, window.innerHeight * 0.8); return null;";

/// True when the viewport is within 100px of the document end
pub const AT_BOTTOM_SCRIPT: &str =
    "return window.innerHeight + window.scrollY >= document.body.scrollHeight - 100;";

pub const JUMP_TOP_SCRIPT: &str = "window.scrollTo(0, 0); return null;";

pub const JUMP_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight); return null;";

/// Why the scroll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No new items for too long after the resume point was confirmed
    Exhausted,
    /// The session cap was reached
    SessionCap,
    /// The page end was reached with no new items
    ReachedEnd,
    /// The iteration ceiling was hit
    IterationLimit,
    /// Nothing was extracted after the minimum number of attempts
    ZeroProgress,
    /// The resume anchor never came into view
    ResumePointNotFound,
    /// Nothing was extracted before the stall timeout
    StallTimeout,
    /// The browser failed mid-loop
    Interrupted,
    /// A data response came back rate limited
    RateLimited,
}

impl StopReason {
    /// Returns true if the session must not be committed
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            Self::ZeroProgress
                | Self::ResumePointNotFound
                | Self::StallTimeout
                | Self::Interrupted
                | Self::RateLimited
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::SessionCap => "session-cap",
            Self::ReachedEnd => "reached-end",
            Self::IterationLimit => "iteration-limit",
            Self::ZeroProgress => "zero-progress",
            Self::ResumePointNotFound => "resume-point-not-found",
            Self::StallTimeout => "stall-timeout",
            Self::Interrupted => "interrupted",
            Self::RateLimited => "rate-limited",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Loop tuning, resolved from the `[scraping]` and `[timeouts]` sections
#[derive(Debug, Clone)]
pub struct ScrollSettings {
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub max_scroll_attempts: u32,
    pub max_attempts_without_new: u32,
    pub zero_progress_attempts: u32,
    pub resume_search_attempts: u32,
    pub bottom_stall_attempts: u32,
    pub stall_timeout: Duration,
    /// Suggested wait reported when the site rate-limits the loop
    pub rate_limit_wait: Duration,
    /// Iterations between top/bottom refreshes (0 = never)
    pub refresh_every: u32,
    /// Iterations between progress logs (0 = never)
    pub progress_every: u32,
    pub refresh_short_delay_ms: u64,
    pub refresh_long_delay_ms: u64,
}

impl ScrollSettings {
    pub fn from_config(scraping: &ScrapingConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            delay_min_ms: scraping.scroll_delay_min_ms,
            delay_max_ms: scraping.scroll_delay_max_ms,
            max_scroll_attempts: scraping.max_scroll_attempts,
            max_attempts_without_new: scraping.max_attempts_without_new,
            zero_progress_attempts: scraping.zero_progress_attempts,
            resume_search_attempts: scraping.resume_search_attempts,
            bottom_stall_attempts: scraping.bottom_stall_attempts,
            stall_timeout: Duration::from_secs(scraping.stall_timeout_secs),
            rate_limit_wait: Duration::from_secs(scraping.rate_limit_wait_secs),
            refresh_every: scraping.refresh_every,
            progress_every: scraping.progress_every,
            refresh_short_delay_ms: timeouts.refresh_short_delay,
            refresh_long_delay_ms: timeouts.refresh_long_delay,
        }
    }

    /// Uniformly random delay within the configured window
    fn jitter(&self) -> Duration {
        let min = self.delay_min_ms.min(self.delay_max_ms);
        let max = self.delay_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Result of one scroll session
#[derive(Debug)]
pub struct ScrollOutcome {
    /// Final session state; consume with [`SessionState::into_parts`]
    pub state: SessionState,
    pub stop_reason: StopReason,
    pub iterations: u32,
    pub elapsed: Duration,
    /// Set when the loop aborted
    pub error: Option<HarvestError>,
}

/// Drives one scroll session against an open page
pub struct TimelineScroller<'a> {
    listener: &'a ResponseListener,
    settings: ScrollSettings,
}

impl<'a> TimelineScroller<'a> {
    pub fn new(listener: &'a ResponseListener, settings: ScrollSettings) -> Self {
        Self { listener, settings }
    }

    pub fn settings(&self) -> &ScrollSettings {
        &self.settings
    }

    /// Scrolls until a stop condition holds
    ///
    /// # Arguments
    ///
    /// * `session` - A browser session already showing the timeline
    /// * `state` - Fresh per-invocation state carrying the dedup seed and resume anchor
    ///
    /// # Returns
    ///
    /// The state handed back together with why and when the loop stopped.
    /// Browser failures end the loop as [`StopReason::Interrupted`] rather than
    /// being returned, so collected items are never lost.
    pub async fn scroll(&self, session: &mut BrowserSession, mut state: SessionState) -> ScrollOutcome {
        let settings = &self.settings;
        let started = Instant::now();

        match state.resume_target() {
            Some(target) if !state.is_resume_confirmed() => {
                tracing::info!("Resuming: looking for previously collected items older than {}", target);
            }
            _ => tracing::info!("Starting to scroll timeline"),
        }

        // responses captured while the page loaded
        let mut rate_limited = self
            .listener
            .ingest(session.drain_responses(), &mut state)
            .is_rate_limited();

        let mut iterations = 0u32;
        let mut without_new = 0u32;
        let mut error = None;

        let stop_reason = loop {
            if rate_limited {
                tracing::warn!("Rate limited after {} iterations, stopping", iterations);
                break StopReason::RateLimited;
            }
            if iterations >= settings.max_scroll_attempts {
                tracing::warn!("Reached scroll ceiling of {} iterations", settings.max_scroll_attempts);
                break StopReason::IterationLimit;
            }
            iterations += 1;

            let before = state.len();
            let was_confirmed = state.is_resume_confirmed();

            if let Err(e) = session.evaluate(SCROLL_STEP_SCRIPT).await {
                tracing::error!("Scroll step failed: {}", e);
                error = Some(e);
                break StopReason::Interrupted;
            }
            sleep(settings.jitter()).await;
            let report = self.listener.ingest(session.drain_responses(), &mut state);
            if report.is_rate_limited() {
                rate_limited = true;
                continue;
            }

            if !was_confirmed && state.is_resume_confirmed() {
                tracing::info!(
                    "Resume point confirmed after {} overlapping items; continuing into older items",
                    state.overlap_seen()
                );
                without_new = 0;
            } else if state.len() > before {
                tracing::debug!("+{} items (total {})", state.len() - before, state.len());
                without_new = 0;
            } else {
                without_new += 1;
            }

            if let Some(reason) = self.check_stop(session, &state, iterations, without_new, started).await {
                break reason;
            }

            if settings.refresh_every > 0 && iterations % settings.refresh_every == 0 {
                let before = state.len();
                if let Some(report) = self.refresh(session, &mut state).await {
                    rate_limited = report.is_rate_limited();
                    if state.len() > before {
                        without_new = 0;
                    }
                }
            }

            if settings.progress_every > 0 && iterations % settings.progress_every == 0 {
                let secs = started.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} items | {:.0}s elapsed | {:.1} items/sec",
                    state.len(),
                    secs,
                    if secs > 0.0 { state.len() as f64 / secs } else { 0.0 }
                );
            }
        };

        let elapsed = started.elapsed();
        if error.is_none() && stop_reason.is_abort() {
            error = Some(self.abort_error(stop_reason, &state, iterations, elapsed));
        }

        tracing::info!(
            "Scrolling stopped ({}): {} items in {:.1}s over {} iterations",
            stop_reason,
            state.len(),
            elapsed.as_secs_f64(),
            iterations
        );

        ScrollOutcome {
            state,
            stop_reason,
            iterations,
            elapsed,
            error,
        }
    }

    /// Evaluates the stop conditions in priority order
    async fn check_stop(
        &self,
        session: &mut BrowserSession,
        state: &SessionState,
        iterations: u32,
        without_new: u32,
        started: Instant,
    ) -> Option<StopReason> {
        let settings = &self.settings;

        if iterations >= settings.zero_progress_attempts && state.total_extracted() == 0 {
            tracing::error!(
                "No items extracted after {} scroll attempts; the response shape may have changed",
                iterations
            );
            return Some(StopReason::ZeroProgress);
        }

        if !state.is_resume_confirmed() && without_new >= settings.resume_search_attempts {
            tracing::warn!(
                "Resume point {} not found after {} attempts without new items",
                state.resume_target().unwrap_or("?"),
                without_new
            );
            return Some(StopReason::ResumePointNotFound);
        }

        if state.is_resume_confirmed() && without_new >= settings.max_attempts_without_new {
            tracing::info!("No new items after {} attempts, stopping", without_new);
            return Some(StopReason::Exhausted);
        }

        if state.cap_reached() {
            tracing::info!("Reached session limit of {} items", state.len());
            return Some(StopReason::SessionCap);
        }

        if without_new > settings.bottom_stall_attempts && self.at_bottom(session).await {
            tracing::info!("Reached end of timeline");
            return Some(StopReason::ReachedEnd);
        }

        if state.total_extracted() == 0 && started.elapsed() >= settings.stall_timeout {
            tracing::error!(
                "No items extracted after {:.0}s, giving up",
                started.elapsed().as_secs_f64()
            );
            return Some(StopReason::StallTimeout);
        }

        None
    }

    async fn at_bottom(&self, session: &mut BrowserSession) -> bool {
        match session.evaluate(AT_BOTTOM_SCRIPT).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                tracing::debug!("Could not read scroll position: {}", e);
                false
            }
        }
    }

    /// Jumps to the top and back to the bottom to make the page load more
    ///
    /// Returns the tally of responses the maneuver produced, or None if a jump failed.
    async fn refresh(
        &self,
        session: &mut BrowserSession,
        state: &mut SessionState,
    ) -> Option<IngestReport> {
        tracing::debug!("Refreshing timeline position");

        for (script, delay) in [
            (JUMP_TOP_SCRIPT, self.settings.refresh_short_delay_ms),
            (JUMP_BOTTOM_SCRIPT, self.settings.refresh_long_delay_ms),
        ] {
            if let Err(e) = session.evaluate(script).await {
                tracing::debug!("Refresh jump failed: {}", e);
                return None;
            }
            session.pause(delay).await;
        }

        Some(self.listener.ingest(session.drain_responses(), state))
    }

    fn abort_error(
        &self,
        reason: StopReason,
        state: &SessionState,
        iterations: u32,
        elapsed: Duration,
    ) -> HarvestError {
        if reason == StopReason::RateLimited {
            return HarvestError::RateLimited {
                retry_after: self.settings.rate_limit_wait,
            };
        }

        let message = match reason {
            StopReason::ZeroProgress => {
                format!("no items extracted after {} scroll attempts", iterations)
            }
            StopReason::ResumePointNotFound => format!(
                "resume point {} not found after {} scroll attempts",
                state.resume_target().unwrap_or("?"),
                iterations
            ),
            _ => format!("no items extracted after {:.0}s", elapsed.as_secs_f64()),
        };
        HarvestError::Extraction(message)
    }
}
