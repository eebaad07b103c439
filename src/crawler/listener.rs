//! Captured response handling
//!
//! The listener sits between the browser's response stream and the session
//! state. For every captured response it:
//! - Keeps only allow-listed endpoints carrying a JSON content type
//! - Counts rate-limited (HTTP 429) responses instead of decoding them
//! - Decodes the body
//! - Routes the payload to the extractor
//! - Hands each extracted item to [`SessionState::ingest`]
//!
//! Nothing here returns an error. Bad bodies are logged and dropped so one
//! malformed response never interrupts the scroll loop. Rate limiting is
//! only reported; the scroller decides to stop on it.

use crate::browser::CapturedResponse;
use crate::crawler::extractor::{PayloadExtractor, TimelineExtractor};
use crate::state::{Ingest, SessionState};
use crate::url::{graphql_operation, is_data_content_type, match_endpoint};
use serde_json::Value;

/// Status the site answers with once the account is throttled
pub const RATE_LIMIT_STATUS: u16 = 429;

/// Tally of one batch of handled responses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Responses that passed the endpoint and content-type filter
    pub responses: usize,
    pub appended: usize,
    pub duplicates: usize,
    /// Items already in the archive
    pub existing: usize,
    /// Items not older than the confirmed resume anchor
    pub newer: usize,
    /// New items dropped at the session cap
    pub dropped: usize,
    /// The resume point was confirmed while handling this batch
    pub overlap_confirmed: bool,
    pub decode_failures: usize,
    /// Data responses answered with HTTP 429
    pub rate_limited: usize,
}

impl IngestReport {
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited > 0
    }
}

/// Routes captured responses into a [`SessionState`]
pub struct ResponseListener {
    extractor: Box<dyn PayloadExtractor>,
}

impl Default for ResponseListener {
    fn default() -> Self {
        Self::new(Box::new(TimelineExtractor))
    }
}

impl ResponseListener {
    pub fn new(extractor: Box<dyn PayloadExtractor>) -> Self {
        Self { extractor }
    }

    /// Handles a batch of responses in arrival order
    pub fn ingest(
        &self,
        responses: Vec<CapturedResponse>,
        state: &mut SessionState,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        for response in responses {
            self.handle(&response, state, &mut report);
        }
        report
    }

    /// Handles one response
    ///
    /// Returns without touching `state` when the response is filtered out or
    /// its body cannot be decoded.
    pub fn handle(
        &self,
        response: &CapturedResponse,
        state: &mut SessionState,
        report: &mut IngestReport,
    ) {
        let endpoint = match match_endpoint(&response.url) {
            Some(endpoint) => endpoint,
            None => return,
        };
        if !is_data_content_type(&response.content_type) {
            tracing::trace!(
                "Ignoring non-JSON {} response ({})",
                endpoint,
                response.content_type
            );
            return;
        }

        if response.status == RATE_LIMIT_STATUS {
            report.rate_limited += 1;
            tracing::warn!("{} response was rate limited (HTTP {})", endpoint, response.status);
            return;
        }

        report.responses += 1;
        tracing::debug!(
            "Intercepted {} response: {}",
            response.resource_type,
            graphql_operation(&response.url).unwrap_or(endpoint.fragment())
        );

        let payload: Value = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(e) => {
                report.decode_failures += 1;
                tracing::warn!("Failed to decode {} response: {}", endpoint, e);
                return;
            }
        };

        let extraction = match self.extractor.extract(endpoint, &payload) {
            Some(extraction) => extraction,
            None => return,
        };

        if let Some(user) = extraction.user {
            if endpoint.is_profile() {
                state.set_user_summary(user);
            }
        }

        for item in extraction.items {
            match state.ingest(item) {
                Ingest::Appended => report.appended += 1,
                Ingest::Duplicate => report.duplicates += 1,
                Ingest::Existing => report.existing += 1,
                Ingest::Newer => report.newer += 1,
                Ingest::CapReached => report.dropped += 1,
                Ingest::OverlapConfirmed => {
                    report.existing += 1;
                    report.overlap_confirmed = true;
                }
            }
        }
    }
}
