//! Integration tests for checkpointed profile crawls
//!
//! These tests drive the orchestrator against a scripted browser serving a
//! paged timeline and check what lands on disk between sessions.

use crate::support::{fast_config, ScriptedEngine};
use serde_json::Value;
use tempfile::TempDir;
use timeline_harvest::browser::BrowserSession;
use timeline_harvest::config::Config;
use timeline_harvest::crawler::{
    CrawlOptions, CrawlOrchestrator, CrawlReport, Extraction, PayloadExtractor, ResponseListener,
    StopReason,
};
use timeline_harvest::output::load_statistics;
use timeline_harvest::storage::{CheckpointStore, JsonCheckpointStore};
use timeline_harvest::url::Endpoint;
use timeline_harvest::HarvestError;

async fn open(engine: &ScriptedEngine, config: &Config) -> BrowserSession {
    let mut session = BrowserSession::new(Box::new(engine.clone()), config).unwrap();
    session.initialize().await.unwrap();
    session
}

fn orchestrator(config: &Config) -> CrawlOrchestrator<JsonCheckpointStore> {
    CrawlOrchestrator::new(JsonCheckpointStore::new(&config.output.data_dir), config)
}

fn ids(report: &CrawlReport) -> Vec<u64> {
    report
        .items
        .iter()
        .map(|item| item.id.parse().unwrap())
        .collect()
}

const FRESH: CrawlOptions = CrawlOptions {
    resume: false,
    max_items_per_session: None,
};

const RESUME: CrawlOptions = CrawlOptions {
    resume: true,
    max_items_per_session: None,
};

#[tokio::test]
async fn test_capped_sessions_walk_back_through_timeline() {
    let dir = TempDir::new().unwrap();
    let mut config = fast_config(&dir);
    config.scraping.max_items_per_session = 10;
    let mut orchestrator = orchestrator(&config);

    // newest first: 25, 24, ..., 1
    let timeline = || ScriptedEngine::new(5).with_timeline((1..=25).rev());

    let engine = timeline();
    let mut session = open(&engine, &config).await;
    let first = orchestrator.crawl(&mut session, "someone", FRESH).await;
    assert!(first.is_success());
    assert_eq!(first.stop_reason, Some(StopReason::SessionCap));
    assert_eq!(ids(&first), (16..=25).rev().collect::<Vec<_>>());
    assert_eq!(first.archive_count, 10);

    let engine = timeline();
    let mut session = open(&engine, &config).await;
    let second = orchestrator.crawl(&mut session, "someone", RESUME).await;
    assert!(second.is_success());
    assert_eq!(second.stop_reason, Some(StopReason::SessionCap));
    assert_eq!(ids(&second), (6..=15).rev().collect::<Vec<_>>());
    assert_eq!(second.archive_count, 20);

    let engine = timeline();
    let mut session = open(&engine, &config).await;
    let third = orchestrator.crawl(&mut session, "someone", RESUME).await;
    assert!(third.is_success());
    assert_eq!(third.stop_reason, Some(StopReason::Exhausted));
    assert_eq!(ids(&third), vec![5, 4, 3, 2, 1]);
    assert_eq!(third.archive_count, 25);

    let store = orchestrator.store();
    let checkpoint = store.load("someone").unwrap().unwrap();
    assert_eq!(checkpoint.session_count, 3);
    assert_eq!(checkpoint.total_items, 25);
    assert_eq!(checkpoint.oldest_item_id.as_deref(), Some("1"));
    assert_eq!(checkpoint.newest_item_id.as_deref(), Some("25"));
    assert_eq!(checkpoint.last_session_item_count, 5);

    let archive = store.load_archive("someone").unwrap();
    let archived: Vec<u64> = archive.iter().map(|i| i.id.parse().unwrap()).collect();
    assert_eq!(archived, (1..=25).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_profile_summary_survives_resume() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let mut orchestrator = orchestrator(&config);

    let engine = ScriptedEngine::new(5)
        .with_timeline((1..=8).rev())
        .with_profile("someone", 1200);
    let mut session = open(&engine, &config).await;
    let first = orchestrator.crawl(&mut session, "@someone", FRESH).await;
    assert!(first.is_success());
    let user = first.user_summary.as_ref().unwrap();
    assert_eq!(user.handle, "someone");
    assert_eq!(user.follower_count, 1200);
    assert!(user.verified);

    // four newer posts appeared, and this time the profile response is missed
    let engine = ScriptedEngine::new(5).with_timeline((1..=12).rev());
    let mut session = open(&engine, &config).await;
    let second = orchestrator.crawl(&mut session, "someone", RESUME).await;
    assert!(second.is_success());
    assert!(second.items.is_empty(), "a resume only walks older items");
    assert_eq!(second.archive_count, 8);

    let stats = load_statistics(orchestrator.store(), "someone").unwrap();
    assert_eq!(stats.handle.as_deref(), Some("someone"));
    assert_eq!(stats.followers, Some(1200));
    assert_eq!(stats.total_items, 8);
    assert_eq!(stats.checkpoint.map(|c| c.session_count), Some(2));

    // a fresh crawl picks the newer posts up and merges them in
    let engine = ScriptedEngine::new(5).with_timeline((1..=12).rev());
    let mut session = open(&engine, &config).await;
    let third = orchestrator.crawl(&mut session, "someone", FRESH).await;
    assert_eq!(third.item_count, 12);
    assert_eq!(third.archive_count, 12);
}

#[tokio::test]
async fn test_resume_point_not_found_keeps_previous_commit() {
    let dir = TempDir::new().unwrap();
    let mut config = fast_config(&dir);
    config.scraping.resume_search_attempts = 3;
    let mut orchestrator = orchestrator(&config);

    let engine = ScriptedEngine::new(5).with_timeline((96..=100).rev());
    let mut session = open(&engine, &config).await;
    let first = orchestrator.crawl(&mut session, "someone", FRESH).await;
    assert_eq!(first.archive_count, 5);

    // none of the archived posts are on the page any more
    let engine = ScriptedEngine::new(5).with_timeline((41..=50).rev());
    let mut session = open(&engine, &config).await;
    let second = orchestrator.crawl(&mut session, "someone", RESUME).await;

    assert_eq!(second.stop_reason, Some(StopReason::ResumePointNotFound));
    assert!(matches!(second.error, Some(HarvestError::Extraction(_))));
    assert_eq!(second.item_count, 10, "collected items are still returned");
    assert_eq!(second.archive_count, 0);

    let checkpoint = orchestrator.store().load("someone").unwrap().unwrap();
    assert_eq!(checkpoint.session_count, 1);
    assert_eq!(checkpoint.total_items, 5);
    assert_eq!(orchestrator.store().load_archive("someone").unwrap().len(), 5);
}

struct NullExtractor;

impl PayloadExtractor for NullExtractor {
    fn extract(&self, _endpoint: Endpoint, _payload: &Value) -> Option<Extraction> {
        None
    }
}

#[tokio::test]
async fn test_unrecognized_payloads_abort_with_zero_progress() {
    let dir = TempDir::new().unwrap();
    let mut config = fast_config(&dir);
    config.scraping.zero_progress_attempts = 3;
    let mut orchestrator =
        orchestrator(&config).with_listener(ResponseListener::new(Box::new(NullExtractor)));

    let engine = ScriptedEngine::new(5).with_timeline((1..=20).rev());
    let mut session = open(&engine, &config).await;
    let report = orchestrator.crawl(&mut session, "someone", FRESH).await;

    assert_eq!(report.stop_reason, Some(StopReason::ZeroProgress));
    assert!(!report.is_success());
    assert!(report.items.is_empty());
    assert!(!orchestrator.store().has_checkpoint("someone"));
}

#[tokio::test]
async fn test_cleanup_closes_browser() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let mut orchestrator = orchestrator(&config);

    let engine = ScriptedEngine::new(5).with_timeline((1..=3).rev());
    let mut session = open(&engine, &config).await;
    let report = orchestrator.crawl(&mut session, "someone", FRESH).await;
    session.cleanup().await;

    assert_eq!(report.item_count, 3);
    assert!(engine.is_closed());
    assert_eq!(engine.navigations().last().unwrap(), "https://x.com/someone");
}
