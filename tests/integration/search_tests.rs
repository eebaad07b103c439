//! Integration tests for keyword searches and date-ranged history crawls

use crate::support::{fast_config, ScriptedEngine};
use chrono::NaiveDate;
use tempfile::TempDir;
use timeline_harvest::browser::{BrowserSession, ITEM_MARKER};
use timeline_harvest::crawler::{date_ranges, CrawlOrchestrator, RangeChunk, StopReason};
use timeline_harvest::storage::{CheckpointStore, JsonCheckpointStore};
use timeline_harvest::url::SearchMode;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_search_stops_at_limit() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let orchestrator =
        CrawlOrchestrator::new(JsonCheckpointStore::new(&config.output.data_dir), &config);

    let engine = ScriptedEngine::new(5).with_search((1..=9).rev());
    let mut session = BrowserSession::new(Box::new(engine.clone()), &config).unwrap();
    session.initialize().await.unwrap();

    let report = orchestrator
        .search(&mut session, "rust async", SearchMode::Top, Some(4))
        .await;

    assert!(report.is_success());
    assert_eq!(report.stop_reason, Some(StopReason::SessionCap));
    let ids: Vec<&str> = report.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["9", "8", "7", "6"]);
    assert_eq!(report.items[0].author.handle, "someone");

    let url = engine.navigations().pop().unwrap();
    assert!(url.starts_with("https://x.com/search?q=rust+async"));
    assert!(url.ends_with("f=top"));
    assert!(!orchestrator.store().has_checkpoint("rust async"));
}

#[tokio::test]
async fn test_history_deduplicates_across_ranges() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let orchestrator =
        CrawlOrchestrator::new(JsonCheckpointStore::new(&config.output.data_dir), &config);

    let engine = ScriptedEngine::new(5)
        .with_search([50, 40, 30])
        .with_search([30, 20, 10]);
    let mut session = BrowserSession::new(Box::new(engine.clone()), &config).unwrap();
    session.initialize().await.unwrap();

    let ranges = date_ranges(date(2024, 1, 1), date(2024, 3, 1), RangeChunk::Monthly);
    assert_eq!(ranges.len(), 2);

    let report = orchestrator
        .crawl_history(&mut session, "@someone", &ranges, None)
        .await;

    assert!(report.is_success());
    assert_eq!(report.target, "someone");
    let ids: Vec<&str> = report.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["50", "40", "30", "20", "10"]);

    let searches: Vec<String> = engine
        .navigations()
        .into_iter()
        .filter(|url| url.contains("/search?"))
        .collect();
    assert_eq!(searches.len(), 2);
    assert!(searches[0].contains("since%3A2024-01-01"));
    assert!(searches[1].contains("until%3A2024-03-01"));
}

#[tokio::test]
async fn test_history_skips_empty_ranges() {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let orchestrator =
        CrawlOrchestrator::new(JsonCheckpointStore::new(&config.output.data_dir), &config);

    // nothing renders, so every range is skipped without scrolling
    let engine = ScriptedEngine::new(5);
    let mut session = BrowserSession::new(Box::new(engine.clone()), &config).unwrap();
    session.initialize().await.unwrap();
    engine.hide(ITEM_MARKER);

    let ranges = date_ranges(date(2024, 1, 1), date(2024, 1, 22), RangeChunk::Weekly);
    let report = orchestrator
        .crawl_history(&mut session, "someone", &ranges, Some(10))
        .await;

    assert!(report.is_success());
    assert_eq!(report.item_count, 0);
    assert_eq!(engine.navigations().len(), ranges.len());
}
