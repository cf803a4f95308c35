//! Persisting crawled reviews across runs

use crate::common::{titled_references, CountingScraper, FixedVerdict, ScriptedClient};
use cite_ripple::config::SeedEntry;
use cite_ripple::crawler::{CrawlEngine, CrawlSettings, CrawlState};
use cite_ripple::model::{CitationPayload, Work};
use cite_ripple::references::ReferenceExtractor;
use cite_ripple::resolver::{PartialWork, Resolver, ResolverSettings, ScraperRegistry};
use cite_ripple::review::Review;
use cite_ripple::storage::{RunStatus, SqliteStorage, Storage};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn offline_engine(depth_limit: usize) -> CrawlEngine {
    CrawlEngine::new(
        CrawlSettings {
            use_api: false,
            crawl_limit: 50,
            depth_limit,
            ..Default::default()
        },
        Resolver::default(),
        ReferenceExtractor::default(),
    )
}

fn seeded_review() -> Review {
    let mut review = Review::new("persisted");
    let mut seed = Work::from_doi("10.1/seed")
        .with_title("Seed paper")
        .with_author("Ada Lovelace");
    seed.citations_data = titled_references(&["Cited one", "Cited two"]);
    review.add_work(seed);
    review
}

#[tokio::test]
async fn test_crawl_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("review.db");

    let mut review = seeded_review();
    let report = review.crawl(&mut offline_engine(1)).await;
    assert_eq!(report.state, CrawlState::StoppedByLimit);

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        let run_id = storage.create_run("hash-1").unwrap();
        storage.save_review(&review).unwrap();
        storage.complete_run(run_id, &report).unwrap();
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.crawl_state.as_deref(), Some("stopped-by-limit"));
    assert_eq!(run.discovered, 2);

    let loaded = storage.load_review().unwrap();
    assert_eq!(loaded.name, "persisted");
    assert_eq!(loaded.works.len(), 3);
    assert_eq!(loaded.authors.len(), 1);
    assert_eq!(storage.count_citations().unwrap(), 2);

    let ids: Vec<&str> = review.works.ids().collect();
    let loaded_ids: Vec<&str> = loaded.works.ids().collect();
    assert_eq!(ids, loaded_ids);

    let seed = loaded.works.row(0).unwrap();
    assert!(seed.citations.is_resolved());
    assert_eq!(seed.citations.len(), 2);
}

#[tokio::test]
async fn test_resumed_review_extends_table() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("review.db");

    let mut first = seeded_review();
    first.crawl(&mut offline_engine(1)).await;
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    storage.save_review(&first).unwrap();

    let mut resumed = storage.load_review().unwrap();
    let added = resumed.add_seeds(&[
        SeedEntry {
            doi: Some("10.1/seed".to_string()),
            ..Default::default()
        },
        SeedEntry {
            title: Some("A second seed".to_string()),
            date: Some("2010".to_string()),
            ..Default::default()
        },
    ]);
    assert_eq!(added, 1);

    let report = resumed.crawl(&mut offline_engine(2)).await;
    assert_eq!(report.discovered, 0);
    assert_eq!(resumed.works.len(), 4);

    storage.save_review(&resumed).unwrap();
    assert_eq!(storage.count_works().unwrap(), 4);
    assert_eq!(storage.count_citations().unwrap(), 2);
}

#[test]
fn test_interrupted_run_is_visible() {
    let mut storage = SqliteStorage::new_in_memory().unwrap();
    let run_id = storage.create_run("hash-2").unwrap();
    storage
        .update_run_status(run_id, RunStatus::Interrupted)
        .unwrap();

    let run = storage.get_run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
    assert!(run.finished_at.is_none());
}

#[tokio::test]
async fn test_reloaded_review_recrawls_without_duplicates() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("review.db");

    let mut answer = Work::from_doi("10.1/seed").with_title("Seed paper");
    answer.citations_data = CitationPayload::from_json(&json!([{
        "article-title": "Short title",
        "year": "2001",
        "URL": "https://example.com/child"
    }]));
    let client = Arc::new(ScriptedClient::default().with_answer("10.1/seed", answer));
    let scraper = Arc::new(CountingScraper::returning(PartialWork {
        title: Some("Short title: the extended version".to_string()),
        ..Default::default()
    }));
    let online_engine = || {
        CrawlEngine::new(
            CrawlSettings {
                crawl_limit: 10,
                depth_limit: 2,
                ..Default::default()
            },
            Resolver::new(ResolverSettings::default())
                .with_client(client.clone())
                .with_scrapers(ScraperRegistry::new(scraper.clone()))
                .with_politeness(Arc::new(FixedVerdict(true))),
            ReferenceExtractor::default(),
        )
    };

    let mut review = Review::new("resumed");
    review.add_work(Work::from_doi("10.1/seed"));
    review.crawl(&mut online_engine()).await;
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    storage.save_review(&review).unwrap();
    assert_eq!(storage.count_works().unwrap(), 2);
    assert_eq!(storage.count_citations().unwrap(), 1);

    let mut reloaded = storage.load_review().unwrap();
    let report = reloaded.crawl(&mut online_engine()).await;
    assert_eq!(report.discovered, 0);
    assert_eq!(reloaded.works.len(), 2);

    storage.save_review(&reloaded).unwrap();
    assert_eq!(storage.count_works().unwrap(), 2);
    assert_eq!(storage.count_citations().unwrap(), 1);
}
