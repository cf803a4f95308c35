//! End-to-end crawl scenarios with in-memory collaborators

use crate::common::{
    doi_references, titled_references, CountingScraper, FixedVerdict, ScriptedClient,
};
use cite_ripple::crawler::{CrawlEngine, CrawlSettings, CrawlState};
use cite_ripple::model::{CitationPayload, Work};
use cite_ripple::references::ReferenceExtractor;
use cite_ripple::registry::Works;
use cite_ripple::resolver::{
    PartialWork, ResolveOutcome, Resolver, ResolverSettings, ScraperRegistry,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn create_test_settings(crawl_limit: usize, depth_limit: usize) -> CrawlSettings {
    CrawlSettings {
        use_api: true,
        crawl_limit,
        depth_limit,
        ..Default::default()
    }
}

fn engine_with_client(client: Arc<ScriptedClient>, settings: CrawlSettings) -> CrawlEngine {
    let resolver = Resolver::new(ResolverSettings::default()).with_client(client);
    CrawlEngine::new(settings, resolver, ReferenceExtractor::default())
}

#[tokio::test]
async fn test_pure_seed_crawl() {
    let mut answer = Work::from_doi("10.1/example")
        .with_title("An example of rippling citations")
        .with_date("2020");
    answer.citations_data = titled_references(&["Older work one", "Older work two"]);
    let client = Arc::new(ScriptedClient::default().with_answer("10.1/example", answer));

    let mut works: Works = [Work::from_doi("10.1/example")].into_iter().collect();
    let mut engine = engine_with_client(client.clone(), create_test_settings(5, 1));
    let report = engine.crawl(&mut works).await;

    assert_eq!(client.calls(), vec!["10.1/example".to_string()]);
    assert_eq!(report.visited, 1);
    assert_eq!(works.len(), 3);
    assert_eq!(report.discovered, 2);

    let seed = works.row(0).unwrap();
    assert_eq!(seed.title.as_deref(), Some("An example of rippling citations"));
    assert_eq!(seed.citations.len(), 2);

    let child_ids: Vec<&str> = works.ids().skip(1).collect();
    assert_eq!(child_ids.len(), 2);
    assert_ne!(child_ids[0], child_ids[1]);
    assert!(child_ids.iter().all(|id| id.starts_with("W:")));

    // Children have neither DOI nor link, so cleanup has nothing to fetch
    assert_eq!(report.outcome_count(ResolveOutcome::ApiLookup), 1);
    assert_eq!(report.outcome_count(ResolveOutcome::NoInformation), 2);
    assert_eq!(report.cleanup_resolved, 0);
}

#[tokio::test]
async fn test_link_only_seed_denied_by_politeness() {
    let scraper = Arc::new(CountingScraper::returning(PartialWork {
        title: Some("Should never be read".to_string()),
        ..Default::default()
    }));
    let resolver = Resolver::new(ResolverSettings::default())
        .with_scrapers(ScraperRegistry::new(scraper.clone()))
        .with_politeness(Arc::new(FixedVerdict(false)));
    let mut engine = CrawlEngine::new(
        create_test_settings(5, 1),
        resolver,
        ReferenceExtractor::default(),
    );

    let mut works: Works = [Work::from_link("https://example.com/paper")]
        .into_iter()
        .collect();
    let before = works.row(0).unwrap().clone();
    let report = engine.crawl(&mut works).await;

    assert_eq!(scraper.call_count(), 0);
    assert_eq!(report.visited, 1);
    assert_eq!(report.outcome_count(ResolveOutcome::Denied), 1);
    assert_eq!(works.len(), 1);
    assert_eq!(report.state, CrawlState::Exhausted);

    let after = works.row(0).unwrap();
    assert_eq!(after.title, before.title);
    assert_eq!(after.link, before.link);
}

#[tokio::test]
async fn test_polite_scrape_when_allowed() {
    let scraper = Arc::new(CountingScraper::returning(PartialWork {
        title: Some("A scraped title".to_string()),
        date: Some("2018".to_string()),
        ..Default::default()
    }));
    let resolver = Resolver::new(ResolverSettings::default())
        .with_scrapers(ScraperRegistry::new(scraper.clone()))
        .with_politeness(Arc::new(FixedVerdict(true)));
    let mut engine = CrawlEngine::new(
        create_test_settings(5, 1),
        resolver,
        ReferenceExtractor::default(),
    );

    let mut works: Works = [Work::from_link("https://example.com/paper")]
        .into_iter()
        .collect();
    let report = engine.crawl(&mut works).await;

    assert_eq!(scraper.call_count(), 1);
    assert_eq!(report.outcome_count(ResolveOutcome::GenericScrape), 1);
    assert_eq!(works.row(0).unwrap().title.as_deref(), Some("A scraped title"));
}

#[tokio::test]
async fn test_malformed_citation_payload() {
    let mut seed = Work::from_doi("10.1/malformed").with_title("Broken references");
    seed.citations_data = CitationPayload::from_json(&Value::Null);
    assert_eq!(seed.citations_data, CitationPayload::Empty);

    let mut works: Works = [seed].into_iter().collect();
    let mut engine = CrawlEngine::new(
        CrawlSettings {
            use_api: false,
            ..create_test_settings(5, 2)
        },
        Resolver::default(),
        ReferenceExtractor::default(),
    );
    let report = engine.crawl(&mut works).await;

    assert_eq!(works.len(), 1);
    assert_eq!(report.discovered, 0);
    assert_eq!(report.visited, 1);
    assert_eq!(works.row(0).unwrap().citations.len(), 0);
}

#[tokio::test]
async fn test_depth_limit_leaves_grandchildren_unresolved() {
    let mut seed = Work::from_doi("10.1/seed").with_title("Seed");
    seed.citations_data = doi_references(&["10.1/child"]);
    let mut child = Work::from_doi("10.1/child").with_title("Child");
    child.citations_data = doi_references(&["10.1/grandchild"]);

    let client = Arc::new(
        ScriptedClient::default()
            .with_answer("10.1/seed", seed)
            .with_answer("10.1/child", child)
            .with_answer("10.1/grandchild", Work::from_doi("10.1/grandchild").with_title("Grandchild")),
    );

    let mut works: Works = [Work::from_doi("10.1/seed")].into_iter().collect();
    let mut engine = engine_with_client(client.clone(), create_test_settings(10, 1));
    let report = engine.crawl(&mut works).await;

    // The child is resolved by the cleanup pass; its own references are not followed
    assert_eq!(
        client.calls(),
        vec!["10.1/seed".to_string(), "10.1/child".to_string()]
    );
    assert_eq!(works.len(), 2);
    assert!(works
        .rows()
        .all(|row| row.doi.as_deref() != Some("10.1/grandchild")));
    assert_eq!(report.visited, 1);
    assert_eq!(report.cleanup_resolved, 1);
    assert_eq!(report.state, CrawlState::StoppedByLimit);
    assert_eq!(works.row(1).unwrap().title.as_deref(), Some("Child"));
}

#[tokio::test]
async fn test_second_wave_follows_children() {
    let mut seed = Work::from_doi("10.1/seed").with_title("Seed");
    seed.citations_data = doi_references(&["10.1/child"]);
    let child = Work::from_doi("10.1/child").with_title("Child");

    let client = Arc::new(
        ScriptedClient::default()
            .with_answer("10.1/seed", seed)
            .with_answer("10.1/child", child),
    );

    let mut works: Works = [Work::from_doi("10.1/seed")].into_iter().collect();
    let mut engine = engine_with_client(client.clone(), create_test_settings(10, 2));
    let report = engine.crawl(&mut works).await;

    // The second wave spans the two rows present when it opened, so it stays open
    assert_eq!(report.visited, 2);
    assert_eq!(report.waves, 1);
    assert_eq!(report.cleanup_resolved, 0);
    assert_eq!(report.state, CrawlState::Exhausted);
}

#[tokio::test]
async fn test_failed_lookup_without_scrapers_keeps_record() {
    let client = Arc::new(ScriptedClient::default());
    let mut works: Works = [Work::from_doi("10.1/missing").with_title("Kept as is")]
        .into_iter()
        .collect();
    let mut engine = engine_with_client(client.clone(), create_test_settings(5, 1));
    let report = engine.crawl(&mut works).await;

    assert_eq!(client.calls().len(), 1);
    assert_eq!(report.outcome_count(ResolveOutcome::Failed), 1);

    let row = works.row(0).unwrap();
    assert_eq!(row.title.as_deref(), Some("Kept as is"));
    assert_eq!(row.link.as_deref(), Some("https://doi.org/10.1/missing"));
}

#[tokio::test]
async fn test_repeated_crawl_does_not_duplicate_rows() {
    let mut seed = Work::from_doi("10.1/seed").with_title("Seed");
    seed.citations_data = titled_references(&["Cited once", "Cited twice"]);
    let mut works: Works = [seed].into_iter().collect();

    let mut engine = CrawlEngine::new(
        CrawlSettings {
            use_api: false,
            ..create_test_settings(10, 3)
        },
        Resolver::default(),
        ReferenceExtractor::default(),
    );

    engine.crawl(&mut works).await;
    assert_eq!(works.len(), 3);

    let second = engine.crawl(&mut works).await;
    assert_eq!(works.len(), 3);
    assert_eq!(second.discovered, 0);
    assert_eq!(second.visited, 3);
}

#[tokio::test]
async fn test_repeated_crawl_keeps_enriched_children() {
    let mut seed = Work::from_doi("10.1/seed").with_title("Seed");
    seed.citations_data = CitationPayload::from_json(&json!([{
        "article-title": "Short title",
        "year": "2001",
        "URL": "https://example.com/child"
    }]));
    let client = Arc::new(ScriptedClient::default().with_answer("10.1/seed", seed));
    let scraper = Arc::new(CountingScraper::returning(PartialWork {
        title: Some("Short title: the extended version".to_string()),
        ..Default::default()
    }));
    let resolver = Resolver::new(ResolverSettings::default())
        .with_client(client.clone())
        .with_scrapers(ScraperRegistry::new(scraper.clone()))
        .with_politeness(Arc::new(FixedVerdict(true)));
    let mut engine = CrawlEngine::new(
        create_test_settings(10, 2),
        resolver,
        ReferenceExtractor::default(),
    );

    let mut works: Works = [Work::from_doi("10.1/seed")].into_iter().collect();
    let first = engine.crawl(&mut works).await;
    assert_eq!(first.discovered, 1);
    assert_eq!(works.len(), 2);
    assert_eq!(
        works.row(1).unwrap().title.as_deref(),
        Some("Short title: the extended version")
    );
    let ids_after_first: Vec<String> = works.ids().map(str::to_string).collect();

    let second = engine.crawl(&mut works).await;
    assert_eq!(second.discovered, 0);
    assert_eq!(second.visited, 2);
    assert_eq!(works.len(), 2);
    assert_eq!(scraper.call_count(), 2);

    let ids_after_second: Vec<String> = works.ids().map(str::to_string).collect();
    assert_eq!(ids_after_first, ids_after_second);

    // The seed now points at the child's current row
    let CitationPayload::Resolved(cited) = &works.row(0).unwrap().citations else {
        panic!("seed citations should be resolved");
    };
    assert_eq!(cited.len(), 1);
    assert!(cited.contains(&ids_after_second[1]));
}
