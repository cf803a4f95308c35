//! Crossref client, robots.txt checker and scrapers against mock servers

use crate::common::create_test_user_agent;
use cite_ripple::crawler::{CrawlEngine, CrawlSettings};
use cite_ripple::model::{CitationPayload, Work, WorkType};
use cite_ripple::references::ReferenceExtractor;
use cite_ripple::registry::Works;
use cite_ripple::resolver::{
    BibliographicClient, FetchError, LookupError, PolitenessChecker, ResolveOutcome, Resolver,
    ResolverSettings, SiteScraper,
};
use cite_ripple::robots::RobotsChecker;
use cite_ripple::sources::{
    build_http_client, build_scraper_client, build_scraper_registry, CrossrefClient,
    GenericScraper, MetaTagScraper,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Ripples | Journal of Crawls</title>
    <meta name="citation_title" content="Ripples in citation graphs">
    <meta name="citation_author" content="Lovelace, Ada">
    <meta name="citation_author" content="Babbage, Charles">
    <meta name="citation_publication_date" content="2021/04/01">
    <meta name="citation_journal_title" content="Journal of Crawls">
    <meta name="citation_doi" content="10.5555/ripples">
    <meta name="citation_reference" content="citation_title=An older study; citation_year=1999">
    <meta name="citation_reference" content="citation_title=A survey of surveys; citation_author=Smith, J; citation_year=2005">
</head>
<body><p>Article body</p></body>
</html>"#;

const BLOG_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Notes on crawling</title>
    <meta property="og:title" content="Notes on polite crawling">
    <meta name="description" content="A short post">
</head>
<body><a href="https://doi.org/10.5555/cited">cited paper</a></body>
</html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

// ===== Crossref =====

#[tokio::test]
async fn test_crossref_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works/10.1/example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "message": {
                "DOI": "10.1/example",
                "title": ["An example of rippling citations"],
                "author": [{"given": "Ada", "family": "Lovelace"}],
                "issued": {"date-parts": [[2020, 2]]},
                "container-title": ["Journal of Crawls"],
                "type": "journal-article",
                "reference": [
                    {"key": "r1", "DOI": "10.1/older"},
                    {"key": "r2", "unstructured": "Smith J. A survey of surveys. 2005."}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CrossrefClient::new(&server.uri(), &create_test_user_agent()).unwrap();
    let work = client.lookup_by_doi("10.1/example", TIMEOUT).await.unwrap();

    assert_eq!(work.title.as_deref(), Some("An example of rippling citations"));
    assert_eq!(work.date.as_deref(), Some("2020-02"));
    assert_eq!(work.source.as_deref(), Some("Journal of Crawls"));
    assert_eq!(work.work_type, Some(WorkType::Article));
    assert_eq!(work.authors[0].family_name.as_deref(), Some("Lovelace"));
    assert!(matches!(work.citations_data, CitationPayload::Structured(ref r) if r.len() == 2));
}

#[tokio::test]
async fn test_crossref_accepts_resolver_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works/10.1/example"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"title": ["Prefixed"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CrossrefClient::new(&server.uri(), &create_test_user_agent()).unwrap();
    let work = client
        .lookup_by_doi("https://doi.org/10.1/example", TIMEOUT)
        .await
        .unwrap();
    assert_eq!(work.doi.as_deref(), Some("10.1/example"));
}

#[tokio::test]
async fn test_crossref_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works/10.1/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = CrossrefClient::new(&server.uri(), &create_test_user_agent()).unwrap();
    let result = client.lookup_by_doi("10.1/missing", TIMEOUT).await;
    assert!(matches!(result, Err(LookupError::NotFound { .. })));
}

#[tokio::test]
async fn test_crossref_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = CrossrefClient::new(&server.uri(), &create_test_user_agent()).unwrap();
    let result = client.lookup_by_doi("10.1/busy", TIMEOUT).await;
    assert!(matches!(result, Err(LookupError::Status { status: 503 })));
}

#[tokio::test]
async fn test_crossref_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = CrossrefClient::new(&server.uri(), &create_test_user_agent()).unwrap();
    let result = client.lookup_by_doi("10.1/garbled", TIMEOUT).await;
    assert!(matches!(result, Err(LookupError::Parse(_))));
}

// ===== robots.txt =====

#[tokio::test]
async fn test_robots_disallow_and_allow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let checker = RobotsChecker::new(reqwest::Client::new(), "TestBot");
    let base = server.uri();

    assert!(!checker.may_fetch(&format!("{}/private/paper", base)).await);
    assert!(checker.may_fetch(&format!("{}/public/paper", base)).await);
    assert_eq!(checker.cached_origins().await, 1);
}

#[tokio::test]
async fn test_robots_agent_specific_group() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        "User-agent: TestBot\nDisallow: /\n\nUser-agent: *\nAllow: /\n",
    )
    .await;

    let checker = RobotsChecker::new(reqwest::Client::new(), "TestBot");
    assert!(!checker.may_fetch(&format!("{}/paper", server.uri())).await);

    let other = RobotsChecker::new(reqwest::Client::new(), "OtherBot");
    assert!(other.may_fetch(&format!("{}/paper", server.uri())).await);
}

#[tokio::test]
async fn test_robots_server_error_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let checker = RobotsChecker::new(reqwest::Client::new(), "TestBot");
    assert!(checker.may_fetch(&format!("{}/anything", server.uri())).await);
}

#[tokio::test]
async fn test_robots_missing_file_fails_open() {
    let server = MockServer::start().await;

    let checker = RobotsChecker::new(reqwest::Client::new(), "TestBot");
    assert!(checker.may_fetch(&format!("{}/anything", server.uri())).await);
}

// ===== Scrapers =====

#[tokio::test]
async fn test_meta_tag_scraper() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(ARTICLE_HTML))
        .mount(&server)
        .await;

    let client = build_http_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let scraper = MetaTagScraper::new(client);
    let url = format!("{}/article", server.uri());
    let partial = scraper.scrape(&url).await.unwrap();

    assert_eq!(partial.title.as_deref(), Some("Ripples in citation graphs"));
    assert_eq!(partial.authors, vec!["Lovelace, Ada", "Babbage, Charles"]);
    assert_eq!(partial.date.as_deref(), Some("2021-04-01"));
    assert_eq!(partial.doi.as_deref(), Some("10.5555/ripples"));
    assert_eq!(partial.source.as_deref(), Some("Journal of Crawls"));
    assert_eq!(partial.references.len(), 2);
    assert_eq!(partial.link.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn test_generic_scraper() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/post"))
        .respond_with(html(BLOG_HTML))
        .mount(&server)
        .await;

    let client = build_http_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let scraper = GenericScraper::new(client);
    let partial = scraper
        .scrape(&format!("{}/blog/post", server.uri()))
        .await
        .unwrap();

    assert_eq!(partial.title.as_deref(), Some("Notes on polite crawling"));
    // The anchor names a cited paper, not this post
    assert_eq!(partial.doi, None);
}

#[tokio::test]
async fn test_scraper_rejects_non_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paper.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.7", "application/pdf"))
        .mount(&server)
        .await;

    let client = build_http_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let scraper = GenericScraper::new(client);
    let result = scraper.scrape(&format!("{}/paper.pdf", server.uri())).await;
    assert!(matches!(result, Err(FetchError::ContentMismatch { .. })));
}

#[tokio::test]
async fn test_scraper_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = build_http_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let scraper = GenericScraper::new(client);
    let result = scraper.scrape(&format!("{}/gone", server.uri())).await;
    assert!(matches!(result, Err(FetchError::HttpStatus { status: 404 })));
}

#[tokio::test]
async fn test_scraper_follows_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doi/10.5555/ripples"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/article"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(ARTICLE_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_scraper_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let scraper = MetaTagScraper::new(client);
    let partial = scraper
        .scrape(&format!("{}/doi/10.5555/ripples", server.uri()))
        .await
        .unwrap();

    assert_eq!(partial.title.as_deref(), Some("Ripples in citation graphs"));
    let expected = format!("{}/article", server.uri());
    assert_eq!(partial.link.as_deref(), Some(expected.as_str()));
}

#[tokio::test]
async fn test_scraper_checks_redirect_target_against_robots() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;
    Mock::given(method("GET"))
        .and(path("/doi/10.5555/ripples"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/private/article"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/article"))
        .respond_with(html(ARTICLE_HTML))
        .expect(0)
        .mount(&server)
        .await;

    let http = build_http_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let robots = Arc::new(RobotsChecker::new(http, "TestBot"));
    let client = build_scraper_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let scraper = GenericScraper::new(client).with_politeness(robots);

    let result = scraper
        .scrape(&format!("{}/doi/10.5555/ripples", server.uri()))
        .await;
    let expected = format!("{}/private/article", server.uri());
    assert!(matches!(result, Err(FetchError::Disallowed { url }) if url == expected));
}

// ===== Crawl over HTTP =====

fn polite_resolver(server: &MockServer) -> Resolver {
    let client = build_http_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let api: Arc<dyn BibliographicClient> =
        Arc::new(CrossrefClient::new(&server.uri(), &create_test_user_agent()).unwrap());
    let pages = build_scraper_client(&create_test_user_agent(), TIMEOUT).unwrap();
    let robots: Arc<dyn PolitenessChecker> = Arc::new(RobotsChecker::new(client, "TestBot"));

    Resolver::new(ResolverSettings {
        api_timeout: TIMEOUT,
        scrape_timeout: TIMEOUT,
        ..Default::default()
    })
    .with_client(api)
    .with_scrapers(build_scraper_registry(
        &["127.0.0.1".to_string()],
        pages,
        Some(robots.clone()),
    ))
    .with_politeness(robots)
}

#[tokio::test]
async fn test_crawl_scrapes_link_seed() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(html(ARTICLE_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let link = format!("{}/article", server.uri());
    let mut works: Works = [Work::from_link(link.clone())].into_iter().collect();
    let mut engine = CrawlEngine::new(
        CrawlSettings {
            crawl_limit: 5,
            depth_limit: 1,
            ..Default::default()
        },
        polite_resolver(&server),
        ReferenceExtractor::default(),
    );
    let report = engine.crawl(&mut works).await;

    assert_eq!(report.outcome_count(ResolveOutcome::SiteScrape), 1);
    assert_eq!(works.len(), 3);

    let seed = works.row(0).unwrap();
    assert_eq!(seed.title.as_deref(), Some("Ripples in citation graphs"));
    assert_eq!(seed.date.as_deref(), Some("2021-04-01"));
    assert_eq!(seed.doi.as_deref(), Some("10.5555/ripples"));
    assert_eq!(seed.link.as_deref(), Some(link.as_str()));
    assert_eq!(seed.authors.len(), 2);

    let titles: Vec<_> = works.rows().skip(1).filter_map(|w| w.title.clone()).collect();
    assert_eq!(titles, vec!["An older study", "A survey of surveys"]);
}

#[tokio::test]
async fn test_crawl_respects_robots_disallow() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;
    Mock::given(method("GET"))
        .and(path("/private/article"))
        .respond_with(html(ARTICLE_HTML))
        .expect(0)
        .mount(&server)
        .await;

    let mut works: Works = [Work::from_link(format!("{}/private/article", server.uri()))]
        .into_iter()
        .collect();
    let mut engine = CrawlEngine::new(
        CrawlSettings {
            crawl_limit: 5,
            depth_limit: 1,
            ..Default::default()
        },
        polite_resolver(&server),
        ReferenceExtractor::default(),
    );
    let report = engine.crawl(&mut works).await;

    assert_eq!(report.outcome_count(ResolveOutcome::Denied), 1);
    assert_eq!(works.len(), 1);
    assert!(works.row(0).unwrap().title.is_none());
}

#[tokio::test]
async fn test_crawl_denies_disallowed_redirect() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/private/article"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/article"))
        .respond_with(html(ARTICLE_HTML))
        .expect(0)
        .mount(&server)
        .await;

    let link = format!("{}/landing", server.uri());
    let mut works: Works = [Work::from_link(link.clone())].into_iter().collect();
    let mut engine = CrawlEngine::new(
        CrawlSettings {
            crawl_limit: 5,
            depth_limit: 1,
            ..Default::default()
        },
        polite_resolver(&server),
        ReferenceExtractor::default(),
    );
    let report = engine.crawl(&mut works).await;

    assert_eq!(report.outcome_count(ResolveOutcome::Denied), 1);
    assert_eq!(works.len(), 1);
    assert_eq!(works.row(0).unwrap().link.as_deref(), Some(link.as_str()));
    assert!(works.row(0).unwrap().title.is_none());
}

#[tokio::test]
async fn test_crawl_cleanup_resolves_children_by_doi() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/works/10.1/seed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "DOI": "10.1/seed",
                "title": ["Seed paper"],
                "reference": [{"DOI": "10.1/child-a"}, {"DOI": "10.1/child-b"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/10.1/child-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"DOI": "10.1/child-a", "title": ["First child"]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/works/10.1/child-b"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let api = Arc::new(CrossrefClient::new(&server.uri(), &create_test_user_agent()).unwrap());
    let resolver = Resolver::new(ResolverSettings::default()).with_client(api);
    let mut engine = CrawlEngine::new(
        CrawlSettings {
            crawl_limit: 5,
            depth_limit: 1,
            ..Default::default()
        },
        resolver,
        ReferenceExtractor::default(),
    );

    let mut works: Works = [Work::from_doi("10.1/seed")].into_iter().collect();
    let report = engine.crawl(&mut works).await;

    assert_eq!(report.visited, 1);
    assert_eq!(works.len(), 3);
    assert_eq!(report.cleanup_resolved, 1);
    assert_eq!(report.outcome_count(ResolveOutcome::Failed), 1);

    let first = works.rows().find(|w| w.doi.as_deref() == Some("10.1/child-a")).unwrap();
    assert_eq!(first.title.as_deref(), Some("First child"));
}
