//! Integration tests for Cite-Ripple
//!
//! Engine scenarios run against in-memory collaborators; the Crossref client,
//! robots.txt checker and scrapers run against wiremock servers.

mod common;
mod crawl_tests;
mod sources_tests;
mod storage_tests;
