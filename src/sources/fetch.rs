//! HTTP page fetching
//!
//! Builds the HTTP clients with the crawler's user agent and turns request
//! failures into [`FetchError`] variants. Page fetches walk redirects one hop
//! at a time so every hop can be checked against robots.txt.

use crate::config::UserAgentConfig;
use crate::resolver::{FetchError, PolitenessChecker};
use reqwest::{header::LOCATION, redirect::Policy, Client, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Redirect hops followed by [`fetch_page`]
pub const MAX_REDIRECTS: usize = 10;

/// A fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    pub body: String,
}

fn client_builder(config: &UserAgentConfig, timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
}

/// Builds an HTTP client that follows redirects itself
///
/// Used for robots.txt and API requests.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    client_builder(config, timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
}

/// Builds the page scraping client; redirects are left to [`fetch_page`]
pub fn build_scraper_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    client_builder(config, timeout).redirect(Policy::none()).build()
}

/// Fetches an HTML page
///
/// Redirect responses are followed up to [`MAX_REDIRECTS`] hops. With a
/// `gate`, each redirect target is checked before it is requested; the first
/// URL is the caller's to check.
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with an HTML/XML Content-Type | `Ok(FetchedPage)` |
/// | Redirect to a URL the gate refuses | `Disallowed` |
/// | Any other status | `HttpStatus` |
/// | Non-HTML Content-Type | `ContentMismatch` |
/// | Timeout | `Timeout` |
/// | Connection refused / DNS failure | `Unreachable` |
/// | Anything else | `Network` |
pub async fn fetch_page(
    client: &Client,
    url: &str,
    gate: Option<&dyn PolitenessChecker>,
) -> Result<FetchedPage, FetchError> {
    let mut current = url.to_string();
    let mut hops = 0;

    let response = loop {
        let response = client.get(current.as_str()).send().await.map_err(classify)?;
        let Some(next) = redirect_target(&response) else {
            break response;
        };
        if hops == MAX_REDIRECTS {
            return Err(FetchError::Network(format!("too many redirects from {}", url)));
        }
        hops += 1;

        if let Some(gate) = gate {
            if !gate.may_fetch(next.as_str()).await {
                return Err(FetchError::Disallowed {
                    url: next.to_string(),
                });
            }
        }
        debug!("{} redirects to {}", current, next);
        current = next.to_string();
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    if !content_type.is_empty() && !content_type.contains("html") && !content_type.contains("xml") {
        return Err(FetchError::ContentMismatch { content_type });
    }

    let body = response.text().await.map_err(classify)?;

    Ok(FetchedPage { final_url, body })
}

/// Absolute `Location` of a redirect response
fn redirect_target(response: &Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok()
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Unreachable(e.to_string())
    } else if e.is_decode() || e.is_body() {
        FetchError::Parse(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}
