use crate::config::types::{
    ApiConfig, Config, CrawlConfig, OutputConfig, ScraperConfig, SeedEntry, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_api_config(&config.api)?;
    validate_scraper_sites(&config.scrapers)?;
    validate_output_config(&config.output)?;
    validate_seeds(&config.seed)?;
    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.crawl_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "crawl_limit must be >= 1, got {}",
            config.crawl_limit
        )));
    }

    if config.depth_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "depth_limit must be >= 1, got {}",
            config.depth_limit
        )));
    }

    if config.api_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "api_timeout_ms must be >= 100ms, got {}ms",
            config.api_timeout_ms
        )));
    }

    if config.scrape_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "scrape_timeout_ms must be >= 100ms, got {}ms",
            config.scrape_timeout_ms
        )));
    }

    if !config.child_priority.is_finite() || config.child_priority < 0.0 {
        return Err(ConfigError::Validation(format!(
            "child_priority must be a non-negative number, got {}",
            config.child_priority
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    // Used verbatim as the robots.txt agent token
    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "api base_url '{}' must be http or https",
            config.base_url
        )));
    }

    Ok(())
}

fn validate_scraper_sites(config: &ScraperConfig) -> Result<(), ConfigError> {
    for site in &config.sites {
        validate_host_fragment(site)?;
    }
    Ok(())
}

/// Validates a host fragment used for substring matching
fn validate_host_fragment(fragment: &str) -> Result<(), ConfigError> {
    if fragment.is_empty() {
        return Err(ConfigError::InvalidHost(
            "Host fragment cannot be empty".to_string(),
        ));
    }

    if !fragment
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidHost(format!(
            "Host fragment '{}' contains invalid characters",
            fragment
        )));
    }

    if fragment.contains("..") {
        return Err(ConfigError::InvalidHost(format!(
            "Host fragment '{}' cannot contain consecutive dots",
            fragment
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    for (position, seed) in seeds.iter().enumerate() {
        let present = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());

        if !present(&seed.doi) && !present(&seed.link) && !present(&seed.title) {
            return Err(ConfigError::Validation(format!(
                "Seed #{} needs at least one of doi, link or title",
                position + 1
            )));
        }

        if let Some(link) = seed.link.as_deref().filter(|l| !l.trim().is_empty()) {
            Url::parse(link.trim()).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid seed link '{}': {}", link, e))
            })?;
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
