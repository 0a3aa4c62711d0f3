use crate::config::types::{Config, CrawlerConfig, DigestConfig, OutputConfig, ProviderConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// The crawler interval is deliberately not checked here: an unreadable
/// interval degrades to a full-history crawl at run time.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_provider_config(&config.provider)?;
    validate_output_config(&config.output)?;

    if config.input.owners_file.trim().is_empty() {
        return Err(ConfigError::Validation(
            "owners_file cannot be empty".to_string(),
        ));
    }

    if config.digest.enabled {
        validate_digest_config(config)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.stale_tolerance < 1 {
        return Err(ConfigError::Validation(format!(
            "stale_tolerance must be >= 1, got {}",
            config.stale_tolerance
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.max_items == Some(0) {
        return Err(ConfigError::Validation(
            "max_items must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates remote API configuration
fn validate_provider_config(config: &ProviderConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;
    validate_http_url("web_url", &config.web_url)?;
    validate_http_url("video_cdn", &config.video_cdn)?;

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if config.cookies_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cookies_env cannot be empty".to_string(),
        ));
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

    if config.media_root.is_empty() {
        return Err(ConfigError::Validation(
            "media_root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the digest collaborators (only when the digest is enabled)
fn validate_digest_config(config: &Config) -> Result<(), ConfigError> {
    let digest: &DigestConfig = &config.digest;
    if digest.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "digest output_dir cannot be empty".to_string(),
        ));
    }

    validate_http_url("summarizer base_url", &config.summarizer.base_url)?;
    validate_http_url("notifier endpoint", &config.notifier.endpoint)?;

    if config.summarizer.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer model cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that a setting holds an absolute http(s) URL
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}
