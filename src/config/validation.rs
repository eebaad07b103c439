use crate::config::types::{
    BrowserConfig, Config, OutputConfig, RetryConfig, ScrapingConfig, SearchConfig,
};
use crate::crawler::RangeChunk;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_browser_config(&config.browser)?;
    validate_scraping_config(&config.scraping)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    validate_search_config(&config.search)?;
    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    Url::parse(&config.webdriver_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver-url: {}", e)))?;

    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "https" && base.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be non-zero, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    Ok(())
}

/// Validates the scroll loop settings
fn validate_scraping_config(config: &ScrapingConfig) -> Result<(), ConfigError> {
    if config.scroll_delay_max_ms < config.scroll_delay_min_ms {
        return Err(ConfigError::Validation(format!(
            "scroll-delay-max-ms ({}) must be >= scroll-delay-min-ms ({})",
            config.scroll_delay_max_ms, config.scroll_delay_min_ms
        )));
    }

    if config.max_scroll_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-scroll-attempts must be >= 1".to_string(),
        ));
    }

    if config.overlap_threshold < 1 {
        return Err(ConfigError::Validation(
            "overlap-threshold must be >= 1".to_string(),
        ));
    }

    if config.zero_progress_attempts < 1 {
        return Err(ConfigError::Validation(
            "zero-progress-attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "retry max-attempts must be >= 1".to_string(),
        ));
    }

    if !(config.backoff_multiplier >= 1.0) {
        return Err(ConfigError::Validation(format!(
            "backoff-multiplier must be >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    config
        .chunk
        .parse::<RangeChunk>()
        .map_err(ConfigError::Validation)?;

    if config.max_items_per_range < 1 {
        return Err(ConfigError::Validation(
            "max-items-per-range must be >= 1".to_string(),
        ));
    }

    Ok(())
}
