use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig};
use crate::ConfigError;

/// Upper bound for any single request timeout (10 minutes)
const MAX_TIMEOUT_MS: u64 = 600_000;

/// Upper bound for the fixed inter-request delay (1 minute)
const MAX_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_delay_ms > MAX_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be <= {}ms, got {}ms",
            MAX_DELAY_MS, config.request_delay_ms
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    validate_timeout("page_timeout_ms", config.page_timeout_ms)?;
    validate_timeout("image_timeout_ms", config.image_timeout_ms)?;
    Ok(())
}

fn validate_timeout(name: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "{} must be between 1 and {}ms, got {}ms",
            name, MAX_TIMEOUT_MS, value
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if matches!(config.bundle_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "bundle_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.database_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
