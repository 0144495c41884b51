use crate::config::types::{
    Config, CrawlerConfig, DriverConfig, Environment, HarvesterConfig, NotifyConfig,
    SelectorConfig, StorageConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_harvester_config(&config.harvester)?;
    validate_selectors(&config.selectors)?;
    validate_driver_config(&config.driver)?;
    validate_storage_config(&config.storage)?;
    validate_notify_config(&config.notify)?;
    Ok(())
}

/// Validates crawl orchestration settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_locations < 1 || config.max_concurrent_locations > 32 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-locations must be between 1 and 32, got {}",
            config.max_concurrent_locations
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.backoff_min_secs > config.backoff_max_secs {
        return Err(ConfigError::Validation(format!(
            "backoff-min-secs ({}) must not exceed backoff-max-secs ({})",
            config.backoff_min_secs, config.backoff_max_secs
        )));
    }

    Ok(())
}

/// Validates harvester timing
fn validate_harvester_config(config: &HarvesterConfig) -> Result<(), ConfigError> {
    if config.waiting_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "waiting-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.pause_min_ms > config.pause_max_ms {
        return Err(ConfigError::Validation(format!(
            "pause-min-ms ({}) must not exceed pause-max-ms ({})",
            config.pause_min_ms, config.pause_max_ms
        )));
    }

    Ok(())
}

/// Validates that every selector is non-empty CSS
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    let selectors = [
        ("reviews-tab", &config.reviews_tab),
        ("total-reviews", &config.total_reviews),
        ("sort-button", &config.sort_button),
        ("newest-option", &config.newest_option),
        ("refine-categories", &config.refine_categories),
        ("category-label", &config.category_label),
        ("review-item", &config.review_item),
        ("more-button", &config.more_button),
        ("description", &config.description),
        ("review-date", &config.review_date),
        ("rating", &config.rating),
        ("reviewer-count", &config.reviewer_count),
        ("reviewer-url", &config.reviewer_url),
        ("owner-reply", &config.owner_reply),
        ("owner-reply-date", &config.owner_reply_date),
    ];

    for (name, selector) in selectors {
        validate_selector(name, selector)?;
    }

    Ok(())
}

fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "selectors.{} cannot be empty",
            name
        )));
    }

    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!(
            "selectors.{} is not a valid CSS selector '{}': {:?}",
            name, selector, e
        ))
    })?;

    Ok(())
}

/// Validates snapshot driver settings
fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "driver.user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "driver.request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.page_size == Some(0) {
        return Err(ConfigError::Validation(
            "driver.page-size must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates input/output paths
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    let paths = [
        ("locations-path", &config.locations_path),
        ("work-dir", &config.work_dir),
        ("output-dir", &config.output_dir),
    ];

    for (name, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "storage.{} cannot be empty",
                name
            )));
        }
    }

    if config.work_dir == config.output_dir {
        return Err(ConfigError::Validation(
            "storage.work-dir and storage.output-dir must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates notification settings
fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if let Some(webhook) = &config.webhook_url {
        let url = Url::parse(webhook)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webhook-url: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "webhook-url must use http or https, got '{}'",
                url.scheme()
            )));
        }
    }

    if config.environment == Environment::Production && config.webhook_url.is_none() {
        return Err(ConfigError::Validation(
            "notify.webhook-url is required when environment = \"production\"".to_string(),
        ));
    }

    Ok(())
}
