use crate::config::types::{
    Config, CrawlerConfig, FetcherConfig, RobotsConfig, SchedulerConfig, StorageConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_robots_config(&config.robots)?;
    validate_storage_config(&config.storage)?;
    validate_scheduler_config(&config.scheduler)?;
    config
        .ranking
        .validate()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if !config.default_delay_secs.is_finite() || config.default_delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "default_delay_secs must be a non-negative number, got {}",
            config.default_delay_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

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

/// Validates HTTP fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and timeout_secs ({}), got {}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            config.max_body_bytes
        )));
    }

    Ok(())
}

/// Validates robots.txt cache configuration
fn validate_robots_config(config: &RobotsConfig) -> Result<(), ConfigError> {
    if config.cache_ttl_hours < 1 {
        return Err(ConfigError::Validation(
            "cache_ttl_hours must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates scheduler configuration
fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.tick_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "tick_interval_secs must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Validates a job scope pattern: `example.com` or `*.example.com`
pub fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }
    validate_domain_string(pattern.strip_prefix("*.").unwrap_or(pattern))
}

/// Checks a host name label by label
///
/// Each dot-separated label is non-empty, made of letters, digits and
/// hyphens, and does not begin or end with a hyphen. At least two labels are
/// required.
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| -> Result<(), ConfigError> {
        Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' {}",
            domain, reason
        )))
    };

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return invalid("must contain at least one dot (e.g., 'example.com')");
    }
    for label in labels {
        if label.is_empty() {
            return invalid("has an empty label");
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return invalid("contains invalid characters");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return invalid("has a label starting or ending with '-'");
        }
    }
    Ok(())
}

/// Accepts `local@domain.tld` shaped addresses
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let well_formed = email
        .split_once('@')
        .filter(|(local, domain)| !local.is_empty() && !domain.contains('@'))
        .map_or(false, |(_, domain)| {
            domain.split('.').count() >= 2 && domain.split('.').all(|part| !part.is_empty())
        });

    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "contact_email is not a valid address: '{}'",
            email
        )))
    }
}
