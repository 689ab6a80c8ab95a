//! Layered configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown log level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// `max_retries` is zero
    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    /// Initial backoff not below the maximum
    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    /// Call timeout below one second
    #[error("Invalid call_timeout_secs: {0}. Must be at least 1")]
    InvalidCallTimeout(u64),

    /// Temperature outside 0.0 to 2.0
    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    /// No backends configured
    #[error("Backend catalog is empty")]
    EmptyCatalog,

    /// Primary backend missing from the catalog
    #[error("Primary backend '{0}' is not in the catalog")]
    UnknownPrimary(String),

    /// A catalog entry has bad pricing or limits
    #[error("Invalid backend '{id}': {reason}")]
    InvalidBackend {
        /// Offending backend id
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// An analysis threshold is out of range
    #[error("Invalid analysis threshold {name}: {value}")]
    InvalidThreshold {
        /// Config key
        name: &'static str,
        /// Rejected value
        value: f64,
    },

    /// Any other validation failure
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .conclave/config.yaml (project config)
    /// 3. .conclave/local.yaml (project local overrides, optional)
    /// 4. Environment variables (CONCLAVE_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".conclave/config.yaml"))
            .merge(Yaml::file(".conclave/local.yaml"))
            .merge(Env::prefixed("CONCLAVE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("CONCLAVE_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.retry.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.retry.max_retries));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.dispatch.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidCallTimeout(config.dispatch.call_timeout_secs));
        }

        if !(0.0..=2.0).contains(&config.dispatch.temperature) {
            return Err(ConfigError::InvalidTemperature(config.dispatch.temperature));
        }

        if config.dispatch.request_deadline_secs == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "request_deadline_secs must be greater than 0".to_string(),
            ));
        }

        Self::validate_catalog(config)?;
        Self::validate_analysis(config)?;

        Ok(())
    }

    fn validate_catalog(config: &Config) -> Result<(), ConfigError> {
        let catalog = &config.catalog;
        if catalog.backends.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        if !catalog.contains(catalog.primary.as_str()) {
            return Err(ConfigError::UnknownPrimary(catalog.primary.to_string()));
        }

        for (i, profile) in catalog.backends.iter().enumerate() {
            let invalid = |reason: &str| ConfigError::InvalidBackend {
                id: profile.id.to_string(),
                reason: reason.to_string(),
            };

            if profile.id.as_str().trim().is_empty() {
                return Err(invalid("id cannot be empty"));
            }
            if catalog.backends[..i].iter().any(|other| other.id == profile.id) {
                return Err(invalid("listed twice"));
            }
            if profile.default_model.trim().is_empty() {
                return Err(invalid("default_model cannot be empty"));
            }
            if !(profile.input_cost_per_mtok >= 0.0 && profile.output_cost_per_mtok >= 0.0) {
                return Err(invalid("pricing must be non-negative"));
            }
            if profile.max_concurrent == 0 {
                return Err(invalid("max_concurrent must be at least 1"));
            }
            if profile.requests_per_interval == 0 || profile.interval_secs == 0 {
                return Err(invalid("rate limit must admit at least one request per interval"));
            }
        }

        Ok(())
    }

    fn validate_analysis(config: &Config) -> Result<(), ConfigError> {
        let analysis = &config.analysis;

        let positive = [
            ("outlier_z_threshold", analysis.outlier_z_threshold),
            ("numeric_ceiling", analysis.numeric_ceiling),
            ("hallucination_ratio", analysis.hallucination_ratio),
            ("distribution_cv", analysis.distribution_cv),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if analysis.hallucination_ratio <= 1.0 {
            return Err(ConfigError::InvalidThreshold {
                name: "hallucination_ratio",
                value: analysis.hallucination_ratio,
            });
        }

        let fractions = [
            ("lexical_similarity_threshold", analysis.lexical_similarity_threshold),
            ("misunderstood_overlap", analysis.misunderstood_overlap),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if analysis.min_numeric_responses < 2 {
            return Err(ConfigError::ValidationFailed(format!(
                "min_numeric_responses must be at least 2, got {}",
                analysis.min_numeric_responses
            )));
        }

        Ok(())
    }
}
