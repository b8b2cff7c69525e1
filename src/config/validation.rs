//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject missing endpoints before any remote call is made
//! - Validate value ranges (timeouts > 0, amount > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DemoConfig → Result<(), Vec<ValidationError>>

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use thiserror::Error;

use crate::config::schema::DemoConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("bundler.poll_interval_ms ({interval}) exceeds bundler.max_poll_interval_ms ({max})")]
    PollIntervalAboveMax { interval: u64, max: u64 },

    #[error("magic_spend.amount '{value}' is not a valid ether amount: {reason}")]
    InvalidAmount { value: String, reason: String },
}

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &DemoConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "network.rpc_url", &config.network.rpc_url);
    for url in &config.network.failover_urls {
        check_url(&mut errors, "network.failover_urls", url);
    }
    check_url(&mut errors, "bundler.url", &config.bundler.url);

    check_nonzero(&mut errors, "network.chain_id", config.network.chain_id);
    check_nonzero(&mut errors, "network.rpc_timeout_secs", config.network.rpc_timeout_secs);
    check_nonzero(
        &mut errors,
        "bundler.request_timeout_secs",
        config.bundler.request_timeout_secs,
    );
    check_nonzero(
        &mut errors,
        "bundler.receipt_timeout_secs",
        config.bundler.receipt_timeout_secs,
    );
    check_nonzero(&mut errors, "bundler.poll_interval_ms", config.bundler.poll_interval_ms);

    if config.bundler.poll_interval_ms > config.bundler.max_poll_interval_ms {
        errors.push(ValidationError::PollIntervalAboveMax {
            interval: config.bundler.poll_interval_ms,
            max: config.bundler.max_poll_interval_ms,
        });
    }

    if let Err(e) = parse_amount(&config.magic_spend.amount) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a decimal ether amount into wei, rejecting zero.
pub fn parse_amount(value: &str) -> Result<U256, ValidationError> {
    let trimmed = value.trim();
    // parse_ether accepts a sign and wraps negatives into U256
    if trimmed.starts_with('-') {
        return Err(ValidationError::InvalidAmount {
            value: value.to_string(),
            reason: "amount must not be negative".to_string(),
        });
    }
    let wei = parse_ether(trimmed).map_err(|e| ValidationError::InvalidAmount {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if wei.is_zero() {
        return Err(ValidationError::InvalidAmount {
            value: value.to_string(),
            reason: "amount must be greater than zero".to_string(),
        });
    }
    Ok(wei)
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::Missing { field });
        return;
    }
    if let Err(e) = url::Url::parse(value) {
        errors.push(ValidationError::InvalidUrl {
            field,
            reason: e.to_string(),
        });
    }
}

fn check_nonzero(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DemoConfig {
        let mut config = DemoConfig::default();
        config.bundler.url = "https://bundler.example.com/rpc?apikey=test".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_bundler_url() {
        let config = DemoConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Missing { field: "bundler.url" }]
        );
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid_config();
        config.network.rpc_url = "not a url".to_string();
        config.network.chain_id = 0;
        config.bundler.poll_interval_ms = 10_000;
        config.magic_spend.amount = "abc".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::InvalidUrl { field: "network.rpc_url", .. }));
        assert!(errors.contains(&ValidationError::Zero { field: "network.chain_id" }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::PollIntervalAboveMax { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidAmount { .. })));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1").unwrap(), U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(parse_amount("0.0000001").unwrap(), U256::from(100_000_000_000u64));
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-1").is_err());
    }
}
