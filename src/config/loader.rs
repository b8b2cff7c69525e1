//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::DemoConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `network.rpc_url`.
pub const RPC_URL_ENV_VAR: &str = "MAGIC_SPEND_RPC_URL";
/// Overrides `bundler.url`.
pub const BUNDLER_URL_ENV_VAR: &str = "MAGIC_SPEND_BUNDLER_URL";
/// Overrides `magic_spend.amount`.
pub const AMOUNT_ENV_VAR: &str = "MAGIC_SPEND_AMOUNT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied after parsing and before validation.
pub fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: DemoConfig = toml::from_str(&content)?;
    finish(config, env_lookup)
}

/// Build configuration from defaults and environment variables only.
pub fn load_from_env() -> Result<DemoConfig, ConfigError> {
    finish(DemoConfig::default(), env_lookup)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn finish<F>(mut config: DemoConfig, lookup: F) -> Result<DemoConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides from `lookup` (normally the process environment).
pub fn apply_overrides<F>(config: &mut DemoConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(RPC_URL_ENV_VAR) {
        config.network.rpc_url = url;
    }
    if let Some(url) = lookup(BUNDLER_URL_ENV_VAR) {
        config.bundler.url = url;
    }
    if let Some(amount) = lookup(AMOUNT_ENV_VAR) {
        config.magic_spend.amount = amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = DemoConfig::default();
        config.bundler.url = "http://file-value".to_string();

        apply_overrides(
            &mut config,
            lookup_from(&[
                (BUNDLER_URL_ENV_VAR, "https://bundler.example.com/rpc"),
                (AMOUNT_ENV_VAR, "0.5"),
            ]),
        );

        assert_eq!(config.bundler.url, "https://bundler.example.com/rpc");
        assert_eq!(config.magic_spend.amount, "0.5");
        assert_eq!(config.network.rpc_url, "http://localhost:8545");
    }

    #[test]
    fn test_missing_bundler_url_fails_validation() {
        let result = finish(DemoConfig::default(), lookup_from(&[]));
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("bundler.url is required"));
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!(
            "magic-spend-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        fs::write(
            &path,
            r#"
            [network]
            rpc_url = "http://127.0.0.1:8545"
            chain_id = 31337

            [bundler]
            url = "http://127.0.0.1:4337"
            sponsor_gas = false
            "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.network.chain_id, 31337);
        assert!(!config.bundler.sponsor_gas);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/magic-spend.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
