//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → DemoConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Secrets (owner key, keyed bundler URL) come from the environment
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AccountConfig, BundlerConfig, DemoConfig, GasPriceTier, LogFormat, MagicSpendConfig,
    NetworkConfig, ObservabilityConfig,
};
pub use validation::{parse_amount, validate_config, ValidationError};
