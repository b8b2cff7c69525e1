//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! withdrawal demo. All types derive Serde traits for deserialization
//! from config files.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// ERC-4337 v0.7 EntryPoint, deployed at the same address on every chain.
pub const ENTRY_POINT_V07: Address = address!("0000000071727de22e5e9d8baf0edac6f37da032");

/// SimpleAccount v0.7 factory.
pub const SIMPLE_ACCOUNT_FACTORY_V07: Address =
    address!("91e60e0613810449d098b0b5ec8b51a0fe8c8985");

/// Sentinel address the paymaster service uses for the native asset.
pub const NATIVE_TOKEN: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Node RPC settings.
    pub network: NetworkConfig,

    /// Bundler and paymaster extension settings.
    pub bundler: BundlerConfig,

    /// Smart account settings.
    pub account: AccountConfig,

    /// Allowance and withdrawal parameters.
    pub magic_spend: MagicSpendConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Node JSON-RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 11155111 for Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 11_155_111,
            rpc_timeout_secs: 10,
        }
    }
}

/// Which tier of `pimlico_getUserOperationGasPrice` to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceTier {
    Slow,
    Standard,
    #[default]
    Fast,
}

/// Bundler endpoint configuration.
///
/// The same endpoint serves the standard ERC-4337 methods and the vendor
/// paymaster extension.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Bundler JSON-RPC URL. Usually carries an API key, so it is normally
    /// supplied through `MAGIC_SPEND_BUNDLER_URL` rather than the file.
    pub url: String,

    /// EntryPoint the user operation targets.
    pub entry_point: Address,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long to wait for a user operation receipt.
    pub receipt_timeout_secs: u64,

    /// First receipt poll delay in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound on the receipt poll delay in milliseconds.
    pub max_poll_interval_ms: u64,

    /// Gas price tier to request from the bundler.
    pub gas_price_tier: GasPriceTier,

    /// Refuse to submit when the quoted max fee exceeds this (gwei).
    pub max_fee_per_gas_gwei: u64,

    /// Ask the paymaster to cover gas for the user operation.
    pub sponsor_gas: bool,

    /// Optional sponsorship policy forwarded to the paymaster.
    pub sponsorship_policy_id: Option<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            entry_point: ENTRY_POINT_V07,
            request_timeout_secs: 30,
            receipt_timeout_secs: 120,
            poll_interval_ms: 1_000,
            max_poll_interval_ms: 8_000,
            gas_price_tier: GasPriceTier::Fast,
            max_fee_per_gas_gwei: 500,
            sponsor_gas: true,
            sponsorship_policy_id: None,
        }
    }
}

/// Smart account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountConfig {
    /// SimpleAccount factory address.
    pub factory: Address,

    /// Salt passed to the factory; selects one of the owner's accounts.
    pub salt: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            factory: SIMPLE_ACCOUNT_FACTORY_V07,
            salt: 0,
        }
    }
}

/// Allowance and withdrawal parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MagicSpendConfig {
    /// Token to draw. Defaults to the native asset.
    pub token: Address,

    /// Amount in ether units, as a decimal string (e.g. "0.0000001").
    pub amount: String,
}

impl Default for MagicSpendConfig {
    fn default() -> Self {
        Self {
            token: NATIVE_TOKEN,
            amount: "0.0000001".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Env-filter directive used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "magic_spend=info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
