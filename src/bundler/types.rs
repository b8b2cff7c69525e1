//! Bundler wire types and errors.

use alloy::primitives::{Address, Bytes, B256, U128, U256, U64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GasPriceTier;

/// Errors from the bundler endpoint.
#[derive(Debug, Error)]
pub enum BundlerError {
    /// Configured bundler URL does not parse.
    #[error("Invalid bundler URL: {0}")]
    InvalidUrl(String),

    /// The bundler answered with a JSON-RPC error object.
    #[error("{method} rejected ({code}): {message}")]
    Rpc {
        method: &'static str,
        code: i64,
        message: String,
    },

    /// Connection, HTTP, or response decoding failure.
    #[error("{method} failed: {message}")]
    Transport {
        method: &'static str,
        message: String,
    },

    /// No answer within the request timeout.
    #[error("{method} timed out after {secs} seconds")]
    Timeout { method: &'static str, secs: u64 },

    /// No receipt appeared within the receipt timeout.
    #[error("No receipt for user operation {hash} after {secs} seconds")]
    ReceiptTimeout { hash: B256, secs: u64 },

    /// Quoted max fee exceeds the configured ceiling.
    #[error("Max fee per gas {quoted_gwei} gwei exceeds limit {max_gwei} gwei")]
    GasPriceTooHigh { quoted_gwei: u128, max_gwei: u64 },
}

/// Result type for bundler operations.
pub type BundlerResult<T> = Result<T, BundlerError>;

/// One fee quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPrice {
    pub max_fee_per_gas: U128,
    pub max_priority_fee_per_gas: U128,
}

/// Response of `pimlico_getUserOperationGasPrice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPriceTiers {
    pub slow: GasPrice,
    pub standard: GasPrice,
    pub fast: GasPrice,
}

impl GasPriceTiers {
    pub fn tier(&self, tier: GasPriceTier) -> GasPrice {
        match tier {
            GasPriceTier::Slow => self.slow,
            GasPriceTier::Standard => self.standard,
            GasPriceTier::Fast => self.fast,
        }
    }
}

/// Response of `eth_estimateUserOperationGas` (v0.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U128,
    pub call_gas_limit: U128,
    #[serde(default)]
    pub paymaster_verification_gas_limit: Option<U128>,
    #[serde(default)]
    pub paymaster_post_op_gas_limit: Option<U128>,
}

/// Response of `pm_sponsorUserOperation` (v0.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorResult {
    pub paymaster: Address,
    pub paymaster_data: Bytes,
    pub paymaster_verification_gas_limit: U128,
    pub paymaster_post_op_gas_limit: U128,
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U128,
    pub call_gas_limit: U128,
}

/// Extra sponsorship context forwarded to the paymaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipPolicy {
    pub sponsorship_policy_id: String,
}

/// The parts of the bundled transaction's receipt this crate reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub transaction_hash: B256,
    pub block_number: U64,
    #[serde(default)]
    pub block_hash: Option<B256>,
}

/// Response of `eth_getUserOperationReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    pub nonce: U256,
    #[serde(default)]
    pub paymaster: Option<Address>,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub receipt: TransactionSummary,
}
