//! MagicSpend wire records and errors.
//!
//! The paymaster service speaks camelCase JSON with hex quantities. The
//! contracts take fixed-width integers, so converting a wire record into
//! its ABI struct is checked rather than truncating.

use alloy::primitives::aliases::U48;
use alloy::primitives::{Address, Bytes, U256, U64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bundler::BundlerError;
use crate::magic_spend::contracts;

/// Errors from the paymaster extension.
#[derive(Debug, Error)]
pub enum MagicSpendError {
    /// The underlying JSON-RPC call failed or was rejected.
    #[error(transparent)]
    Bundler(#[from] BundlerError),

    /// A wire value does not fit the contract's integer width.
    #[error("{field} value {value} does not fit in uint{bits}")]
    OutOfRange {
        field: &'static str,
        value: String,
        bits: u32,
    },
}

/// Result type for paymaster extension operations.
pub type MagicSpendResult<T> = Result<T, MagicSpendError>;

/// Response of `pimlico_getMagicSpendContracts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicSpendContracts {
    pub stake_manager_address: Address,
    pub withdrawal_manager_address: Address,
}

/// One entry of `pimlico_getMagicSpendStakes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stake {
    pub chain_id: U64,
    pub token: Address,
    pub amount: U256,
    pub unstake_delay_sec: U64,
    pub withdraw_time: U64,
    pub staked: bool,
}

/// Sum of active stake in `token` across chains.
///
/// Stakes that are unlocking (`staked == false`) cannot back an allowance
/// and are left out.
pub fn total_staked(stakes: &[Stake], token: Address) -> U256 {
    stakes
        .iter()
        .filter(|s| s.staked && s.token == token)
        .fold(U256::ZERO, |acc, s| acc.saturating_add(s.amount))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceAsset {
    pub token: Address,
    pub amount: U256,
    pub chain_id: U64,
}

/// Allowance as returned by `pimlico_prepareMagicSpendAllowance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allowance {
    pub account: Address,
    pub assets: Vec<AllowanceAsset>,
    pub valid_until: U64,
    pub valid_after: U64,
    pub salt: U64,
    pub operator: Address,
}

impl Allowance {
    /// Convert to the struct `getAllowanceHash` takes.
    pub fn to_abi(&self) -> MagicSpendResult<contracts::Allowance> {
        let assets = self
            .assets
            .iter()
            .map(|asset| {
                Ok(contracts::AllowanceAsset {
                    token: asset.token,
                    amount: to_u128("allowance.assets.amount", asset.amount)?,
                    chainId: u128::from(asset.chain_id.to::<u64>()),
                })
            })
            .collect::<MagicSpendResult<Vec<_>>>()?;

        Ok(contracts::Allowance {
            account: self.account,
            assets,
            validUntil: to_u48("allowance.validUntil", self.valid_until)?,
            validAfter: to_u48("allowance.validAfter", self.valid_after)?,
            salt: to_u48("allowance.salt", self.salt)?,
            operator: self.operator,
        })
    }

    /// Amount of `token` this allowance covers, across chains.
    pub fn amount_for(&self, token: Address) -> U256 {
        self.assets
            .iter()
            .filter(|a| a.token == token)
            .fold(U256::ZERO, |acc, a| acc.saturating_add(a.amount))
    }
}

/// Withdrawal as returned by `pimlico_sponsorMagicSpendWithdrawal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub token: Address,
    pub amount: U256,
    pub chain_id: U64,
    pub recipient: Address,
    pub valid_until: U64,
    pub valid_after: U64,
    pub salt: U64,
}

impl Withdrawal {
    /// Convert to the struct `withdraw` takes.
    pub fn to_abi(&self) -> MagicSpendResult<contracts::Withdrawal> {
        Ok(contracts::Withdrawal {
            token: self.token,
            amount: to_u128("withdrawal.amount", self.amount)?,
            chainId: u128::from(self.chain_id.to::<u64>()),
            recipient: self.recipient,
            validUntil: to_u48("withdrawal.validUntil", self.valid_until)?,
            validAfter: to_u48("withdrawal.validAfter", self.valid_after)?,
            salt: to_u48("withdrawal.salt", self.salt)?,
        })
    }
}

/// Params of `pimlico_getMagicSpendStakes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakesRequest {
    pub account: Address,
    pub token: Address,
}

/// Params of `pimlico_prepareMagicSpendAllowance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceRequest {
    pub account: Address,
    pub token: Address,
    pub amount: U256,
}

/// Params of `pimlico_grantMagicSpendAllowance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantAllowanceRequest {
    pub allowance: Allowance,
    pub signature: Bytes,
}

/// Params of `pimlico_sponsorMagicSpendWithdrawal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub recipient: Address,
    pub token: Address,
    pub amount: U256,
}

fn to_u128(field: &'static str, value: U256) -> MagicSpendResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(MagicSpendError::OutOfRange {
            field,
            value: value.to_string(),
            bits: 128,
        });
    }
    Ok(value.to::<u128>())
}

fn to_u48(field: &'static str, value: U64) -> MagicSpendResult<U48> {
    let raw = value.to::<u64>();
    if raw >> 48 != 0 {
        return Err(MagicSpendError::OutOfRange {
            field,
            value: raw.to_string(),
            bits: 48,
        });
    }
    Ok(U48::from_limbs([raw]))
}
