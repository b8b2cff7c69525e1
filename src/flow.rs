//! The MagicSpend withdrawal procedure.
//!
//! # Steps
//! ```text
//! contracts ─▶ stakes ─▶ prepare allowance ─▶ sign allowance hash ─▶ grant
//!                                                                     │
//!  receipt ◀─ send ◀─ sign user op ◀─ prepare user op ◀─ sponsor withdrawal
//! ```
//!
//! Strictly sequential. Nothing is retried; the first failing step ends the
//! run with its error.

use alloy::primitives::{Address, B256, U256, U64};
use alloy::sol_types::SolCall;
use serde::Serialize;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::account::{AccountError, SmartAccount};
use crate::blockchain::{BlockchainClient, BlockchainError, Wallet};
use crate::bundler::{BundlerClient, BundlerError};
use crate::config::{ConfigError, DemoConfig};
use crate::magic_spend::contracts::{MagicSpendStakeManager, MagicSpendWithdrawalManager};
use crate::magic_spend::{
    total_staked, Allowance, MagicSpendClient, MagicSpendContracts, MagicSpendError, Stake,
    Withdrawal,
};
use crate::observability::metrics;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Bundler(#[from] BundlerError),

    #[error(transparent)]
    MagicSpend(#[from] MagicSpendError),

    #[error(transparent)]
    Account(#[from] AccountError),

    /// Bundler does not accept user operations for the configured EntryPoint.
    #[error("Bundler does not support EntryPoint {entry_point} (supported: {supported:?})")]
    EntryPointUnsupported {
        entry_point: Address,
        supported: Vec<Address>,
    },

    /// Nothing staked, so there is nothing to allow.
    #[error("No MagicSpend stakes found for {account}")]
    NoStakes { account: Address },

    /// The drafted allowance is not the one that was asked for.
    #[error("Prepared allowance does not match request: {field} is {actual}, expected {expected}")]
    AllowanceMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// The sponsored withdrawal is not the one that was asked for.
    #[error("Sponsored withdrawal does not match request: {field} is {actual}, expected {expected}")]
    WithdrawalMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// Included on-chain but reverted.
    #[error("User operation {hash} reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    UserOperationFailed { hash: B256, reason: Option<String> },
}

/// Result type for the flow.
pub type FlowResult<T> = Result<T, FlowError>;

/// What a completed withdrawal produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalOutcome {
    pub user_op_hash: B256,
    pub transaction_hash: B256,
    pub block_number: U64,
    pub actual_gas_cost: U256,
    pub smart_account: Address,
    pub amount: U256,
}

/// Owner identity for the read-only `account` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub owner: Address,
    pub smart_account: Address,
    pub deployed: bool,
}

/// Connected clients plus the resolved smart account.
#[derive(Debug)]
pub struct WithdrawalFlow {
    config: DemoConfig,
    wallet: Wallet,
    node: BlockchainClient,
    bundler: BundlerClient,
    magic_spend: MagicSpendClient,
    account: SmartAccount,
}

impl WithdrawalFlow {
    /// Connect using the owner key from `MAGIC_SPEND_PRIVATE_KEY`.
    pub async fn connect(config: DemoConfig) -> FlowResult<Self> {
        let wallet = Wallet::from_env()?;
        Self::connect_with_wallet(config, wallet).await
    }

    /// Connect with an explicit owner key.
    pub async fn connect_with_wallet(config: DemoConfig, wallet: Wallet) -> FlowResult<Self> {
        let node = BlockchainClient::new(config.network.clone())?;
        node.verify_chain_id().await?;

        let bundler = BundlerClient::new(config.bundler.clone())?;
        let supported = bundler.supported_entry_points().await?;
        if !supported.contains(&bundler.entry_point()) {
            return Err(FlowError::EntryPointUnsupported {
                entry_point: bundler.entry_point(),
                supported,
            });
        }

        let magic_spend = MagicSpendClient::new(bundler.clone());
        let account = SmartAccount::resolve(wallet.address(), &config.account, &node).await?;

        Ok(Self {
            config,
            wallet,
            node,
            bundler,
            magic_spend,
            account,
        })
    }

    pub fn smart_account(&self) -> &SmartAccount {
        &self.account
    }

    /// Owner, smart account address, and whether it is deployed.
    pub async fn account_summary(&self) -> FlowResult<AccountSummary> {
        Ok(AccountSummary {
            owner: self.wallet.address(),
            smart_account: self.account.address(),
            deployed: self.account.is_deployed(&self.node).await?,
        })
    }

    pub async fn contracts(&self) -> FlowResult<MagicSpendContracts> {
        Ok(self.magic_spend.get_contracts().await?)
    }

    /// Stakes the owner holds in the configured token.
    pub async fn stakes(&self) -> FlowResult<Vec<Stake>> {
        Ok(self
            .magic_spend
            .get_stakes(self.wallet.address(), self.config.magic_spend.token)
            .await?)
    }

    /// Run the full procedure for `amount` wei of the configured token.
    pub async fn withdraw(&self, amount: U256) -> FlowResult<WithdrawalOutcome> {
        let span = tracing::info_span!(
            "withdraw",
            run_id = %Uuid::new_v4(),
            owner = %self.wallet.address(),
            smart_account = %self.account.address(),
        );
        self.run_withdraw(amount).instrument(span).await
    }

    async fn run_withdraw(&self, amount: U256) -> FlowResult<WithdrawalOutcome> {
        let owner = self.wallet.address();
        let token = self.config.magic_spend.token;
        tracing::info!(%amount, %token, "Starting MagicSpend withdrawal");

        let contracts = self.contracts().await?;
        metrics::record_step("contracts");

        let stakes = self.stakes().await?;
        if stakes.is_empty() {
            return Err(FlowError::NoStakes { account: owner });
        }
        let staked = total_staked(&stakes, token);
        if staked < amount {
            tracing::warn!(%staked, requested = %amount, "Active stake below requested amount");
        }
        metrics::record_step("stakes");

        let allowance = self
            .magic_spend
            .prepare_allowance(owner, token, amount)
            .await?;
        check_allowance(&allowance, owner, token, amount)?;
        metrics::record_step("prepare_allowance");

        let allowance_hash = self
            .node
            .call_decoded(
                contracts.stake_manager_address,
                &MagicSpendStakeManager::getAllowanceHashCall {
                    allowance: allowance.to_abi()?,
                },
            )
            .await?;
        let allowance_signature = self.wallet.sign_hash_message(allowance_hash).await?;
        tracing::info!(%allowance_hash, "Allowance signed");
        metrics::record_step("sign_allowance");

        self.magic_spend
            .grant_allowance(&allowance, allowance_signature)
            .await?;
        metrics::record_step("grant_allowance");

        let (withdrawal, operator_signature) = self
            .magic_spend
            .sponsor_withdrawal(self.account.address(), token, amount)
            .await?;
        check_withdrawal(&withdrawal, self.account.address(), token, amount)?;
        metrics::record_step("sponsor_withdrawal");

        let withdraw_call = MagicSpendWithdrawalManager::withdrawCall {
            withdrawal: withdrawal.to_abi()?,
            signature: operator_signature,
        };
        let call_data = SmartAccount::encode_execute(
            contracts.withdrawal_manager_address,
            U256::ZERO,
            withdraw_call.abi_encode().into(),
        );

        let mut op = self
            .account
            .prepare_user_operation(&self.node, &self.bundler, call_data)
            .await?;
        let signed_hash = self
            .account
            .sign_user_operation(
                &mut op,
                &self.wallet,
                self.bundler.entry_point(),
                self.node.chain_id(),
            )
            .await?;

        let user_op_hash = self.bundler.send_user_operation(&op).await?;
        if user_op_hash != signed_hash {
            tracing::warn!(%user_op_hash, %signed_hash, "Bundler returned a different user operation hash");
        }
        tracing::info!(%user_op_hash, "User operation submitted");
        metrics::record_step("send_user_operation");

        let receipt = self.bundler.wait_for_receipt(user_op_hash).await?;
        if !receipt.success {
            return Err(FlowError::UserOperationFailed {
                hash: user_op_hash,
                reason: receipt.reason,
            });
        }
        metrics::record_step("receipt");

        tracing::info!(
            %user_op_hash,
            transaction_hash = %receipt.receipt.transaction_hash,
            block_number = %receipt.receipt.block_number,
            actual_gas_cost = %receipt.actual_gas_cost,
            "Withdrawal complete"
        );

        Ok(WithdrawalOutcome {
            user_op_hash,
            transaction_hash: receipt.receipt.transaction_hash,
            block_number: receipt.receipt.block_number,
            actual_gas_cost: receipt.actual_gas_cost,
            smart_account: self.account.address(),
            amount,
        })
    }
}

/// The owner only signs an allowance over its own stake for exactly `amount`.
fn check_allowance(
    allowance: &Allowance,
    owner: Address,
    token: Address,
    amount: U256,
) -> FlowResult<()> {
    if allowance.account != owner {
        return Err(FlowError::AllowanceMismatch {
            field: "account",
            expected: owner.to_string(),
            actual: allowance.account.to_string(),
        });
    }
    let allowed = allowance.amount_for(token);
    if allowed != amount {
        return Err(FlowError::AllowanceMismatch {
            field: "amount",
            expected: amount.to_string(),
            actual: allowed.to_string(),
        });
    }
    Ok(())
}

fn check_withdrawal(
    withdrawal: &Withdrawal,
    recipient: Address,
    token: Address,
    amount: U256,
) -> FlowResult<()> {
    let mismatch = |field, expected: String, actual: String| FlowError::WithdrawalMismatch {
        field,
        expected,
        actual,
    };

    if withdrawal.recipient != recipient {
        return Err(mismatch(
            "recipient",
            recipient.to_string(),
            withdrawal.recipient.to_string(),
        ));
    }
    if withdrawal.token != token {
        return Err(mismatch("token", token.to_string(), withdrawal.token.to_string()));
    }
    if withdrawal.amount != amount {
        return Err(mismatch("amount", amount.to_string(), withdrawal.amount.to_string()));
    }
    Ok(())
}
