//! Client for the MagicSpend paymaster extension methods.

use alloy::primitives::{Address, Bytes, U256};

use crate::bundler::BundlerClient;
use crate::magic_spend::types::{
    Allowance, AllowanceRequest, GrantAllowanceRequest, MagicSpendContracts, MagicSpendResult,
    Stake, StakesRequest, Withdrawal, WithdrawalRequest,
};

/// Vendor extension methods served by the bundler endpoint.
#[derive(Debug, Clone)]
pub struct MagicSpendClient {
    bundler: BundlerClient,
}

impl MagicSpendClient {
    pub fn new(bundler: BundlerClient) -> Self {
        Self { bundler }
    }

    /// Stake manager and withdrawal manager addresses for this chain.
    pub async fn get_contracts(&self) -> MagicSpendResult<MagicSpendContracts> {
        let contracts: MagicSpendContracts = self
            .bundler
            .request("pimlico_getMagicSpendContracts", ())
            .await?;
        tracing::info!(
            stake_manager = %contracts.stake_manager_address,
            withdrawal_manager = %contracts.withdrawal_manager_address,
            "MagicSpend contracts discovered"
        );
        Ok(contracts)
    }

    /// Stakes `account` holds in `token`.
    pub async fn get_stakes(&self, account: Address, token: Address) -> MagicSpendResult<Vec<Stake>> {
        let stakes: Vec<Stake> = self
            .bundler
            .request(
                "pimlico_getMagicSpendStakes",
                (StakesRequest { account, token },),
            )
            .await?;
        tracing::info!(%account, count = stakes.len(), "Stakes fetched");
        Ok(stakes)
    }

    /// Ask the service to draft an allowance for `amount` of `token`.
    pub async fn prepare_allowance(
        &self,
        account: Address,
        token: Address,
        amount: U256,
    ) -> MagicSpendResult<Allowance> {
        let allowance: Allowance = self
            .bundler
            .request(
                "pimlico_prepareMagicSpendAllowance",
                (AllowanceRequest {
                    account,
                    token,
                    amount,
                },),
            )
            .await?;
        tracing::info!(
            %account,
            operator = %allowance.operator,
            assets = allowance.assets.len(),
            valid_until = %allowance.valid_until,
            "Allowance prepared"
        );
        Ok(allowance)
    }

    /// Submit the owner's signature over the allowance hash.
    ///
    /// The service's acknowledgement has no fixed shape, so it is returned raw.
    pub async fn grant_allowance(
        &self,
        allowance: &Allowance,
        signature: Bytes,
    ) -> MagicSpendResult<serde_json::Value> {
        let ack: serde_json::Value = self
            .bundler
            .request(
                "pimlico_grantMagicSpendAllowance",
                (GrantAllowanceRequest {
                    allowance: allowance.clone(),
                    signature,
                },),
            )
            .await?;
        tracing::info!(account = %allowance.account, "Allowance granted");
        Ok(ack)
    }

    /// Request an operator-signed withdrawal of `amount` to `recipient`.
    pub async fn sponsor_withdrawal(
        &self,
        recipient: Address,
        token: Address,
        amount: U256,
    ) -> MagicSpendResult<(Withdrawal, Bytes)> {
        let (withdrawal, signature): (Withdrawal, Bytes) = self
            .bundler
            .request(
                "pimlico_sponsorMagicSpendWithdrawal",
                (WithdrawalRequest {
                    recipient,
                    token,
                    amount,
                },),
            )
            .await?;
        tracing::info!(
            %recipient,
            amount = %withdrawal.amount,
            salt = %withdrawal.salt,
            "Withdrawal sponsored"
        );
        Ok((withdrawal, signature))
    }
}
