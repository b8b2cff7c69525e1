//! SimpleAccount smart account handle.
//!
//! # Responsibilities
//! - Resolve the counterfactual account address from the factory
//! - Attach init code while the account is undeployed
//! - Build, price, and sign v0.7 user operations for the account

pub mod simple;

use alloy::primitives::aliases::U192;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use thiserror::Error;

use crate::blockchain::{BlockchainClient, BlockchainError, Wallet};
use crate::bundler::{BundlerClient, BundlerError, UserOperation};
use crate::config::AccountConfig;
use simple::{IEntryPoint, SimpleAccount, SimpleAccountFactory};

pub use simple::dummy_signature;

/// Errors while building or signing user operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    #[error(transparent)]
    Bundler(#[from] BundlerError),

    /// The signing key does not own this account.
    #[error("Signer {signer} does not own smart account {account} (owner {owner})")]
    OwnerMismatch {
        signer: Address,
        owner: Address,
        account: Address,
    },
}

/// Result type for account operations.
pub type AccountResult<T> = Result<T, AccountError>;

/// A SimpleAccount owned by one EOA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmartAccount {
    address: Address,
    owner: Address,
    factory: Address,
    salt: U256,
}

impl SmartAccount {
    /// Build a handle for an already-known address.
    pub fn new(address: Address, owner: Address, factory: Address, salt: U256) -> Self {
        Self {
            address,
            owner,
            factory,
            salt,
        }
    }

    /// Ask the factory for the counterfactual address of `owner`'s account.
    pub async fn resolve(
        owner: Address,
        config: &AccountConfig,
        node: &BlockchainClient,
    ) -> AccountResult<Self> {
        let salt = U256::from(config.salt);
        let address = node
            .call_decoded(
                config.factory,
                &SimpleAccountFactory::getAddressCall { owner, salt },
            )
            .await?;

        tracing::info!(%owner, smart_account = %address, "Smart account resolved");
        Ok(Self::new(address, owner, config.factory, salt))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Whether the account contract exists yet.
    pub async fn is_deployed(&self, node: &BlockchainClient) -> AccountResult<bool> {
        Ok(!node.get_code(self.address).await?.is_empty())
    }

    /// `createAccount(owner, salt)` calldata for the factory.
    pub fn factory_data(&self) -> Bytes {
        SimpleAccountFactory::createAccountCall {
            owner: self.owner,
            salt: self.salt,
        }
        .abi_encode()
        .into()
    }

    /// Calldata for the account to call `dest` with `value` and `data`.
    pub fn encode_execute(dest: Address, value: U256, data: Bytes) -> Bytes {
        SimpleAccount::executeCall {
            dest,
            value,
            func: data,
        }
        .abi_encode()
        .into()
    }

    /// Next nonce on the default key.
    pub async fn nonce(&self, node: &BlockchainClient, entry_point: Address) -> AccountResult<U256> {
        let nonce = node
            .call_decoded(
                entry_point,
                &IEntryPoint::getNonceCall {
                    sender: self.address,
                    key: U192::ZERO,
                },
            )
            .await?;
        Ok(nonce)
    }

    /// Build an unsigned operation carrying `call_data`, priced and gas-limited.
    ///
    /// The returned operation holds the stub signature; sign it with
    /// [`SmartAccount::sign_user_operation`] before submitting.
    pub async fn prepare_user_operation(
        &self,
        node: &BlockchainClient,
        bundler: &BundlerClient,
        call_data: Bytes,
    ) -> AccountResult<UserOperation> {
        let nonce = self.nonce(node, bundler.entry_point()).await?;
        let mut op = UserOperation::new(self.address, nonce, call_data);

        if !self.is_deployed(node).await? {
            tracing::info!(smart_account = %self.address, "Account not deployed yet, attaching init code");
            op = op.with_factory(self.factory, self.factory_data());
        }

        let fees = bundler.gas_price().await?;
        op = op.with_fees(fees.max_fee_per_gas, fees.max_priority_fee_per_gas);
        op.signature = dummy_signature();

        if bundler.config().sponsor_gas {
            let sponsorship = bundler.sponsor_user_operation(&op).await?;
            op.apply_sponsorship(&sponsorship);
            tracing::info!(paymaster = %sponsorship.paymaster, "Gas sponsored by paymaster");
        } else {
            let estimate = bundler.estimate_user_operation_gas(&op).await?;
            op.apply_gas_estimate(&estimate);
        }

        tracing::debug!(
            nonce = %op.nonce,
            call_gas_limit = %op.call_gas_limit,
            verification_gas_limit = %op.verification_gas_limit,
            pre_verification_gas = %op.pre_verification_gas,
            "User operation prepared"
        );
        Ok(op)
    }

    /// Sign `op` in place with the owner key. Returns the signed hash.
    pub async fn sign_user_operation(
        &self,
        op: &mut UserOperation,
        wallet: &Wallet,
        entry_point: Address,
        chain_id: u64,
    ) -> AccountResult<B256> {
        if wallet.address() != self.owner {
            return Err(AccountError::OwnerMismatch {
                signer: wallet.address(),
                owner: self.owner,
                account: self.address,
            });
        }

        let hash = op.hash(entry_point, chain_id);
        op.signature = wallet.sign_hash_message(hash).await?;
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, bytes};
    use alloy::signers::Signature;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const ENTRY_POINT: Address = address!("0000000071727de22e5e9d8baf0edac6f37da032");
    const FACTORY: Address = address!("91e60e0613810449d098b0b5ec8b51a0fe8c8985");

    fn account_for(owner: Address) -> SmartAccount {
        SmartAccount::new(
            address!("5555555555555555555555555555555555555555"),
            owner,
            FACTORY,
            U256::ZERO,
        )
    }

    #[test]
    fn test_encode_execute() {
        let target = address!("2222222222222222222222222222222222222222");
        let data = SmartAccount::encode_execute(target, U256::ZERO, bytes!("deadbeef"));

        assert_eq!(&data[..4], &SimpleAccount::executeCall::SELECTOR);
        let decoded = SimpleAccount::executeCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.dest, target);
        assert_eq!(decoded.func, bytes!("deadbeef"));
    }

    #[test]
    fn test_factory_data_encodes_owner_and_salt() {
        let owner = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let data = account_for(owner).factory_data();

        let decoded = SimpleAccountFactory::createAccountCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.owner, owner);
        assert_eq!(decoded.salt, U256::ZERO);
    }

    #[tokio::test]
    async fn test_sign_user_operation_recovers_owner() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let account = account_for(wallet.address());
        let mut op = UserOperation::new(account.address(), U256::ZERO, bytes!("b61d27f6"));

        let hash = account
            .sign_user_operation(&mut op, &wallet, ENTRY_POINT, 11_155_111)
            .await
            .unwrap();

        assert_eq!(hash, op.hash(ENTRY_POINT, 11_155_111));
        let signature = Signature::try_from(&op.signature[..]).unwrap();
        assert_eq!(
            signature.recover_address_from_msg(hash.as_slice()).unwrap(),
            wallet.address()
        );
    }

    #[tokio::test]
    async fn test_sign_rejects_foreign_key() {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let account = account_for(address!("9999999999999999999999999999999999999999"));
        let mut op = UserOperation::new(account.address(), U256::ZERO, Bytes::new());

        let err = account
            .sign_user_operation(&mut op, &wallet, ENTRY_POINT, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::OwnerMismatch { .. }));
        assert!(op.signature.is_empty());
    }
}
