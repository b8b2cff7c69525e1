//! Owner key management and message signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables or explicit strings
//! - Keys are never logged or serialized

use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signature, Signer};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable name for the owner private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "MAGIC_SPEND_PRIVATE_KEY";

/// The EOA that owns the smart account and signs allowances.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// Accepts the key with or without a `0x` prefix.
    pub fn from_private_key(private_key_hex: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;

        tracing::info!(owner = %signer.address(), "Owner key loaded");

        Ok(Self { signer })
    }

    /// Load wallet from `MAGIC_SPEND_PRIVATE_KEY`.
    pub fn from_env() -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Get the owner address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign arbitrary message bytes (with Ethereum prefix).
    pub async fn sign_message(&self, message: &[u8]) -> BlockchainResult<Signature> {
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Message signing failed: {}", e)))
    }

    /// Sign a 32-byte digest as a raw EIP-191 message and return `r || s || v`.
    ///
    /// This is the form both the stake manager and SimpleAccount recover
    /// against: the digest bytes themselves are the message, not its hex.
    pub async fn sign_hash_message(&self, hash: B256) -> BlockchainResult<Bytes> {
        let signature = self.sign_message(hash.as_slice()).await?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}
