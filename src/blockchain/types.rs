//! Chain-specific types and error definitions.

use thiserror::Error;

// Re-export NetworkConfig from config module to avoid duplication
pub use crate::config::schema::NetworkConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Errors that can occur during node access or owner-key operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A contract call returned data that does not decode against its ABI.
    #[error("ABI decode failed for {function}: {reason}")]
    Abi {
        function: &'static str,
        reason: String,
    },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
