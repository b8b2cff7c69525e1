//! Node access and owner key.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key, RPC URL)
//!     → wallet.rs (key loading, EIP-191 signing)
//!     → client.rs (RPC connection with timeouts, eth_call + ABI decode)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use types::{BlockchainError, BlockchainResult, ChainId};
pub use wallet::Wallet;
