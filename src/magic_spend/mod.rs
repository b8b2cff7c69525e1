//! MagicSpend paymaster extension.
//!
//! # Data Flow
//! ```text
//! client.rs (vendor JSON-RPC over the bundler endpoint)
//!     → types.rs (wire records, checked conversion)
//!     → contracts.rs (ABI structs hashed on-chain or encoded into calls)
//! ```

pub mod client;
pub mod contracts;
pub mod types;

pub use client::MagicSpendClient;
pub use types::{
    total_staked, Allowance, AllowanceAsset, MagicSpendContracts, MagicSpendError,
    MagicSpendResult, Stake, Withdrawal,
};
