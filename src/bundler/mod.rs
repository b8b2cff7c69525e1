//! ERC-4337 bundler access.
//!
//! # Data Flow
//! ```text
//! UserOperation (unpacked, JSON-RPC form)
//!     → client.rs (estimate / sponsor / send over JSON-RPC)
//!     → user_operation.rs (pack + hash for signing)
//!     → client.rs (poll eth_getUserOperationReceipt)
//! ```

pub mod client;
pub mod types;
pub mod user_operation;

pub use client::BundlerClient;
pub use types::{
    BundlerError, BundlerResult, GasEstimate, GasPrice, SponsorResult, UserOperationReceipt,
};
pub use user_operation::{PackedUserOperation, UserOperation};
