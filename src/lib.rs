//! MagicSpend withdrawal client library

pub mod account;
pub mod blockchain;
pub mod bundler;
pub mod config;
pub mod flow;
pub mod magic_spend;
pub mod observability;
pub mod resilience;

pub use config::schema::DemoConfig;
pub use flow::{FlowError, WithdrawalFlow, WithdrawalOutcome};
