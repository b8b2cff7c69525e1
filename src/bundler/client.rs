//! Bundler JSON-RPC client.
//!
//! # Responsibilities
//! - Generic JSON-RPC requests with a per-request timeout
//! - ERC-4337 methods: estimate, send, receipt
//! - Vendor gas price and paymaster sponsorship methods
//! - Receipt polling with backoff

use alloy::primitives::{Address, B256};
use alloy::rpc::client::{ClientBuilder, RpcClient};
use alloy::transports::TransportError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};

use crate::bundler::types::{
    BundlerError, BundlerResult, GasEstimate, GasPrice, GasPriceTiers, SponsorResult,
    SponsorshipPolicy, UserOperationReceipt,
};
use crate::bundler::user_operation::UserOperation;
use crate::config::BundlerConfig;
use crate::observability::metrics::{self, Endpoint};
use crate::resilience::calculate_backoff;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Client for the bundler endpoint, which also serves the paymaster extension.
#[derive(Clone)]
pub struct BundlerClient {
    rpc: RpcClient,
    config: BundlerConfig,
    timeout_duration: Duration,
}

impl BundlerClient {
    /// Create a new client. Does not touch the network.
    pub fn new(config: BundlerConfig) -> BundlerResult<Self> {
        let url: url::Url = config
            .url
            .parse()
            .map_err(|e: url::ParseError| BundlerError::InvalidUrl(e.to_string()))?;
        let rpc = ClientBuilder::default().http(url);

        Ok(Self {
            rpc,
            timeout_duration: Duration::from_secs(config.request_timeout_secs),
            config,
        })
    }

    /// Send one JSON-RPC request and decode its result.
    pub async fn request<P, R>(&self, method: &'static str, params: P) -> BundlerResult<R>
    where
        P: Serialize + Clone + Debug + Send + Sync + Unpin + 'static,
        R: DeserializeOwned + Debug + Send + Sync + Unpin + 'static,
    {
        let started = Instant::now();
        let result = timeout(self.timeout_duration, self.rpc.request(method, params)).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(response)) => {
                metrics::record_rpc_call(Endpoint::Bundler, method, true, elapsed);
                tracing::debug!(method, elapsed_ms = elapsed.as_millis() as u64, "Bundler call succeeded");
                Ok(response)
            }
            Ok(Err(e)) => {
                metrics::record_rpc_call(Endpoint::Bundler, method, false, elapsed);
                Err(map_transport_error(method, e))
            }
            Err(_) => {
                metrics::record_rpc_call(Endpoint::Bundler, method, false, elapsed);
                Err(BundlerError::Timeout {
                    method,
                    secs: self.config.request_timeout_secs,
                })
            }
        }
    }

    /// EntryPoints the bundler accepts.
    pub async fn supported_entry_points(&self) -> BundlerResult<Vec<Address>> {
        self.request("eth_supportedEntryPoints", ()).await
    }

    /// Fee quote for the configured tier, checked against the fee ceiling.
    pub async fn gas_price(&self) -> BundlerResult<GasPrice> {
        let tiers: GasPriceTiers = self.request("pimlico_getUserOperationGasPrice", ()).await?;
        let quote = tiers.tier(self.config.gas_price_tier);
        check_fee_ceiling(&quote, self.config.max_fee_per_gas_gwei)?;
        Ok(quote)
    }

    /// Gas limits for `op`, which must carry a stub signature.
    pub async fn estimate_user_operation_gas(&self, op: &UserOperation) -> BundlerResult<GasEstimate> {
        self.request(
            "eth_estimateUserOperationGas",
            (op.clone(), self.config.entry_point),
        )
        .await
    }

    /// Ask the paymaster to cover gas for `op`.
    pub async fn sponsor_user_operation(&self, op: &UserOperation) -> BundlerResult<SponsorResult> {
        match &self.config.sponsorship_policy_id {
            Some(id) => {
                let policy = SponsorshipPolicy {
                    sponsorship_policy_id: id.clone(),
                };
                self.request(
                    "pm_sponsorUserOperation",
                    (op.clone(), self.config.entry_point, policy),
                )
                .await
            }
            None => {
                self.request("pm_sponsorUserOperation", (op.clone(), self.config.entry_point))
                    .await
            }
        }
    }

    /// Submit a signed operation. Returns the user operation hash.
    pub async fn send_user_operation(&self, op: &UserOperation) -> BundlerResult<B256> {
        let hash: B256 = self
            .request("eth_sendUserOperation", (op.clone(), self.config.entry_point))
            .await?;
        tracing::info!(user_op_hash = %hash, sender = %op.sender, "User operation submitted");
        Ok(hash)
    }

    /// Receipt for `hash`, or `None` while the operation is still pending.
    pub async fn get_user_operation_receipt(
        &self,
        hash: B256,
    ) -> BundlerResult<Option<UserOperationReceipt>> {
        self.request("eth_getUserOperationReceipt", (hash,)).await
    }

    /// Poll until a receipt for `hash` appears or the receipt timeout elapses.
    pub async fn wait_for_receipt(&self, hash: B256) -> BundlerResult<UserOperationReceipt> {
        let budget = Duration::from_secs(self.config.receipt_timeout_secs);

        match timeout(budget, self.poll_receipt(hash)).await {
            Ok(receipt) => receipt,
            Err(_) => Err(BundlerError::ReceiptTimeout {
                hash,
                secs: self.config.receipt_timeout_secs,
            }),
        }
    }

    async fn poll_receipt(&self, hash: B256) -> BundlerResult<UserOperationReceipt> {
        let mut attempt = 0u32;
        loop {
            if let Some(receipt) = self.get_user_operation_receipt(hash).await? {
                return Ok(receipt);
            }
            let delay = calculate_backoff(
                attempt,
                self.config.poll_interval_ms,
                self.config.max_poll_interval_ms,
            );
            tracing::debug!(
                user_op_hash = %hash,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "User operation pending"
            );
            attempt = attempt.saturating_add(1);
            sleep(delay).await;
        }
    }

    /// EntryPoint this client submits to.
    pub fn entry_point(&self) -> Address {
        self.config.entry_point
    }

    /// Get the configuration.
    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }
}

impl std::fmt::Debug for BundlerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the URL usually embeds an API key
        f.debug_struct("BundlerClient")
            .field("entry_point", &self.config.entry_point)
            .field("timeout_secs", &self.config.request_timeout_secs)
            .finish()
    }
}

fn map_transport_error(method: &'static str, err: TransportError) -> BundlerError {
    if let Some(payload) = err.as_error_resp() {
        return BundlerError::Rpc {
            method,
            code: payload.code,
            message: payload.message.to_string(),
        };
    }
    BundlerError::Transport {
        method,
        message: err.to_string(),
    }
}

fn check_fee_ceiling(quote: &GasPrice, max_gwei: u64) -> BundlerResult<()> {
    let quoted_wei: u128 = quote.max_fee_per_gas.to();
    let limit_wei = u128::from(max_gwei) * WEI_PER_GWEI;
    if quoted_wei > limit_wei {
        return Err(BundlerError::GasPriceTooHigh {
            quoted_gwei: quoted_wei / WEI_PER_GWEI,
            max_gwei,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U128;

    #[test]
    fn test_invalid_url() {
        let config = BundlerConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            BundlerClient::new(config),
            Err(BundlerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_debug_hides_url() {
        let config = BundlerConfig {
            url: "https://bundler.example.com/rpc?apikey=secret".to_string(),
            ..Default::default()
        };
        let client = BundlerClient::new(config).unwrap();
        assert!(!format!("{:?}", client).contains("secret"));
    }

    #[test]
    fn test_fee_ceiling() {
        let quote = GasPrice {
            max_fee_per_gas: U128::from(30 * WEI_PER_GWEI),
            max_priority_fee_per_gas: U128::from(WEI_PER_GWEI),
        };
        assert!(check_fee_ceiling(&quote, 30).is_ok());

        let err = check_fee_ceiling(&quote, 29).unwrap_err();
        assert!(matches!(
            err,
            BundlerError::GasPriceTooHigh {
                quoted_gwei: 30,
                max_gwei: 29
            }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_bundler_is_transport_error() {
        let config = BundlerConfig {
            url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 5,
            ..Default::default()
        };
        let client = BundlerClient::new(config).unwrap();
        let err = client.supported_entry_points().await.unwrap_err();
        assert!(matches!(
            err,
            BundlerError::Transport {
                method: "eth_supportedEntryPoints",
                ..
            }
        ));
    }
}
