//! Node RPC client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to the node JSON-RPC endpoint (plus failovers)
//! - Query chain state (chain id, contract code)
//! - Execute read-only contract calls and decode them against `sol!` ABIs
//! - Handle timeouts and network errors gracefully

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::TransportResult;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId, NetworkConfig};
use crate::observability::metrics::{self, Endpoint};

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Node RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    /// Configuration.
    config: NetworkConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new client. Does not touch the network.
    pub fn new(config: NetworkConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        for url_str in &config.failover_urls {
            match url_str.parse() {
                Ok(url) => providers
                    .push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::debug!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            chain_id = config.chain_id,
            "Node client created"
        );

        Ok(Self {
            providers,
            config,
            timeout_duration,
        })
    }

    /// Run `f` against each provider in order until one answers.
    async fn with_failover<T, F, Fut>(&self, method: &'static str, f: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = None;
        for (i, provider) in self.providers.iter().enumerate() {
            let started = Instant::now();
            match timeout(self.timeout_duration, f(provider.clone())).await {
                Ok(Ok(result)) => {
                    metrics::record_rpc_call(Endpoint::Node, method, true, started.elapsed());
                    return Ok(result);
                }
                Ok(Err(e)) => {
                    metrics::record_rpc_call(Endpoint::Node, method, false, started.elapsed());
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_error = Some(BlockchainError::Rpc(format!("{method}: {e}")));
                }
                Err(_) => {
                    metrics::record_rpc_call(Endpoint::Node, method, false, started.elapsed());
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                    last_error = Some(BlockchainError::Timeout(self.config.rpc_timeout_secs));
                }
            }
        }

        match last_error {
            Some(e) if self.providers.len() == 1 => Err(e),
            Some(e) => Err(BlockchainError::Rpc(format!(
                "All {} RPC providers failed for {method}, last error: {e}",
                self.providers.len()
            ))),
            None => Err(BlockchainError::Rpc(format!("No RPC providers for {method}"))),
        }
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the deployed bytecode at `address` (empty when nothing is deployed).
    pub async fn get_code(&self, address: Address) -> BlockchainResult<Bytes> {
        self.with_failover("eth_getCode", |p| async move { p.get_code_at(address).await })
            .await
    }

    /// Execute a read-only `eth_call` and return the raw output.
    pub async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.with_failover("eth_call", |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    /// Encode `call`, execute it against `to`, and decode its return value.
    pub async fn call_decoded<C: SolCall>(&self, to: Address, call: &C) -> BlockchainResult<C::Return> {
        let output = self.call(to, call.abi_encode().into()).await?;
        C::abi_decode_returns(&output).map_err(|e| BlockchainError::Abi {
            function: C::SIGNATURE,
            reason: e.to_string(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Chain ID this client is configured for.
    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> NetworkConfig {
        NetworkConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337, // Anvil default
            rpc_timeout_secs: 2,
        }
    }

    #[test]
    fn test_client_creation_is_offline() {
        let client = BlockchainClient::new(test_config()).unwrap();
        assert_eq!(client.chain_id(), 31337);
    }

    #[test]
    fn test_invalid_primary_url() {
        let mut config = test_config();
        config.rpc_url = "not a url".to_string();
        let err = BlockchainClient::new(config).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[test]
    fn test_invalid_failover_is_skipped() {
        let mut config = test_config();
        config.failover_urls.push("::::".to_string());
        config.failover_urls.push("http://127.0.0.1:2".to_string());
        let client = BlockchainClient::new(config).unwrap();
        assert_eq!(client.providers.len(), 2);
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let mut config = test_config();
        config.failover_urls.push("http://127.0.0.1:2".to_string());

        let client = BlockchainClient::new(config).unwrap();
        let message = client.get_chain_id().await.unwrap_err().to_string();
        assert!(message.contains("All 2 RPC providers failed for eth_chainId"));
        assert!(message.contains("last error: RPC error: eth_chainId:"));
    }
}
