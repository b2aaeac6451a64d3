mod alloy_bindings;
mod bindings;

pub use alloy_bindings::AlloyContractBindings;
pub use bindings::{AccountInformation, BindingError, ContractBindings, PendingTransaction};

use alloy::{
    network::{Ethereum, EthereumWallet},
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::{http::reqwest::Url, layers::RetryBackoffLayer},
};
use anyhow::{Context, Result};
use tracing::info;

use crate::config::LocalConfig;

/// BlockchainManager builds the providers and contract bindings the client runs on.
pub struct BlockchainManager;

impl BlockchainManager {
    /// Creates a read-only HTTP provider with retry/backoff on transport errors.
    ///
    /// # Arguments
    /// * `local_config` - Local configuration containing the RPC URL and retry settings
    pub fn get_provider(
        local_config: &LocalConfig,
    ) -> Result<impl Provider<Ethereum> + Clone + 'static> {
        let client = Self::get_rpc_client(local_config)?;
        Ok(ProviderBuilder::new().on_client(client))
    }

    /// Creates a provider that signs transactions with `wallet`.
    ///
    /// # Arguments
    /// * `local_config` - Local configuration containing the RPC URL and retry settings
    /// * `wallet` - Wallet holding the keys of every account that may send transactions
    pub fn get_signing_provider(
        local_config: &LocalConfig,
        wallet: EthereumWallet,
    ) -> Result<impl Provider<Ethereum> + Clone + 'static> {
        let client = Self::get_rpc_client(local_config)?;
        Ok(ProviderBuilder::new().wallet(wallet).on_client(client))
    }

    /// Wraps `provider` in DSC contract bindings after checking it serves the configured chain.
    pub async fn get_dsc_bindings<P: Provider<Ethereum> + Clone>(
        provider: P,
        local_config: &LocalConfig,
    ) -> Result<AlloyContractBindings<P>> {
        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to get chain id from RPC")?;

        if chain_id != local_config.chain_id {
            anyhow::bail!(
                "RPC serves chain {} but CHAIN_ID is {}",
                chain_id,
                local_config.chain_id
            );
        }

        info!(
            "Using DSCEngine {} on chain {}",
            local_config.dsc_engine_address, chain_id
        );

        Ok(AlloyContractBindings::new(provider, local_config))
    }

    fn get_rpc_client(local_config: &LocalConfig) -> Result<RpcClient> {
        let retry_layer = RetryBackoffLayer::new(
            local_config.rpc_max_retries,
            local_config.rpc_initial_backoff_ms,
            local_config.rpc_compute_units_per_second,
        );

        let url = Url::parse(&local_config.rpc_url).context("RPC_URL is not a valid URL")?;

        Ok(RpcClient::builder().layer(retry_layer).http(url))
    }
}
