use alloy::primitives::Address;
use anyhow::Result;

use super::env_helper::{load_env_list, load_env_var, load_env_var_or};

#[derive(Clone)]
pub struct LocalConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub dsc_engine_address: Address,
    pub dsc_address: Address,
    pub collateral_token_address: Address,
    /// Hex private keys backing the local wallet. Empty means no wallet is available.
    pub wallet_private_keys: Vec<String>,
    pub auto_refresh_interval_secs: u64,
    pub rpc_max_retries: u32,
    pub rpc_initial_backoff_ms: u64,
    pub rpc_compute_units_per_second: u64,
    pub log_inside_file: bool,
    pub log_directory: String,
}

impl LocalConfig {
    pub fn load_from_env() -> Result<Self> {
        Ok(Self {
            rpc_url: load_env_var("RPC_URL")?,
            chain_id: load_env_var("CHAIN_ID")?,
            dsc_engine_address: load_env_var("DSC_ENGINE_ADDRESS")?,
            dsc_address: load_env_var("DSC_ADDRESS")?,
            collateral_token_address: load_env_var("COLLATERAL_TOKEN_ADDRESS")?,
            wallet_private_keys: load_env_list("WALLET_PRIVATE_KEYS")?,
            auto_refresh_interval_secs: load_env_var_or("AUTO_REFRESH_INTERVAL_SECS", 12)?,
            rpc_max_retries: load_env_var_or("RPC_MAX_RETRIES", 10)?,
            rpc_initial_backoff_ms: load_env_var_or("RPC_INITIAL_BACKOFF_MS", 1000)?,
            rpc_compute_units_per_second: load_env_var_or("RPC_COMPUTE_UNITS_PER_SECOND", 10000)?,
            log_inside_file: load_env_var_or("LOG_INSIDE_FILE", false)?,
            log_directory: load_env_var_or("LOG_DIRECTORY", ".logs".to_string())?,
        })
    }

    pub fn has_wallet(&self) -> bool {
        !self.wallet_private_keys.is_empty()
    }
}

// Private keys stay out of logs.
impl std::fmt::Debug for LocalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("dsc_engine_address", &self.dsc_engine_address)
            .field("dsc_address", &self.dsc_address)
            .field("collateral_token_address", &self.collateral_token_address)
            .field("wallet_accounts", &self.wallet_private_keys.len())
            .field("auto_refresh_interval_secs", &self.auto_refresh_interval_secs)
            .field("rpc_max_retries", &self.rpc_max_retries)
            .field("rpc_initial_backoff_ms", &self.rpc_initial_backoff_ms)
            .field(
                "rpc_compute_units_per_second",
                &self.rpc_compute_units_per_second,
            )
            .field("log_inside_file", &self.log_inside_file)
            .field("log_directory", &self.log_directory)
            .finish()
    }
}
