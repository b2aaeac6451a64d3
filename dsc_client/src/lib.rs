pub mod account_cache;
pub mod blockchain_manager;
pub mod config;
pub mod errors;
pub mod utils;
pub mod wallet;
