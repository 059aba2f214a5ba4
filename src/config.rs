
use crate::execution::executor::ExecutorSettings;
use crate::execution::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::str::FromStr;
use std::time::Duration;

#[derive(Deserialize, Debug)]
pub struct Config {
    pub solana_rpc_url: String,
    pub solana_wss_url: String,
    #[serde(alias = "solana_wallet")]
    pub payer_private_key: String,
    pub associated_sol_account: Option<String>,

    #[serde(default = "default_sol_to_trade")]
    pub sol_to_trade: u64,
    #[serde(default = "default_slippage_percent")]
    pub slippage_percent: f64,
    #[serde(default)]
    pub min_profit_lamports: u64,
    #[serde(default)]
    pub sell_after_buy: bool,
    #[serde(default = "default_sell_retry_max_attempts")]
    pub sell_retry_max_attempts: u32,
    #[serde(default = "default_sell_retry_base_delay_ms")]
    pub sell_retry_base_delay_ms: u64,
    #[serde(default = "default_sell_retry_max_delay_ms")]
    pub sell_retry_max_delay_ms: u64,

    #[serde(default = "default_rpc_max_retries")]
    pub rpc_max_retries: u8,
    #[serde(default = "default_rpc_retry_delay_ms")]
    pub rpc_retry_delay_ms: u64,
    #[serde(default = "default_signature_cache_capacity")]
    pub signature_cache_capacity: usize,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_close_delay_ms")]
    pub close_delay_ms: u64,
}

fn default_sol_to_trade() -> u64 { 100_000 }
fn default_slippage_percent() -> f64 { 2.0 }
fn default_sell_retry_max_attempts() -> u32 { 10 }
fn default_sell_retry_base_delay_ms() -> u64 { 500 }
fn default_sell_retry_max_delay_ms() -> u64 { 10_000 }
fn default_rpc_max_retries() -> u8 { 3 }
fn default_rpc_retry_delay_ms() -> u64 { 200 }
fn default_signature_cache_capacity() -> usize { 1_024 }
fn default_close_delay_ms() -> u64 { 10_000 }

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()?;
        Ok(config)
    }

    /// La clé privée est attendue en base58 (64 octets).
    pub fn keypair(&self) -> Result<Keypair> {
        let bytes = bs58::decode(self.payer_private_key.trim())
            .into_vec()
            .context("PAYER_PRIVATE_KEY n'est pas du base58 valide")?;
        Keypair::try_from(bytes.as_slice()).context("PAYER_PRIVATE_KEY n'est pas un keypair de 64 octets")
    }

    pub fn associated_sol_account(&self) -> Result<Option<Pubkey>> {
        self.associated_sol_account
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Pubkey::from_str(s).with_context(|| format!("ASSOCIATED_SOL_ACCOUNT invalide : {}", s)))
            .transpose()
    }

    pub fn sell_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.sell_retry_max_attempts,
            base_delay: Duration::from_millis(self.sell_retry_base_delay_ms),
            max_delay: Duration::from_millis(self.sell_retry_max_delay_ms),
        }
    }

    pub fn executor_settings(&self) -> Result<ExecutorSettings> {
        Ok(ExecutorSettings {
            slippage_percent: self.slippage_percent,
            wrapped_sol_account: self.associated_sol_account()?,
            min_profit_lamports: self.min_profit_lamports,
            sell_after_buy: self.sell_after_buy,
            sell_retry: self.sell_retry_policy(),
        })
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}
