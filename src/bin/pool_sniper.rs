// DANS : src/bin/pool_sniper.rs

use anyhow::Result;
use sniper::{
    config::Config,
    execution::executor::SwapExecutor,
    listener::PoolCreationListener,
    monitoring::logging::setup_logging,
    rpc::ResilientRpcClient,
};
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration et logs
    let config = Config::load()?;
    setup_logging(config.log_json);

    let payer = Arc::new(config.keypair()?);
    let settings = config.executor_settings()?;
    info!(
        wallet = %payer.pubkey(),
        trade_size = config.sol_to_trade,
        slippage = settings.slippage_percent,
        sell_after_buy = settings.sell_after_buy,
        "--- Démarrage du sniper Raydium AMM V4 ---"
    );

    // 2. Client RPC partagé par l'exécuteur et le listener
    let rpc = Arc::new(ResilientRpcClient::new(
        config.solana_rpc_url.clone(),
        config.rpc_max_retries,
        config.rpc_retry_delay_ms,
    ));
    let executor = Arc::new(SwapExecutor::new(rpc.clone(), payer, settings));

    // 3. Boucle d'écoute (ne rend jamais la main)
    let listener = PoolCreationListener::new(rpc, executor, config.sol_to_trade, config.signature_cache_capacity);
    listener.run(&config.solana_wss_url).await;

    Ok(())
}
