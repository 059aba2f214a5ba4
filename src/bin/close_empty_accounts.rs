// DANS : src/bin/close_empty_accounts.rs
// Ferme les comptes de tokens vides du wallet (hors wSOL) et récupère la rent.

use anyhow::Result;
use sniper::{
    config::Config,
    monitoring::logging::setup_logging,
    rpc::ResilientRpcClient,
    wallet::cleanup::{close_token_accounts, list_empty_token_accounts},
};
use solana_sdk::signer::Signer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    setup_logging(config.log_json);

    let payer = config.keypair()?;
    let rpc = ResilientRpcClient::new(config.solana_rpc_url.clone(), config.rpc_max_retries, config.rpc_retry_delay_ms);

    let empty_accounts = list_empty_token_accounts(&rpc, &payer.pubkey()).await?;
    if empty_accounts.is_empty() {
        info!(wallet = %payer.pubkey(), "Aucun compte de token vide à fermer.");
        return Ok(());
    }
    info!(wallet = %payer.pubkey(), count = empty_accounts.len(), "Comptes vides à fermer.");

    let report = close_token_accounts(&rpc, &payer, &empty_accounts, config.close_delay()).await;
    info!(closed = report.closed.len(), failed = report.failed.len(), "Nettoyage terminé.");

    Ok(())
}
