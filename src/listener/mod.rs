// DANS : src/listener/mod.rs
// Écoute les logs de l'AMM V4, repère les créations de pool et déclenche le sniper.

pub mod extract;
pub mod state;

use crate::decoders::raydium::amm_v4::pool::RAYDIUM_AMM_V4_PROGRAM_ID;
use crate::errors::{SniperError, SniperResult};
use crate::execution::executor::{PoolSniper, SnipeOutcome};
use crate::execution::retry::RetryPolicy;
use crate::rpc::ChainClient;
use anyhow::{Context, Result};
use extract::extract_new_pool;
use futures_util::StreamExt;
use solana_client::{
    nonblocking::pubsub_client::PubsubClient,
    rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter},
    rpc_response::RpcLogsResponse,
};
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use state::ListenerState;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Nom de l'instruction de création de pool, tel qu'il apparaît dans les logs.
pub const INSTRUCTION_NAME: &str = "initialize2";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Un lot de logs d'une transaction, détaché du type du websocket.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub signature: String,
    pub logs: Vec<String>,
    pub failed: bool,
}

impl From<RpcLogsResponse> for LogEvent {
    fn from(response: RpcLogsResponse) -> Self {
        Self {
            failed: response.err.is_some(),
            signature: response.signature,
            logs: response.logs,
        }
    }
}

/// Ce que le listener a fait d'un événement.
#[derive(Debug)]
pub enum EventDecision {
    TransactionFailed,
    NotPoolCreation,
    InvalidSignature,
    AlreadyProcessed,
    /// Une autre exécution est en vol : l'événement est abandonné, pas mis en file.
    ExecutionInFlight,
    Dispatched(JoinHandle<()>),
}

pub struct PoolCreationListener {
    client: Arc<dyn ChainClient>,
    sniper: Arc<dyn PoolSniper>,
    trade_size: u64,
    fetch_retry: RetryPolicy,
    state: ListenerState,
}

impl PoolCreationListener {
    pub fn new(client: Arc<dyn ChainClient>, sniper: Arc<dyn PoolSniper>, trade_size: u64, cache_capacity: usize) -> Self {
        Self {
            client,
            sniper,
            trade_size,
            // La transaction peut ne pas être encore servie par le nœud RPC juste après ses logs.
            fetch_retry: RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(250),
                max_delay: Duration::from_secs(2),
            },
            state: ListenerState::new(cache_capacity),
        }
    }

    pub fn with_fetch_retry(mut self, fetch_retry: RetryPolicy) -> Self {
        self.fetch_retry = fetch_retry;
        self
    }

    pub fn state(&self) -> &ListenerState {
        &self.state
    }

    /// IDLE -> MATCHED -> EXECUTING. L'exécution tourne dans une tâche à part pour que le flux continue d'être drainé.
    pub fn handle_log_event(&mut self, event: LogEvent) -> EventDecision {
        if event.failed {
            return EventDecision::TransactionFailed;
        }
        if !event.logs.iter().any(|log| log.contains(INSTRUCTION_NAME)) {
            return EventDecision::NotPoolCreation;
        }

        let signature = match Signature::from_str(&event.signature) {
            Ok(signature) => signature,
            Err(e) => {
                warn!(signature = %event.signature, error = %e, "Signature illisible, événement ignoré.");
                return EventDecision::InvalidSignature;
            }
        };

        // Retenue même si l'événement est abandonné : une redélivrance tardive ne doit pas trader une pool périmée.
        if !self.state.remember(&event.signature) {
            debug!(signature = %signature, "Signature déjà traitée.");
            return EventDecision::AlreadyProcessed;
        }

        let Some(guard) = self.state.try_begin() else {
            info!(signature = %signature, "Exécution déjà en cours, nouvelle pool ignorée.");
            return EventDecision::ExecutionInFlight;
        };

        info!(signature = %signature, "Création de pool détectée : https://solscan.io/tx/{}", signature);

        let client = self.client.clone();
        let sniper = self.sniper.clone();
        let trade_size = self.trade_size;
        let fetch_retry = self.fetch_retry;
        EventDecision::Dispatched(tokio::spawn(async move {
            let _guard = guard;
            match process_pool_creation(client.as_ref(), sniper.as_ref(), trade_size, fetch_retry, &signature).await {
                Ok(outcome) => info!(
                    signature = %signature,
                    buy = %outcome.buy.signature,
                    sold = outcome.sell.is_some(),
                    "Pipeline terminé."
                ),
                Err(SniperError::NoNewToken(reason)) => info!(signature = %signature, reason = %reason, "Aucun nouveau token, rien à faire."),
                Err(e) => error!(signature = %signature, error = %e, "Échec du pipeline."),
            }
        }))
    }

    /// Boucle infinie : (re)connexion au websocket, puis traitement des événements. Reconnexion après 5s.
    pub async fn run(mut self, wss_url: &str) {
        loop {
            info!(url = wss_url, "Connexion au websocket.");
            match self.listen(wss_url).await {
                Ok(()) => warn!("Le flux de logs s'est terminé. Reconnexion..."),
                Err(e) => error!(error = %format!("{:#}", e), "Erreur dans le flux de logs. Reconnexion dans 5s..."),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn listen(&mut self, wss_url: &str) -> Result<()> {
        let pubsub = PubsubClient::new(wss_url)
            .await
            .with_context(|| format!("Connexion au websocket {}", wss_url))?;
        let (mut stream, unsubscribe) = pubsub
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![RAYDIUM_AMM_V4_PROGRAM_ID.to_string()]),
                RpcTransactionLogsConfig { commitment: Some(CommitmentConfig::confirmed()) },
            )
            .await
            .context("Échec de l'abonnement aux logs")?;

        info!(program = %RAYDIUM_AMM_V4_PROGRAM_ID, "Abonnement réussi. En attente des créations de pool...");

        while let Some(response) = stream.next().await {
            let decision = self.handle_log_event(LogEvent::from(response.value));
            if let EventDecision::Dispatched(_) = decision {
                debug!(slot = response.context.slot, "Exécution lancée.");
            }
        }

        drop(stream);
        unsubscribe().await;
        Ok(())
    }
}

/// EXECUTING : transaction -> instruction AMM -> (AMM id, mint) -> sniper.
async fn process_pool_creation(
    client: &dyn ChainClient,
    sniper: &dyn PoolSniper,
    trade_size: u64,
    fetch_retry: RetryPolicy,
    signature: &Signature,
) -> SniperResult<SnipeOutcome> {
    let instructions = fetch_retry
        .run("get_transaction", |_| async move {
            client
                .get_transaction_instructions(signature)
                .await?
                .ok_or_else(|| SniperError::NotFound(format!("transaction {}", signature)))
        })
        .await?;

    let accounts = instructions
        .into_iter()
        .find(|ix| ix.program_id == RAYDIUM_AMM_V4_PROGRAM_ID)
        .map(|ix| ix.accounts)
        .ok_or_else(|| SniperError::NotFound(format!("instruction AMM V4 dans {}", signature)))?;

    let new_pool = extract_new_pool(&accounts)?;
    info!(pool = %new_pool.amm_id, mint = %new_pool.token_mint, trade_size, "Nouvelle pool extraite.");

    sniper.snipe(trade_size, new_pool.token_mint, new_pool.amm_id).await
}
