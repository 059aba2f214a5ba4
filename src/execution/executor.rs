// DANS : src/execution/executor.rs

use crate::decoders::raydium::amm_v4::keys::{fetch_pool_info, resolve_pool_keys, PoolInfo, PoolKeys};
use crate::errors::{SniperError, SniperResult};
use crate::execution::instruction_builder::{build_swap_instruction, KnownTokenAccounts, SwapInstructionBundle};
use crate::execution::planner::SwapPlan;
use crate::execution::retry::RetryPolicy;
use crate::rpc::ChainClient;
use anyhow::Context;
use async_trait::async_trait;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
#[allow(deprecated)]
use solana_sdk::system_instruction;
use spl_token::native_mint;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Paramètres de l'exécuteur, fixés au démarrage.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub slippage_percent: f64,
    /// Compte wSOL pré-créé. `None` : l'ATA wSOL du trader est résolue (et créée au besoin).
    pub wrapped_sol_account: Option<Pubkey>,
    /// Profit minimum (lamports) exigé au-dessus du coût d'achat pour vendre.
    pub min_profit_lamports: u64,
    pub sell_after_buy: bool,
    pub sell_retry: RetryPolicy,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            slippage_percent: 2.0,
            wrapped_sol_account: None,
            min_profit_lamports: 0,
            sell_after_buy: false,
            sell_retry: RetryPolicy::default(),
        }
    }
}

/// Ce qu'un swap confirmé laisse derrière lui, assez pour enchaîner une vente sans re-résoudre la pool.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub signature: Signature,
    pub input_account: Pubkey,
    pub output_account: Pubkey,
    /// Solde du compte de sortie, lu après confirmation. `None` si la lecture a échoué.
    pub output_balance: Option<u64>,
    pub plan: SwapPlan,
    pub pool_keys: PoolKeys,
    pub pool_info: PoolInfo,
}

#[derive(Debug, Clone)]
pub struct SnipeOutcome {
    pub buy: ExecutionResult,
    pub sell: Option<ExecutionResult>,
}

/// Le point d'entrée appelé par le listener pour chaque nouvelle pool.
#[async_trait]
pub trait PoolSniper: Send + Sync {
    async fn snipe(&self, amount_in: u64, token_mint: Pubkey, pool_id: Pubkey) -> SniperResult<SnipeOutcome>;
}

pub struct SwapExecutor {
    client: Arc<dyn ChainClient>,
    trader: Arc<Keypair>,
    settings: ExecutorSettings,
}

impl SwapExecutor {
    pub fn new(client: Arc<dyn ChainClient>, trader: Arc<Keypair>, settings: ExecutorSettings) -> Self {
        Self { client, trader, settings }
    }

    /// Résout la pool, lit les réserves, construit et envoie le swap `amount_in -> output_mint`.
    pub async fn execute_swap(&self, amount_in: u64, output_mint: &Pubkey, pool_id: &Pubkey) -> SniperResult<ExecutionResult> {
        info!(pool = %pool_id, output_mint = %output_mint, amount_in, "Début du swap.");
        let keys = resolve_pool_keys(self.client.as_ref(), pool_id).await?;
        let info = fetch_pool_info(self.client.as_ref(), &keys).await?;
        info!(
            pool = %pool_id,
            base_reserve = info.base_reserve,
            quote_reserve = info.quote_reserve,
            "Réserves de la pool récupérées."
        );

        let known = KnownTokenAccounts { wrapped_sol: self.settings.wrapped_sol_account, input: None };
        let bundle = self.build(&keys, &info, output_mint, amount_in, known).await?;
        self.submit(bundle, keys, info).await
    }

    /// Vend `amount_in` depuis un compte de token connu, avec des pool keys déjà résolues.
    ///
    /// Refuse d'envoyer si la sortie minimale ne couvre pas `cost_basis + min_profit_lamports`.
    pub async fn execute_sell_swap(
        &self,
        keys: &PoolKeys,
        info: &PoolInfo,
        output_mint: &Pubkey,
        input_account: &Pubkey,
        amount_in: u64,
        cost_basis: u64,
    ) -> SniperResult<ExecutionResult> {
        let known = KnownTokenAccounts { wrapped_sol: self.settings.wrapped_sol_account, input: Some(*input_account) };
        let bundle = self.build(keys, info, output_mint, amount_in, known).await?;

        let threshold = cost_basis.saturating_add(self.settings.min_profit_lamports);
        let min_amount_out = bundle.plan.min_amount_out.raw;
        if min_amount_out < threshold {
            info!(pool = %keys.id, min_amount_out, threshold, "Vente sous le seuil de profit, abandon.");
            return Err(SniperError::BelowThreshold { min_amount_out, threshold });
        }

        self.submit(bundle, keys.clone(), *info).await
    }

    /// Revend le résultat d'un achat. Chaque tentative relit les réserves (et le solde s'il est inconnu) ; le nombre de tentatives est borné.
    pub async fn sell_after_buy(&self, buy: &ExecutionResult) -> SniperResult<ExecutionResult> {
        let keys = &buy.pool_keys;
        let output_mint = buy.plan.input_mint;
        let cost_basis = buy.plan.amount_in.raw;

        self.settings
            .sell_retry
            .run("sell_after_buy", |attempt| async move {
                info!(pool = %keys.id, attempt, "Tentative de vente.");
                let amount_in = match buy.output_balance {
                    Some(balance) => balance,
                    None => self.client.get_token_balance(&buy.output_account).await?,
                };
                let info = fetch_pool_info(self.client.as_ref(), keys).await?;
                self.execute_sell_swap(keys, &info, &output_mint, &buy.output_account, amount_in, cost_basis)
                    .await
            })
            .await
    }

    async fn build(
        &self,
        keys: &PoolKeys,
        info: &PoolInfo,
        output_mint: &Pubkey,
        amount_in: u64,
        known: KnownTokenAccounts,
    ) -> SniperResult<SwapInstructionBundle> {
        build_swap_instruction(
            self.client.as_ref(),
            keys,
            info,
            output_mint,
            amount_in,
            self.settings.slippage_percent,
            &self.trader,
            known,
        )
        .await
    }

    /// Ajoute le wrap SOL -> wSOL si besoin, signe, envoie, attend la confirmation et lit le solde de sortie.
    async fn submit(&self, bundle: SwapInstructionBundle, keys: PoolKeys, info: PoolInfo) -> SniperResult<ExecutionResult> {
        let SwapInstructionBundle { instruction, input_account, output_account, plan } = bundle;
        let instructions = transaction_instructions(&self.trader.pubkey(), instruction, &plan, &input_account)?;

        let signature = self
            .client
            .sign_and_send(&instructions, &self.trader)
            .await
            .map_err(|e| {
                error!(pool = %keys.id, error = %e, "Échec de l'envoi du swap.");
                SniperError::BroadcastFailure(e)
            })?;
        info!(signature = %signature, "Transaction confirmée : https://solscan.io/tx/{}", signature);

        let output_balance = match self.client.get_token_balance(&output_account).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(account = %output_account, error = %e, "Solde de sortie illisible après confirmation.");
                None
            }
        };

        Ok(ExecutionResult { signature, input_account, output_account, output_balance, plan, pool_keys: keys, pool_info: info })
    }
}

/// `[transfer SOL -> wSOL, sync_native]` quand l'input est du SOL natif, puis le swap.
pub fn transaction_instructions(
    trader: &Pubkey,
    swap_instruction: Instruction,
    plan: &SwapPlan,
    input_account: &Pubkey,
) -> SniperResult<Vec<Instruction>> {
    let mut instructions = Vec::with_capacity(3);
    if plan.input_mint == native_mint::id() {
        #[allow(deprecated)]
        instructions.push(system_instruction::transfer(trader, input_account, plan.amount_in.raw));
        instructions.push(
            spl_token::instruction::sync_native(&spl_token::id(), input_account).context("sync_native instruction")?,
        );
    }
    instructions.push(swap_instruction);
    Ok(instructions)
}

#[async_trait]
impl PoolSniper for SwapExecutor {
    async fn snipe(&self, amount_in: u64, token_mint: Pubkey, pool_id: Pubkey) -> SniperResult<SnipeOutcome> {
        let buy = self.execute_swap(amount_in, &token_mint, &pool_id).await?;
        info!(
            pool = %pool_id,
            mint = %token_mint,
            spent_ui = buy.plan.amount_in.ui(),
            received = ?buy.output_balance,
            "Achat terminé."
        );

        if !self.settings.sell_after_buy {
            return Ok(SnipeOutcome { buy, sell: None });
        }

        let sell = self.sell_after_buy(&buy).await?;
        info!(pool = %pool_id, received = ?sell.output_balance, signature = %sell.signature, "Vente terminée.");
        Ok(SnipeOutcome { buy, sell: Some(sell) })
    }
}
