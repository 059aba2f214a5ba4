// DANS : src/execution/instruction_builder.rs

use crate::decoders::raydium::amm_v4::keys::{PoolInfo, PoolKeys};
use crate::errors::SniperResult;
use crate::execution::planner::{plan_swap, SwapPlan};
use crate::rpc::ChainClient;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
use spl_token::native_mint;
use tracing::{debug, info};

/// Discriminateur de SwapBaseIn sur l'AMM V4.
pub const SWAP_BASE_IN_OPCODE: u8 = 9;
pub const SWAP_ACCOUNT_COUNT: usize = 17;

/// Le résultat de `build_swap_instruction` : l'instruction prête à signer et ce qui a servi à la construire.
#[derive(Debug, Clone)]
pub struct SwapInstructionBundle {
    pub instruction: Instruction,
    pub input_account: Pubkey,
    pub output_account: Pubkey,
    pub plan: SwapPlan,
}

/// Comptes de tokens déjà connus de l'appelant.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownTokenAccounts {
    /// Compte wSOL pré-configuré, utilisé pour le côté SOL natif.
    pub wrapped_sol: Option<Pubkey>,
    /// Compte d'input déjà résolu (flux de vente).
    pub input: Option<Pubkey>,
}

/// `opcode:1 | amount_in:8 LE | min_amount_out:8 LE`
pub fn swap_instruction_data(amount_in: u64, min_amount_out: u64) -> Vec<u8> {
    let mut instruction_data = Vec::with_capacity(17);
    instruction_data.push(SWAP_BASE_IN_OPCODE);
    instruction_data.extend_from_slice(&amount_in.to_le_bytes());
    instruction_data.extend_from_slice(&min_amount_out.to_le_bytes());
    instruction_data
}

/// Assemble l'instruction SwapBaseIn. L'ordre des 17 comptes est imposé par le programme.
pub fn swap_base_in_instruction(
    keys: &PoolKeys,
    user_source_token_account: &Pubkey,
    user_destination_token_account: &Pubkey,
    user_owner: &Pubkey,
    amount_in: u64,
    minimum_amount_out: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new(keys.market_id, false),
        AccountMeta::new(keys.market_bids, false),
        AccountMeta::new(keys.market_asks, false),
        AccountMeta::new(keys.market_event_queue, false),
        AccountMeta::new(keys.market_base_vault, false),
        AccountMeta::new(keys.market_quote_vault, false),
        AccountMeta::new_readonly(keys.market_authority, false),
        AccountMeta::new(*user_source_token_account, false),
        AccountMeta::new(*user_destination_token_account, false),
        AccountMeta::new_readonly(*user_owner, true),
    ];

    Instruction {
        program_id: keys.program_id,
        accounts,
        data: swap_instruction_data(amount_in, minimum_amount_out),
    }
}

/// Planifie le swap, résout (ou crée) les deux comptes de tokens, puis assemble l'instruction.
///
/// Effet de bord possible : la création d'une ATA on-chain (une transaction à part entière).
#[allow(clippy::too_many_arguments)]
pub async fn build_swap_instruction(
    client: &dyn ChainClient,
    keys: &PoolKeys,
    info: &PoolInfo,
    output_mint: &Pubkey,
    amount_in_raw: u64,
    slippage_percent: f64,
    trader: &Keypair,
    known: KnownTokenAccounts,
) -> SniperResult<SwapInstructionBundle> {
    let plan = plan_swap(keys, info, output_mint, amount_in_raw, slippage_percent)?;
    debug!(
        input_mint = %plan.input_mint,
        output_mint = %plan.output_mint,
        amount_in = plan.amount_in.raw,
        min_amount_out = plan.min_amount_out.raw,
        expected_ui = plan.expected_amount_out.ui(),
        "Plan de swap calculé."
    );

    let input_account = match known.input {
        Some(account) => account,
        None => resolve_token_account(client, trader, &plan.input_mint, known.wrapped_sol).await?,
    };
    let output_account = resolve_token_account(client, trader, &plan.output_mint, known.wrapped_sol).await?;

    let instruction = swap_base_in_instruction(
        keys,
        &input_account,
        &output_account,
        &trader.pubkey(),
        plan.amount_in.raw,
        plan.min_amount_out.raw,
    );

    info!(
        pool = %keys.id,
        input_account = %input_account,
        output_account = %output_account,
        "Instruction de swap construite."
    );

    Ok(SwapInstructionBundle { instruction, input_account, output_account, plan })
}

/// Le côté SOL natif utilise le compte wSOL configuré ; les autres passent par "get or create".
async fn resolve_token_account(
    client: &dyn ChainClient,
    trader: &Keypair,
    mint: &Pubkey,
    wrapped_sol: Option<Pubkey>,
) -> SniperResult<Pubkey> {
    if *mint == native_mint::id() {
        if let Some(account) = wrapped_sol {
            return Ok(account);
        }
    }
    Ok(client.get_or_create_associated_account(trader, mint).await?)
}
