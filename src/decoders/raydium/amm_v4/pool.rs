// DANS: src/decoders/raydium/amm_v4/pool.rs

use crate::errors::{SniperError, SniperResult};
use bytemuck::{bytes_of, try_pod_read_unaligned, Pod, Zeroable};
use solana_sdk::{pubkey, pubkey::Pubkey};
use std::mem::size_of;

pub const RAYDIUM_AMM_V4_PROGRAM_ID: Pubkey = pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

/// Autorité des pools AMM V4 (PDA "amm authority", constante pour cette version du programme).
pub const RAYDIUM_AMM_V4_AUTHORITY: Pubkey = pubkey!("5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1");

/// Taille exacte d'un compte AMM V4 (LIQUIDITY_STATE_LAYOUT_V4).
pub const AMM_STATE_LEN: usize = size_of::<AmmState>();

// Les structures on-chain, champ pour champ.
#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Fees {
    pub min_separate_numerator: u64, pub min_separate_denominator: u64,
    pub trade_fee_numerator: u64, pub trade_fee_denominator: u64,
    pub pnl_numerator: u64, pub pnl_denominator: u64,
    pub swap_fee_numerator: u64, pub swap_fee_denominator: u64,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct OutPutData {
    pub need_take_pnl_coin: u64, pub need_take_pnl_pc: u64,
    pub total_pnl_pc: u64, pub total_pnl_coin: u64,
    pub pool_open_time: u64, pub punish_pc_amount: u64,
    pub punish_coin_amount: u64, pub orderbook_to_init_time: u64,
    pub swap_coin_in_amount: u128, pub swap_pc_out_amount: u128,
    pub swap_take_pc_fee: u64, pub swap_pc_in_amount: u128,
    pub swap_coin_out_amount: u128, pub swap_take_coin_fee: u64,
}

/// L'état brut d'un compte AMM V4. "coin" = base, "pc" = quote.
///
/// Les quantités 128 bits restent des `u128` : aucune conversion avec perte.
#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct AmmState {
    pub status: u64, pub nonce: u64, pub order_num: u64, pub depth: u64,
    pub coin_decimals: u64, pub pc_decimals: u64, pub state: u64,
    pub reset_flag: u64, pub min_size: u64, pub vol_max_cut_ratio: u64,
    pub amount_wave: u64, pub coin_lot_size: u64, pub pc_lot_size: u64,
    pub min_price_multiplier: u64, pub max_price_multiplier: u64,
    pub sys_decimal_value: u64, pub fees: Fees, pub out_put: OutPutData,
    pub token_coin: Pubkey, pub token_pc: Pubkey, pub coin_mint: Pubkey,
    pub pc_mint: Pubkey, pub lp_mint: Pubkey, pub open_orders: Pubkey,
    pub market: Pubkey, pub serum_dex: Pubkey, pub target_orders: Pubkey,
    pub withdraw_queue: Pubkey, pub token_temp_lp: Pubkey,
    pub amm_owner: Pubkey, pub lp_amount: u64, pub client_order_id: u64,
    pub padding: [u64; 2],
}

impl AmmState {
    /// Décimales du token de base. Un layout valide ne dépasse jamais 255.
    pub fn base_decimals(&self) -> SniperResult<u8> {
        let decimals = self.coin_decimals;
        u8::try_from(decimals).map_err(|_| SniperError::Decode(format!("base decimals {} out of range", decimals)))
    }

    pub fn quote_decimals(&self) -> SniperResult<u8> {
        let decimals = self.pc_decimals;
        u8::try_from(decimals).map_err(|_| SniperError::Decode(format!("quote decimals {} out of range", decimals)))
    }

    /// Réserve de base disponible pour un swap, une fois le PnL à prélever retiré.
    pub fn base_reserve(&self, vault_amount: u64) -> u64 {
        let need_take = self.out_put.need_take_pnl_coin;
        vault_amount.saturating_sub(need_take)
    }

    pub fn quote_reserve(&self, vault_amount: u64) -> u64 {
        let need_take = self.out_put.need_take_pnl_pc;
        vault_amount.saturating_sub(need_take)
    }

    /// Ré-encode l'état avec le même layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        bytes_of(self).to_vec()
    }
}

/// Décode un compte Raydium AMM V4. La taille doit être exacte.
pub fn decode_amm_state(data: &[u8]) -> SniperResult<AmmState> {
    if data.len() != AMM_STATE_LEN {
        return Err(SniperError::Decode(format!(
            "AMM V4 data length mismatch. Expected {}, got {}.",
            AMM_STATE_LEN,
            data.len()
        )));
    }
    try_pod_read_unaligned::<AmmState>(data).map_err(|e| SniperError::Decode(format!("AMM V4: {:?}", e)))
}
