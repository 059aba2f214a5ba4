// DANS: src/decoders/raydium/amm_v4/openbook_market.rs

use crate::errors::{SniperError, SniperResult};
use bytemuck::{bytes_of, try_pod_read_unaligned, Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;
use std::mem::size_of;

/// Taille exacte d'un compte de marché OpenBook (MARKET_STATE_LAYOUT_V3).
pub const MARKET_STATE_LEN: usize = size_of::<MarketState>();

/// Le compte de marché commence par le préfixe "serum" (5 octets) et finit par 7 octets de padding.
#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct MarketState {
    pub head_padding: [u8; 5],
    pub account_flags: u64,
    pub own_address: Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub base_deposits_total: u64,
    pub base_fees_accrued: u64,
    pub quote_vault: Pubkey,
    pub quote_deposits_total: u64,
    pub quote_fees_accrued: u64,
    pub quote_dust_threshold: u64,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub fee_rate_bps: u64,
    pub referrer_rebates_accrued: u64,
    pub tail_padding: [u8; 7],
}

impl MarketState {
    /// Dérive l'autorité du marché (vault signer) à partir de `(own_address, vault_signer_nonce)`.
    pub fn vault_signer(&self, market_program_id: &Pubkey) -> SniperResult<Pubkey> {
        let own_address = self.own_address;
        let nonce = self.vault_signer_nonce;
        Pubkey::create_program_address(&[&own_address.to_bytes(), &nonce.to_le_bytes()], market_program_id)
            .map_err(|e| SniperError::Decode(format!("vault signer derivation failed for market {}: {}", own_address, e)))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bytes_of(self).to_vec()
    }
}

/// Décode un compte de marché OpenBook. La taille doit être exacte.
pub fn decode_market_state(data: &[u8]) -> SniperResult<MarketState> {
    if data.len() != MARKET_STATE_LEN {
        return Err(SniperError::Decode(format!(
            "Market data length mismatch. Expected {}, got {}.",
            MARKET_STATE_LEN,
            data.len()
        )));
    }
    try_pod_read_unaligned::<MarketState>(data).map_err(|e| SniperError::Decode(format!("Market: {:?}", e)))
}
