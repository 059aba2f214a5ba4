// DANS : src/listener/extract.rs

use crate::errors::{SniperError, SniperResult};
use solana_sdk::{pubkey::Pubkey, sysvar};
use spl_token::native_mint;

// Positions des comptes dans l'instruction `initialize2` de l'AMM V4.
pub const AMM_ID_INDEX: usize = 4;
pub const COIN_MINT_INDEX: usize = 8;
pub const PC_MINT_INDEX: usize = 9;

/// Certaines variantes de la transaction placent le sysvar Rent à l'index de l'AMM.
/// L'AMM est alors à l'index suivant. Convention observée, non documentée par le programme.
pub const SYSVAR_RENT: Pubkey = sysvar::rent::ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewPool {
    pub amm_id: Pubkey,
    /// Le mint qui n'est pas du SOL natif.
    pub token_mint: Pubkey,
}

/// Lit l'id de l'AMM et le nouveau mint dans les comptes de l'instruction de création.
pub fn extract_new_pool(accounts: &[Pubkey]) -> SniperResult<NewPool> {
    if accounts.len() <= PC_MINT_INDEX {
        return Err(SniperError::Decode(format!(
            "initialize2 avec {} comptes, au moins {} attendus",
            accounts.len(),
            PC_MINT_INDEX + 1
        )));
    }

    let amm_id = if accounts[AMM_ID_INDEX] == SYSVAR_RENT {
        accounts[AMM_ID_INDEX + 1]
    } else {
        accounts[AMM_ID_INDEX]
    };

    let native = native_mint::id();
    let (coin_mint, pc_mint) = (accounts[COIN_MINT_INDEX], accounts[PC_MINT_INDEX]);
    let token_mint = match (coin_mint == native, pc_mint == native) {
        (false, true) => coin_mint,
        (true, false) => pc_mint,
        _ => {
            return Err(SniperError::NoNewToken(format!(
                "pool {} : mints {} / {}",
                amm_id, coin_mint, pc_mint
            )))
        }
    };

    Ok(NewPool { amm_id, token_mint })
}
