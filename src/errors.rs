// src/errors.rs

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Toutes les façons dont le pipeline "nouvelle pool -> swap" peut échouer.
#[derive(Debug, Error)]
pub enum SniperError {
    /// Les octets d'un compte ne correspondent pas au layout attendu.
    #[error("decode error: {0}")]
    Decode(String),

    /// Le compte (ou la transaction) n'existe pas encore. On peut réessayer plus tard.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("mint {mint} is neither the base nor the quote mint of pool {pool}")]
    InvalidMint { mint: Pubkey, pool: Pubkey },

    #[error("slippage {0}% is outside [0, 100)")]
    InvalidSlippage(f64),

    #[error("minimum output {min_amount_out} does not clear the threshold {threshold}")]
    BelowThreshold { min_amount_out: u64, threshold: u64 },

    #[error("broadcast failure: {0:#}")]
    BroadcastFailure(anyhow::Error),

    #[error("no new non-native mint: {0}")]
    NoNewToken(String),

    #[error("pool keys are incomplete: missing `{0}`")]
    IncompletePoolKeys(&'static str),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<SniperError> },

    #[error("rpc error: {0:#}")]
    Rpc(#[from] anyhow::Error),
}

impl SniperError {
    /// Vrai si l'erreur décrit un état transitoire (le réessai a un sens).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SniperError::NotFound(_)
                | SniperError::BelowThreshold { .. }
                | SniperError::BroadcastFailure(_)
        )
    }
}

pub type SniperResult<T> = std::result::Result<T, SniperError>;
