// src/rpc/mod.rs

pub mod resilient_client;

pub use resilient_client::ResilientRpcClient;

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
};

/// Une instruction de haut niveau d'une transaction confirmée : le programme appelé et ses comptes, dans l'ordre.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<Pubkey>,
}

/// Tout ce dont le pipeline a besoin de la chaîne.
///
/// `ResilientRpcClient` est l'implémentation réelle ; les tests utilisent un faux en mémoire.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Données brutes d'un compte, `None` s'il n'existe pas (encore).
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Instructions de haut niveau d'une transaction confirmée, `None` si elle est introuvable.
    async fn get_transaction_instructions(&self, signature: &Signature) -> Result<Option<Vec<ParsedInstruction>>>;

    /// Signe avec `payer`, envoie et attend la confirmation. Jamais ré-essayé.
    async fn sign_and_send(&self, instructions: &[Instruction], payer: &Keypair) -> Result<Signature>;

    /// Retourne l'ATA `(payer, mint)`, en la créant on-chain si elle n'existe pas.
    async fn get_or_create_associated_account(&self, payer: &Keypair, mint: &Pubkey) -> Result<Pubkey>;

    /// Solde (unités brutes) d'un compte de token.
    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<u64>;
}
