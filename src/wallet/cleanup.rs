// DANS : src/wallet/cleanup.rs
// Ferme les comptes de tokens vides du wallet pour récupérer leur rent.

use crate::decoders::spl_token_decoders::account::decode_account;
use crate::rpc::{ChainClient, ResilientRpcClient};
use anyhow::{Context, Result};
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_program_pack::Pack;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use spl_token::{native_mint, state::Account as SplTokenAccount};
use std::time::Duration;
use tracing::{error, info, warn};

/// Offset du champ `owner` dans un compte SPL Token.
const OWNER_OFFSET: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyTokenAccount {
    pub address: Pubkey,
    pub mint: Pubkey,
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub closed: Vec<(Pubkey, Signature)>,
    pub failed: Vec<Pubkey>,
}

/// `getProgramAccounts` sur le Token program : comptes de 165 octets dont l'owner est `owner`.
pub fn token_accounts_config(owner: &Pubkey) -> RpcProgramAccountsConfig {
    RpcProgramAccountsConfig {
        filters: Some(vec![
            RpcFilterType::DataSize(SplTokenAccount::LEN as u64),
            RpcFilterType::Memcmp(Memcmp::new_base58_encoded(OWNER_OFFSET, owner.as_ref())),
        ]),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            ..RpcAccountInfoConfig::default()
        },
        ..RpcProgramAccountsConfig::default()
    }
}

/// Garde les comptes à solde nul, hors wSOL. Les comptes illisibles sont ignorés.
pub fn find_empty_token_accounts(accounts: &[(Pubkey, Account)]) -> Vec<EmptyTokenAccount> {
    accounts
        .iter()
        .filter_map(|(address, account)| match decode_account(&account.data) {
            Ok(decoded) => Some((address, decoded)),
            Err(e) => {
                warn!(account = %address, error = %e, "Compte de token illisible, ignoré.");
                None
            }
        })
        .filter(|(_, decoded)| decoded.amount == 0 && decoded.mint != native_mint::id())
        .map(|(address, decoded)| EmptyTokenAccount { address: *address, mint: decoded.mint })
        .collect()
}

pub async fn list_empty_token_accounts(rpc: &ResilientRpcClient, owner: &Pubkey) -> Result<Vec<EmptyTokenAccount>> {
    let accounts = rpc
        .get_program_accounts_with_config(&spl_token::id(), token_accounts_config(owner))
        .await
        .context("Échec de la récupération des comptes de tokens")?;
    info!(owner = %owner, total = accounts.len(), "Comptes de tokens récupérés.");
    Ok(find_empty_token_accounts(&accounts))
}

/// La rent est rendue au propriétaire, qui signe aussi.
pub fn close_account_instruction(account: &Pubkey, owner: &Pubkey) -> Result<Instruction> {
    spl_token::instruction::close_account(&spl_token::id(), account, owner, owner, &[])
        .context("Construction de l'instruction close_account")
}

/// Ferme les comptes un par un, avec une pause entre deux fermetures. Un échec n'arrête pas la boucle.
pub async fn close_token_accounts(
    client: &dyn ChainClient,
    payer: &Keypair,
    accounts: &[EmptyTokenAccount],
    delay: Duration,
) -> CleanupReport {
    let mut report = CleanupReport::default();
    for (i, account) in accounts.iter().enumerate() {
        info!(account = %account.address, mint = %account.mint, "Fermeture du compte.");
        let result = match close_account_instruction(&account.address, &payer.pubkey()) {
            Ok(ix) => client.sign_and_send(&[ix], payer).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(signature) => {
                info!(account = %account.address, signature = %signature, "Compte fermé.");
                report.closed.push((account.address, signature));
            }
            Err(e) => {
                error!(account = %account.address, error = %format!("{:#}", e), "Échec de la fermeture.");
                report.failed.push(account.address);
            }
        }
        if i + 1 < accounts.len() {
            tokio::time::sleep(delay).await;
        }
    }
    report
}
