use crate::decoders::spl_token_decoders::account::decode_account;
use crate::rpc::{ChainClient, ParsedInstruction};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcProgramAccountsConfig, RpcTransactionConfig},
};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage, UiParsedInstruction,
    UiTransactionEncoding,
};
use spl_associated_token_account::{get_associated_token_address, instruction::create_associated_token_account_idempotent};
use std::{future::Future, str::FromStr, sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, info};

/// Un "wrapper" autour du RpcClient de Solana qui ajoute une logique de
/// ré-essai automatique pour les lectures qui échouent à cause d'erreurs réseau temporaires.
///
/// Les envois de transactions ne sont jamais ré-essayés ici.
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: Arc<RpcClient>,
    max_retries: u8,
    delay_ms: u64,
}

impl ResilientRpcClient {
    /// Construit un nouveau client RPC résilient, en commitment `confirmed`.
    pub fn new(rpc_url: String, max_retries: u8, delay_ms: u64) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed())),
            max_retries,
            delay_ms,
        }
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.client.commitment()
    }

    /// Détermine si une erreur du client est temporaire et si une nouvelle tentative doit être effectuée.
    fn is_retryable(error: &ClientError) -> bool {
        matches!(
            error.kind,
            ClientErrorKind::Reqwest(_) | ClientErrorKind::RpcError(_) | ClientErrorKind::Io(_)
        )
    }

    /// Boucle de ré-essai commune à toutes les lectures.
    async fn with_retries<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(what, attempt, error = %e, "Erreur RPC temporaire, nouvelle tentative.");
                    sleep(Duration::from_millis(self.delay_ms)).await;
                }
                Err(e) => return Err(e).with_context(|| format!("Échec final de {}", what)),
            }
        }
    }

    // --- MÉTHODES WRAPPÉES AVEC LOGIQUE DE RÉ-ESSAI ---

    /// Récupère un compte, `None` s'il n'existe pas (encore).
    pub async fn get_account_opt(&self, pubkey: &Pubkey) -> Result<Option<Account>> {
        let response = self
            .with_retries("get_account_with_commitment", || {
                self.client.get_account_with_commitment(pubkey, self.commitment())
            })
            .await
            .with_context(|| format!("Compte {}", pubkey))?;
        Ok(response.value)
    }

    /// Récupère le dernier blockhash.
    pub async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.with_retries("get_latest_blockhash", || self.client.get_latest_blockhash()).await
    }

    /// Récupère une transaction confirmée en JSON parsé. `None` tant que le nœud ne la connaît pas.
    pub async fn get_parsed_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<EncodedConfirmedTransactionWithStatusMeta>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment()),
            max_supported_transaction_version: Some(0),
        };
        match self
            .with_retries("get_transaction_with_config", || self.client.get_transaction_with_config(signature, config))
            .await
        {
            Ok(tx) => Ok(Some(tx)),
            // Le RPC répond `null` pour une transaction inconnue.
            Err(e) if e.chain().any(|cause| cause.to_string().contains("invalid type: null")) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn get_program_accounts_with_config(
        &self,
        program_id: &Pubkey,
        config: RpcProgramAccountsConfig,
    ) -> Result<Vec<(Pubkey, Account)>> {
        self.with_retries("get_program_accounts_with_config", || {
            self.client.get_program_accounts_with_config(program_id, config.clone())
        })
        .await
        .with_context(|| format!("Programme {}", program_id))
    }

    /// Signe avec `payer` (qui paie aussi les frais), envoie et attend la confirmation. Pas de ré-essai.
    pub async fn send_instructions(&self, instructions: &[Instruction], payer: &Keypair) -> Result<Signature> {
        let blockhash = self.get_latest_blockhash().await?;
        let transaction = Transaction::new_signed_with_payer(instructions, Some(&payer.pubkey()), &[payer], blockhash);
        self.client
            .send_and_confirm_transaction(&transaction)
            .await
            .context("Échec de send_and_confirm_transaction")
    }
}

/// Extrait les instructions de premier niveau que le nœud n'a pas su décoder (c.-à-d. hors programmes connus).
pub fn partially_decoded_instructions(tx: EncodedConfirmedTransactionWithStatusMeta) -> Result<Vec<ParsedInstruction>> {
    let EncodedTransaction::Json(ui_transaction) = tx.transaction.transaction else {
        return Err(anyhow!("Transaction non encodée en JSON"));
    };
    let UiMessage::Parsed(message) = ui_transaction.message else {
        return Err(anyhow!("Message de transaction non parsé"));
    };

    message
        .instructions
        .into_iter()
        .filter_map(|ix| match ix {
            UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(ix)) => Some(ix),
            _ => None,
        })
        .map(|ix| -> Result<ParsedInstruction> {
            let program_id = Pubkey::from_str(&ix.program_id)?;
            let accounts = ix
                .accounts
                .iter()
                .map(|account| Pubkey::from_str(account))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ParsedInstruction { program_id, accounts })
        })
        .collect()
}

#[async_trait]
impl ChainClient for ResilientRpcClient {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.get_account_opt(address).await?.map(|account| account.data))
    }

    async fn get_transaction_instructions(&self, signature: &Signature) -> Result<Option<Vec<ParsedInstruction>>> {
        match self.get_parsed_transaction(signature).await? {
            Some(tx) => Ok(Some(partially_decoded_instructions(tx)?)),
            None => Ok(None),
        }
    }

    async fn sign_and_send(&self, instructions: &[Instruction], payer: &Keypair) -> Result<Signature> {
        self.send_instructions(instructions, payer).await
    }

    async fn get_or_create_associated_account(&self, payer: &Keypair, mint: &Pubkey) -> Result<Pubkey> {
        let owner = payer.pubkey();
        let ata = get_associated_token_address(&owner, mint);
        if self.get_account_opt(&ata).await?.is_some() {
            return Ok(ata);
        }

        let create_ix = create_associated_token_account_idempotent(&owner, &owner, mint, &spl_token::id());
        let signature = self
            .send_instructions(&[create_ix], payer)
            .await
            .with_context(|| format!("Création de l'ATA {} pour le mint {}", ata, mint))?;
        info!(ata = %ata, mint = %mint, signature = %signature, "ATA créée.");
        Ok(ata)
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<u64> {
        let account = self
            .get_account_opt(token_account)
            .await?
            .ok_or_else(|| anyhow!("Compte de token {} introuvable", token_account))?;
        Ok(decode_account(&account.data)?.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_transaction_status::{
        EncodedTransactionWithStatusMeta, UiParsedMessage, UiPartiallyDecodedInstruction, UiTransaction,
    };

    fn partially_decoded(program_id: &Pubkey, accounts: &[Pubkey]) -> UiInstruction {
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(UiPartiallyDecodedInstruction {
            program_id: program_id.to_string(),
            accounts: accounts.iter().map(|a| a.to_string()).collect(),
            data: String::new(),
            stack_height: None,
        }))
    }

    fn json_transaction(instructions: Vec<UiInstruction>) -> EncodedConfirmedTransactionWithStatusMeta {
        EncodedConfirmedTransactionWithStatusMeta {
            slot: 1,
            transaction: EncodedTransactionWithStatusMeta {
                transaction: EncodedTransaction::Json(UiTransaction {
                    signatures: vec![],
                    message: UiMessage::Parsed(UiParsedMessage {
                        account_keys: vec![],
                        recent_blockhash: Hash::default().to_string(),
                        instructions,
                        address_table_lookups: None,
                    }),
                }),
                meta: None,
                version: None,
            },
            block_time: None,
        }
    }

    #[test]
    fn test_extracts_partially_decoded_instructions() {
        let program = Pubkey::new_unique();
        let accounts: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let tx = json_transaction(vec![partially_decoded(&program, &accounts)]);

        let instructions = partially_decoded_instructions(tx).unwrap();
        assert_eq!(instructions, vec![ParsedInstruction { program_id: program, accounts }]);
    }

    #[test]
    fn test_rejects_binary_encoding() {
        let mut tx = json_transaction(vec![]);
        tx.transaction.transaction = EncodedTransaction::LegacyBinary(String::new());
        assert!(partially_decoded_instructions(tx).is_err());
    }

    #[test]
    fn test_invalid_account_string_is_an_error() {
        let ix = UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(UiPartiallyDecodedInstruction {
            program_id: Pubkey::new_unique().to_string(),
            accounts: vec!["pas-une-cle".to_string()],
            data: String::new(),
            stack_height: None,
        }));
        assert!(partially_decoded_instructions(json_transaction(vec![ix])).is_err());
    }
}
