// src/test_utils.rs
// Faux `ChainClient` en mémoire et fixtures partagées par les tests unitaires.

use crate::decoders::raydium::amm_v4::keys::{PoolInfo, PoolKeys, PoolKeysBuilder};
use crate::decoders::raydium::amm_v4::openbook_market::MarketState;
use crate::decoders::raydium::amm_v4::pool::{AmmState, RAYDIUM_AMM_V4_AUTHORITY, RAYDIUM_AMM_V4_PROGRAM_ID};
use crate::decoders::spl_token_decoders::account::decode_account;
use crate::rpc::{ChainClient, ParsedInstruction};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytemuck::Zeroable;
use solana_program_pack::Pack;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use spl_associated_token_account::get_associated_token_address;
use spl_token::state::{Account as SplTokenAccount, AccountState};
use std::collections::HashMap;
use std::sync::Mutex;

pub fn sample_amm_state() -> AmmState {
    let mut state = AmmState::zeroed();
    state.status = 6;
    state.nonce = 254;
    state.coin_decimals = 9;
    state.pc_decimals = 6;
    state.fees.trade_fee_numerator = 25;
    state.fees.trade_fee_denominator = 10_000;
    state.out_put.need_take_pnl_coin = 40;
    state.out_put.need_take_pnl_pc = 7;
    state.out_put.swap_coin_in_amount = u128::MAX - 3;
    state.token_coin = Pubkey::new_unique();
    state.token_pc = Pubkey::new_unique();
    state.coin_mint = Pubkey::new_unique();
    state.pc_mint = Pubkey::new_unique();
    state.lp_mint = Pubkey::new_unique();
    state.open_orders = Pubkey::new_unique();
    state.market = Pubkey::new_unique();
    state.serum_dex = Pubkey::new_unique();
    state.target_orders = Pubkey::new_unique();
    state
}

/// Un marché dont le nonce produit une adresse hors courbe pour `market_program_id`.
pub fn sample_market_state(market_program_id: &Pubkey) -> MarketState {
    let own_address = Pubkey::new_unique();
    let nonce = (0u64..=255)
        .find(|n| Pubkey::create_program_address(&[&own_address.to_bytes(), &n.to_le_bytes()], market_program_id).is_ok())
        .expect("no valid vault signer nonce");

    let mut market = MarketState::zeroed();
    market.head_padding = *b"serum";
    market.account_flags = 3;
    market.own_address = own_address;
    market.vault_signer_nonce = nonce;
    market.base_mint = Pubkey::new_unique();
    market.quote_mint = Pubkey::new_unique();
    market.base_vault = Pubkey::new_unique();
    market.quote_vault = Pubkey::new_unique();
    market.request_queue = Pubkey::new_unique();
    market.event_queue = Pubkey::new_unique();
    market.bids = Pubkey::new_unique();
    market.asks = Pubkey::new_unique();
    market.base_lot_size = 1_000;
    market.quote_lot_size = 10;
    market.tail_padding = *b"padding";
    market
}

pub fn token_account_bytes(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let account = SplTokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        state: AccountState::Initialized,
        ..SplTokenAccount::default()
    };
    let mut data = vec![0u8; SplTokenAccount::LEN];
    SplTokenAccount::pack(account, &mut data).expect("pack token account");
    data
}

pub fn sample_pool_keys(base_mint: Pubkey, quote_mint: Pubkey) -> PoolKeys {
    PoolKeysBuilder::new()
        .id(Pubkey::new_unique())
        .program_id(RAYDIUM_AMM_V4_PROGRAM_ID)
        .authority(RAYDIUM_AMM_V4_AUTHORITY)
        .base_mint(base_mint)
        .quote_mint(quote_mint)
        .base_decimals(6)
        .quote_decimals(9)
        .lp_mint(Pubkey::new_unique())
        .base_vault(Pubkey::new_unique())
        .quote_vault(Pubkey::new_unique())
        .open_orders(Pubkey::new_unique())
        .target_orders(Pubkey::new_unique())
        .market_program_id(Pubkey::new_unique())
        .market_id(Pubkey::new_unique())
        .market_bids(Pubkey::new_unique())
        .market_asks(Pubkey::new_unique())
        .market_event_queue(Pubkey::new_unique())
        .market_base_vault(Pubkey::new_unique())
        .market_quote_vault(Pubkey::new_unique())
        .market_authority(Pubkey::new_unique())
        .build()
        .expect("complete pool keys")
}

pub fn sample_pool_info() -> PoolInfo {
    PoolInfo { base_reserve: 1_000_000, quote_reserve: 500_000, base_decimals: 6, quote_decimals: 9 }
}

/// Chaîne en mémoire. Enregistre les transactions envoyées et les ATA créées.
#[derive(Default)]
pub struct FakeChain {
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    transactions: Mutex<HashMap<Signature, Vec<ParsedInstruction>>>,
    sent: Mutex<Vec<Vec<Instruction>>>,
    created_atas: Mutex<Vec<Pubkey>>,
    failing_sends: Mutex<u32>,
    signature_counter: Mutex<u8>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }

    pub fn account(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.accounts.lock().unwrap().get(address).cloned()
    }

    pub fn put_transaction(&self, signature: Signature, instructions: Vec<ParsedInstruction>) {
        self.transactions.lock().unwrap().insert(signature, instructions);
    }

    pub fn fail_next_sends(&self, count: u32) {
        *self.failing_sends.lock().unwrap() = count;
    }

    pub fn sent(&self) -> Vec<Vec<Instruction>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn created_atas(&self) -> Vec<Pubkey> {
        self.created_atas.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.account(address))
    }

    async fn get_transaction_instructions(&self, signature: &Signature) -> Result<Option<Vec<ParsedInstruction>>> {
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn sign_and_send(&self, instructions: &[Instruction], _payer: &Keypair) -> Result<Signature> {
        {
            let mut failing = self.failing_sends.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(anyhow!("Transaction simulation failed: slippage exceeded"));
            }
        }
        self.sent.lock().unwrap().push(instructions.to_vec());
        let mut counter = self.signature_counter.lock().unwrap();
        *counter = counter.wrapping_add(1);
        Ok(Signature::from([*counter; 64]))
    }

    async fn get_or_create_associated_account(&self, payer: &Keypair, mint: &Pubkey) -> Result<Pubkey> {
        let ata = get_associated_token_address(&payer.pubkey(), mint);
        let mut accounts = self.accounts.lock().unwrap();
        if !accounts.contains_key(&ata) {
            accounts.insert(ata, token_account_bytes(mint, &payer.pubkey(), 0));
            self.created_atas.lock().unwrap().push(ata);
        }
        Ok(ata)
    }

    async fn get_token_balance(&self, token_account: &Pubkey) -> Result<u64> {
        let data = self.account(token_account).ok_or_else(|| anyhow!("token account {} not found", token_account))?;
        Ok(decode_account(&data)?.amount)
    }
}
