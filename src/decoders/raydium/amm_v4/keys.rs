// DANS: src/decoders/raydium/amm_v4/keys.rs

use crate::decoders::raydium::amm_v4::openbook_market::decode_market_state;
use crate::decoders::raydium::amm_v4::pool::{decode_amm_state, RAYDIUM_AMM_V4_AUTHORITY, RAYDIUM_AMM_V4_PROGRAM_ID};
use crate::decoders::spl_token_decoders::account::decode_account;
use crate::errors::{SniperError, SniperResult};
use crate::rpc::ChainClient;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Tous les comptes qu'une instruction de swap AMM V4 doit référencer.
///
/// Construit uniquement via `PoolKeysBuilder::build`, en une passe, jamais partiellement.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolKeys {
    pub id: Pubkey,
    pub program_id: Pubkey,
    pub authority: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub open_orders: Pubkey,
    pub target_orders: Pubkey,
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub market_bids: Pubkey,
    pub market_asks: Pubkey,
    pub market_event_queue: Pubkey,
    pub market_base_vault: Pubkey,
    pub market_quote_vault: Pubkey,
    pub market_authority: Pubkey,
}

/// Snapshot des réserves d'une pool. À re-fetcher avant chaque swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolInfo {
    pub base_reserve: u64,
    pub quote_reserve: u64,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

#[derive(Debug, Default, Clone)]
pub struct PoolKeysBuilder {
    id: Option<Pubkey>,
    program_id: Option<Pubkey>,
    authority: Option<Pubkey>,
    base_mint: Option<Pubkey>,
    quote_mint: Option<Pubkey>,
    base_decimals: Option<u8>,
    quote_decimals: Option<u8>,
    lp_mint: Option<Pubkey>,
    base_vault: Option<Pubkey>,
    quote_vault: Option<Pubkey>,
    open_orders: Option<Pubkey>,
    target_orders: Option<Pubkey>,
    market_program_id: Option<Pubkey>,
    market_id: Option<Pubkey>,
    market_bids: Option<Pubkey>,
    market_asks: Option<Pubkey>,
    market_event_queue: Option<Pubkey>,
    market_base_vault: Option<Pubkey>,
    market_quote_vault: Option<Pubkey>,
    market_authority: Option<Pubkey>,
}

macro_rules! setter {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $name(mut self, value: $ty) -> Self {
                self.$name = Some(value);
                self
            }
        )*
    };
}

impl PoolKeysBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(
        id: Pubkey, program_id: Pubkey, authority: Pubkey,
        base_mint: Pubkey, quote_mint: Pubkey, base_decimals: u8, quote_decimals: u8,
        lp_mint: Pubkey, base_vault: Pubkey, quote_vault: Pubkey,
        open_orders: Pubkey, target_orders: Pubkey,
        market_program_id: Pubkey, market_id: Pubkey, market_bids: Pubkey, market_asks: Pubkey,
        market_event_queue: Pubkey, market_base_vault: Pubkey, market_quote_vault: Pubkey,
        market_authority: Pubkey,
    );

    /// Refuse de construire tant qu'un seul champ manque.
    pub fn build(self) -> SniperResult<PoolKeys> {
        fn req<T>(value: Option<T>, name: &'static str) -> SniperResult<T> {
            value.ok_or(SniperError::IncompletePoolKeys(name))
        }

        Ok(PoolKeys {
            id: req(self.id, "id")?,
            program_id: req(self.program_id, "program_id")?,
            authority: req(self.authority, "authority")?,
            base_mint: req(self.base_mint, "base_mint")?,
            quote_mint: req(self.quote_mint, "quote_mint")?,
            base_decimals: req(self.base_decimals, "base_decimals")?,
            quote_decimals: req(self.quote_decimals, "quote_decimals")?,
            lp_mint: req(self.lp_mint, "lp_mint")?,
            base_vault: req(self.base_vault, "base_vault")?,
            quote_vault: req(self.quote_vault, "quote_vault")?,
            open_orders: req(self.open_orders, "open_orders")?,
            target_orders: req(self.target_orders, "target_orders")?,
            market_program_id: req(self.market_program_id, "market_program_id")?,
            market_id: req(self.market_id, "market_id")?,
            market_bids: req(self.market_bids, "market_bids")?,
            market_asks: req(self.market_asks, "market_asks")?,
            market_event_queue: req(self.market_event_queue, "market_event_queue")?,
            market_base_vault: req(self.market_base_vault, "market_base_vault")?,
            market_quote_vault: req(self.market_quote_vault, "market_quote_vault")?,
            market_authority: req(self.market_authority, "market_authority")?,
        })
    }
}

async fn fetch_required(client: &dyn ChainClient, address: &Pubkey, what: &str) -> SniperResult<Vec<u8>> {
    client
        .get_account_data(address)
        .await?
        .ok_or_else(|| SniperError::NotFound(format!("{} account {}", what, address)))
}

/// Fetch le compte AMM, puis son marché, décode les deux et dérive l'autorité du marché.
///
/// Aucun cache : chaque appel relit la chaîne. `NotFound` est normal juste après la création d'une pool.
pub async fn resolve_pool_keys(client: &dyn ChainClient, pool_id: &Pubkey) -> SniperResult<PoolKeys> {
    let amm_data = fetch_required(client, pool_id, "AMM").await?;
    let amm = decode_amm_state(&amm_data)?;

    let market_id = amm.market;
    let market_data = fetch_required(client, &market_id, "market").await?;
    let market = decode_market_state(&market_data)?;

    let market_program_id = amm.serum_dex;
    let market_authority = market.vault_signer(&market_program_id)?;
    debug!(pool = %pool_id, market = %market_id, authority = %market_authority, "Pool keys décodées.");

    PoolKeysBuilder::new()
        .id(*pool_id)
        .program_id(RAYDIUM_AMM_V4_PROGRAM_ID)
        .authority(RAYDIUM_AMM_V4_AUTHORITY)
        .base_mint(amm.coin_mint)
        .quote_mint(amm.pc_mint)
        .base_decimals(amm.base_decimals()?)
        .quote_decimals(amm.quote_decimals()?)
        .lp_mint(amm.lp_mint)
        .base_vault(amm.token_coin)
        .quote_vault(amm.token_pc)
        .open_orders(amm.open_orders)
        .target_orders(amm.target_orders)
        .market_program_id(market_program_id)
        .market_id(market.own_address)
        .market_bids(market.bids)
        .market_asks(market.asks)
        .market_event_queue(market.event_queue)
        .market_base_vault(market.base_vault)
        .market_quote_vault(market.quote_vault)
        .market_authority(market_authority)
        .build()
}

/// Relit l'AMM et ses deux vaults pour obtenir les réserves du moment.
pub async fn fetch_pool_info(client: &dyn ChainClient, keys: &PoolKeys) -> SniperResult<PoolInfo> {
    let (amm_res, base_res, quote_res) = tokio::join!(
        fetch_required(client, &keys.id, "AMM"),
        fetch_required(client, &keys.base_vault, "base vault"),
        fetch_required(client, &keys.quote_vault, "quote vault"),
    );
    let amm = decode_amm_state(&amm_res?)?;
    let base_vault = decode_account(&base_res?)?;
    let quote_vault = decode_account(&quote_res?)?;

    Ok(PoolInfo {
        base_reserve: amm.base_reserve(base_vault.amount),
        quote_reserve: amm.quote_reserve(quote_vault.amount),
        base_decimals: keys.base_decimals,
        quote_decimals: keys.quote_decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_amm_state, sample_market_state, token_account_bytes, FakeChain};

    fn seeded_chain() -> (FakeChain, Pubkey) {
        let chain = FakeChain::new();
        let pool_id = Pubkey::new_unique();
        let mut amm = sample_amm_state();
        let market = sample_market_state(&{ amm.serum_dex });
        amm.market = market.own_address;
        chain.put_account(pool_id, amm.to_bytes());
        chain.put_account(amm.market, market.to_bytes());
        (chain, pool_id)
    }

    #[tokio::test]
    async fn test_resolve_pool_keys_maps_every_field() {
        let (chain, pool_id) = seeded_chain();
        let amm = decode_amm_state(&chain.account(&pool_id).unwrap()).unwrap();
        let market = decode_market_state(&chain.account(&{ amm.market }).unwrap()).unwrap();

        let keys = resolve_pool_keys(&chain, &pool_id).await.unwrap();

        assert_eq!(keys.id, pool_id);
        assert_eq!(keys.program_id, RAYDIUM_AMM_V4_PROGRAM_ID);
        assert_eq!(keys.authority, RAYDIUM_AMM_V4_AUTHORITY);
        assert_eq!(keys.base_mint, { amm.coin_mint });
        assert_eq!(keys.quote_mint, { amm.pc_mint });
        assert_eq!((keys.base_decimals, keys.quote_decimals), (9, 6));
        assert_eq!(keys.base_vault, { amm.token_coin });
        assert_eq!(keys.quote_vault, { amm.token_pc });
        assert_eq!(keys.open_orders, { amm.open_orders });
        assert_eq!(keys.market_program_id, { amm.serum_dex });
        assert_eq!(keys.market_id, { market.own_address });
        assert_eq!(keys.market_bids, { market.bids });
        assert_eq!(keys.market_asks, { market.asks });
        assert_eq!(keys.market_event_queue, { market.event_queue });
        assert_eq!(keys.market_base_vault, { market.base_vault });
        assert_eq!(keys.market_quote_vault, { market.quote_vault });
        assert_eq!(keys.market_authority, market.vault_signer(&{ amm.serum_dex }).unwrap());
    }

    #[tokio::test]
    async fn test_missing_accounts_are_not_found() {
        let chain = FakeChain::new();
        let err = resolve_pool_keys(&chain, &Pubkey::new_unique()).await.unwrap_err();
        assert!(matches!(err, SniperError::NotFound(_)));
        assert!(err.is_retryable());

        // AMM présent mais marché absent.
        let pool_id = Pubkey::new_unique();
        chain.put_account(pool_id, sample_amm_state().to_bytes());
        let err = resolve_pool_keys(&chain, &pool_id).await.unwrap_err();
        assert!(matches!(err, SniperError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_amm_is_decode_error() {
        let chain = FakeChain::new();
        let pool_id = Pubkey::new_unique();
        chain.put_account(pool_id, vec![0u8; 100]);
        let err = resolve_pool_keys(&chain, &pool_id).await.unwrap_err();
        assert!(matches!(err, SniperError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_pool_info_reads_vaults() {
        let (chain, pool_id) = seeded_chain();
        let keys = resolve_pool_keys(&chain, &pool_id).await.unwrap();
        chain.put_account(keys.base_vault, token_account_bytes(&keys.base_mint, &Pubkey::new_unique(), 1_000_040));
        chain.put_account(keys.quote_vault, token_account_bytes(&keys.quote_mint, &Pubkey::new_unique(), 500_007));

        let info = fetch_pool_info(&chain, &keys).await.unwrap();
        assert_eq!(
            info,
            PoolInfo { base_reserve: 1_000_000, quote_reserve: 500_000, base_decimals: 9, quote_decimals: 6 }
        );
    }

    #[test]
    fn test_builder_rejects_incomplete_record() {
        let err = PoolKeysBuilder::new()
            .id(Pubkey::new_unique())
            .program_id(RAYDIUM_AMM_V4_PROGRAM_ID)
            .build()
            .unwrap_err();
        assert!(matches!(err, SniperError::IncompletePoolKeys("authority")));
    }
}
