// DANS : src/decoders/raydium/amm_v4/mod.rs

pub mod keys;            // PoolKeys, PoolInfo et leur résolution depuis la chaîne.
pub mod openbook_market;
pub mod pool;

pub use keys::{fetch_pool_info, resolve_pool_keys, PoolInfo, PoolKeys};
pub use pool::{decode_amm_state, AmmState, RAYDIUM_AMM_V4_PROGRAM_ID};
