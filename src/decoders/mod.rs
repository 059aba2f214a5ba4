// src/decoders/mod.rs

// Décodage des comptes on-chain : pools Raydium AMM V4, marchés OpenBook, comptes SPL Token.
pub mod raydium;
pub mod spl_token_decoders;
