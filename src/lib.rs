// src/lib.rs

// On déclare tous nos modules principaux pour les rendre publics et
// utilisables par nos programmes binaires (pool_sniper.rs, close_empty_accounts.rs).
pub mod config;
pub mod decoders;
pub mod errors;
pub mod execution;
pub mod listener;
pub mod monitoring;
pub mod rpc;
pub mod wallet;

#[cfg(test)]
mod test_utils;
