// Maintenance du wallet de trading.
pub mod cleanup;
