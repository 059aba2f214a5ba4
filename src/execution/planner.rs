// DANS : src/execution/planner.rs

use crate::decoders::raydium::amm_v4::keys::{PoolInfo, PoolKeys};
use crate::errors::{SniperError, SniperResult};
use solana_sdk::pubkey::Pubkey;

// Frais de swap AMM V4, prélevés sur l'input.
const SWAP_FEE_NUMERATOR: u128 = 25;
const SWAP_FEE_DENOMINATOR: u128 = 10_000;
// Slippage en parties par milliard : 1% = 10_000_000.
const PPB_DENOMINATOR: u128 = 1_000_000_000;
const PPB_PER_PERCENT: f64 = 10_000_000.0;

/// Un montant en unités brutes, avec la précision de son token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub raw: u64,
    pub decimals: u8,
}

impl TokenAmount {
    /// Montant lisible, pour les logs.
    pub fn ui(&self) -> f64 {
        self.raw as f64 / 10f64.powi(self.decimals as i32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapPlan {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: TokenAmount,
    /// Sortie théorique sans slippage (frais de pool déduits).
    pub expected_amount_out: TokenAmount,
    pub min_amount_out: TokenAmount,
}

impl SwapPlan {
    /// Vrai si l'on vend la base (base -> quote).
    pub fn is_base_in(&self, keys: &PoolKeys) -> bool {
        self.input_mint == keys.base_mint
    }
}

/// Convertit un pourcentage en parties par milliard, après validation de `[0, 100)`.
pub fn slippage_to_ppb(slippage_percent: f64) -> SniperResult<u128> {
    if !slippage_percent.is_finite() || !(0.0..100.0).contains(&slippage_percent) {
        return Err(SniperError::InvalidSlippage(slippage_percent));
    }
    Ok((slippage_percent * PPB_PER_PERCENT).round() as u128)
}

/// Sortie du produit constant pour `amount_in`, frais de swap déduits de l'input.
pub fn constant_product_out(amount_in: u64, reserve_in: u64, reserve_out: u64) -> u64 {
    if reserve_in == 0 || reserve_out == 0 {
        return 0;
    }
    let amount_in = amount_in as u128;
    let fee = amount_in * SWAP_FEE_NUMERATOR / SWAP_FEE_DENOMINATOR;
    let amount_in_with_fee = amount_in - fee;
    let denominator = reserve_in as u128 + amount_in_with_fee;
    // out < reserve_out, donc tient toujours dans un u64.
    (reserve_out as u128 * amount_in_with_fee / denominator) as u64
}

/// Calcule la direction, la sortie attendue et la sortie minimale acceptable.
///
/// Fonction pure : mêmes réserves, même plan.
pub fn plan_swap(
    keys: &PoolKeys,
    info: &PoolInfo,
    output_mint: &Pubkey,
    amount_in_raw: u64,
    slippage_percent: f64,
) -> SniperResult<SwapPlan> {
    let slippage_ppb = slippage_to_ppb(slippage_percent)?;

    let (input_mint, in_decimals, out_decimals, reserve_in, reserve_out) = if *output_mint == keys.base_mint {
        (keys.quote_mint, info.quote_decimals, info.base_decimals, info.quote_reserve, info.base_reserve)
    } else if *output_mint == keys.quote_mint {
        (keys.base_mint, info.base_decimals, info.quote_decimals, info.base_reserve, info.quote_reserve)
    } else {
        return Err(SniperError::InvalidMint { mint: *output_mint, pool: keys.id });
    };

    let expected_out = constant_product_out(amount_in_raw, reserve_in, reserve_out);
    let min_out = (expected_out as u128 * (PPB_DENOMINATOR - slippage_ppb) / PPB_DENOMINATOR) as u64;

    Ok(SwapPlan {
        input_mint,
        output_mint: *output_mint,
        amount_in: TokenAmount { raw: amount_in_raw, decimals: in_decimals },
        expected_amount_out: TokenAmount { raw: expected_out, decimals: out_decimals },
        min_amount_out: TokenAmount { raw: min_out, decimals: out_decimals },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_pool_info, sample_pool_keys};

    #[test]
    fn test_quote_in_pinned_min_out() {
        let (base, quote) = (Pubkey::new_unique(), Pubkey::new_unique());
        let keys = sample_pool_keys(base, quote);
        let info = sample_pool_info(); // base=1_000_000, quote=500_000

        let plan = plan_swap(&keys, &info, &base, 1_000, 2.0).unwrap();

        // fee = 2, in_after_fee = 998, out = 998_000_000 / 500_998 = 1992, min = 1992 * 0.98 = 1952
        assert_eq!(plan.input_mint, quote);
        assert_eq!(plan.output_mint, base);
        assert_eq!(plan.amount_in, TokenAmount { raw: 1_000, decimals: 9 });
        assert_eq!(plan.expected_amount_out.raw, 1_992);
        assert_eq!(plan.min_amount_out, TokenAmount { raw: 1_952, decimals: 6 });
        assert!(!plan.is_base_in(&keys));
    }

    #[test]
    fn test_base_in_direction() {
        let (base, quote) = (Pubkey::new_unique(), Pubkey::new_unique());
        let keys = sample_pool_keys(base, quote);
        let plan = plan_swap(&keys, &sample_pool_info(), &quote, 10_000, 1.0).unwrap();

        // fee = 25, in = 9_975, out = 500_000 * 9_975 / 1_009_975 = 4938
        assert_eq!(plan.input_mint, base);
        assert_eq!(plan.expected_amount_out.raw, 4_938);
        assert_eq!(plan.min_amount_out.raw, 4_888);
        assert!(plan.is_base_in(&keys));
    }

    #[test]
    fn test_zero_slippage_keeps_expected_output() {
        let (base, quote) = (Pubkey::new_unique(), Pubkey::new_unique());
        let keys = sample_pool_keys(base, quote);
        let plan = plan_swap(&keys, &sample_pool_info(), &base, 1_000, 0.0).unwrap();
        assert_eq!(plan.min_amount_out.raw, plan.expected_amount_out.raw);
    }

    #[test]
    fn test_sub_basis_point_slippage_is_applied() {
        let (base, quote) = (Pubkey::new_unique(), Pubkey::new_unique());
        let keys = sample_pool_keys(base, quote);
        let info = PoolInfo { base_reserve: 10_000_000_000, quote_reserve: 10_000_000_000, ..sample_pool_info() };

        let plan = plan_swap(&keys, &info, &base, 1_000_000_000, 0.004).unwrap();

        // out = 10e9 * 997_500_000 / 10_997_500_000 = 907_024_323, min = out * (1 - 0.00004)
        assert_eq!(plan.expected_amount_out.raw, 907_024_323);
        assert_eq!(plan.min_amount_out.raw, 906_988_042);
    }

    #[test]
    fn test_fractional_percent_is_not_rounded_to_bps() {
        assert_eq!(slippage_to_ppb(1.234).unwrap(), 12_340_000);
        assert_eq!(slippage_to_ppb(0.004).unwrap(), 40_000);
        assert_eq!(slippage_to_ppb(2.0).unwrap(), 20_000_000);
    }

    #[test]
    fn test_ui_amount_uses_decimals() {
        assert_eq!(TokenAmount { raw: 1_500_000_000, decimals: 9 }.ui(), 1.5);
        assert_eq!(TokenAmount { raw: 42, decimals: 0 }.ui(), 42.0);
    }

    #[test]
    fn test_foreign_mint_is_rejected() {
        let keys = sample_pool_keys(Pubkey::new_unique(), Pubkey::new_unique());
        for _ in 0..8 {
            let err = plan_swap(&keys, &sample_pool_info(), &Pubkey::new_unique(), 1_000, 2.0).unwrap_err();
            assert!(matches!(err, SniperError::InvalidMint { pool, .. } if pool == keys.id));
        }
    }

    #[test]
    fn test_slippage_outside_range_is_rejected() {
        let (base, quote) = (Pubkey::new_unique(), Pubkey::new_unique());
        let keys = sample_pool_keys(base, quote);
        for slippage in [-0.01, -5.0, 100.0, 100.5, 1e9, f64::NAN, f64::INFINITY] {
            let err = plan_swap(&keys, &sample_pool_info(), &base, 1_000, slippage).unwrap_err();
            assert!(matches!(err, SniperError::InvalidSlippage(_)), "slippage {} accepted", slippage);
        }
        assert!(plan_swap(&keys, &sample_pool_info(), &base, 1_000, 99.99).is_ok());
    }

    #[test]
    fn test_empty_pool_quotes_zero() {
        assert_eq!(constant_product_out(1_000, 0, 500), 0);
        assert_eq!(constant_product_out(1_000, 500, 0), 0);
    }

    #[test]
    fn test_large_reserves_do_not_overflow() {
        let out = constant_product_out(u64::MAX, u64::MAX, u64::MAX);
        assert!(out < u64::MAX);
        assert!(out > u64::MAX / 3);
    }
}
