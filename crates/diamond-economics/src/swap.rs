//! # Denomination Swap
//!
//! Fixed-rate, fixed-fee conversion between diamonds and shards
//! (1 diamond = 100 shards by default). The flat fee is charged in the
//! input denomination before conversion, and the conversion itself uses
//! the same floor primitive as every other money split, so quoting and
//! executing a swap can never disagree.

use crate::constants::{SHARDS_PER_DIAMOND, SWAP_FLAT_FEE};
use diamond_core::{Amount, EconomyError, Rate, Result, BASIS_POINT_SCALE};
use serde::{Deserialize, Serialize};

/// A fully-determined swap outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    /// Amount supplied, in the input denomination
    pub input_amount: Amount,

    /// Flat fee deducted, in the input denomination
    pub fee: Amount,

    /// Amount produced, in the output denomination
    pub converted: Amount,

    /// Input units that could not convert to a whole output unit
    pub dust: Amount,
}

/// Fixed-rate converter between the two denominations
#[derive(Clone, Copy, Debug)]
pub struct SwapCalculator {
    shards_per_diamond: u64,
    flat_fee: Amount,
    /// Flat fee scaled into shards, bounds-checked at construction
    shard_fee: Amount,
    /// 1 / shards_per_diamond as a floor rate, for the shards→diamonds leg
    inverse_rate: Rate,
}

impl SwapCalculator {
    /// Create a calculator.
    ///
    /// `shards_per_diamond` must divide the basis-point scale so the
    /// inverse conversion is expressible as an exact floor rate, and the
    /// flat fee must still be representable once scaled into shards.
    pub fn new(shards_per_diamond: u64, flat_fee: Amount) -> Result<Self> {
        if shards_per_diamond == 0 || BASIS_POINT_SCALE % shards_per_diamond != 0 {
            return Err(EconomyError::InvalidConfig(format!(
                "shards_per_diamond {shards_per_diamond} must evenly divide {BASIS_POINT_SCALE}"
            )));
        }
        let shard_fee = flat_fee.checked_mul(shards_per_diamond).ok_or_else(|| {
            EconomyError::InvalidConfig(format!(
                "flat fee {flat_fee} overflows when scaled to shards"
            ))
        })?;
        let inverse_rate = Rate::from_basis_points((BASIS_POINT_SCALE / shards_per_diamond) as u32)?;
        Ok(Self {
            shards_per_diamond,
            flat_fee,
            shard_fee,
            inverse_rate,
        })
    }

    /// Current fixed rate
    pub fn shards_per_diamond(&self) -> u64 {
        self.shards_per_diamond
    }

    /// Current flat fee, in input-denomination units
    pub fn flat_fee(&self) -> Amount {
        self.flat_fee
    }

    /// Quote a diamonds → shards conversion
    pub fn diamonds_to_shards(&self, diamonds: Amount) -> Result<SwapQuote> {
        let net = diamonds
            .checked_sub(self.flat_fee)
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                EconomyError::InvalidInput(format!(
                    "swap of {diamonds} diamonds cannot cover the {} fee",
                    self.flat_fee
                ))
            })?;

        let converted = net.checked_mul(self.shards_per_diamond).ok_or_else(|| {
            EconomyError::InvalidInput(format!("swap of {diamonds} diamonds overflows"))
        })?;

        Ok(SwapQuote {
            input_amount: diamonds,
            fee: self.flat_fee,
            converted,
            dust: 0,
        })
    }

    /// Quote a shards → diamonds conversion.
    ///
    /// The fee is the flat fee scaled into shards; shards short of a
    /// whole diamond are reported as dust and never silently destroyed.
    pub fn shards_to_diamonds(&self, shards: Amount) -> Result<SwapQuote> {
        let fee = self.shard_fee;
        let net = shards.checked_sub(fee).filter(|n| *n > 0).ok_or_else(|| {
            EconomyError::InvalidInput(format!(
                "swap of {shards} shards cannot cover the {fee} shard fee"
            ))
        })?;

        let converted = self.inverse_rate.take(net);
        let dust = net - converted * self.shards_per_diamond;

        Ok(SwapQuote {
            input_amount: shards,
            fee,
            converted,
            dust,
        })
    }
}

impl Default for SwapCalculator {
    fn default() -> Self {
        Self::new(SHARDS_PER_DIAMOND, SWAP_FLAT_FEE)
            .expect("default swap rate divides the basis-point scale")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diamonds_to_shards() {
        let calc = SwapCalculator::default();

        let q = calc.diamonds_to_shards(10).unwrap();
        assert_eq!(q.fee, 1);
        assert_eq!(q.converted, 900);
        assert_eq!(q.dust, 0);
    }

    #[test]
    fn test_shards_to_diamonds_reports_dust() {
        let calc = SwapCalculator::default();

        // 1050 shards - 100 shard fee = 950 → 9 diamonds, 50 shards dust
        let q = calc.shards_to_diamonds(1_050).unwrap();
        assert_eq!(q.fee, 100);
        assert_eq!(q.converted, 9);
        assert_eq!(q.dust, 50);
    }

    #[test]
    fn test_amount_below_fee_rejected() {
        let calc = SwapCalculator::default();

        assert!(calc.diamonds_to_shards(1).is_err());
        assert!(calc.diamonds_to_shards(0).is_err());
        assert!(calc.shards_to_diamonds(100).is_err());
    }

    #[test]
    fn test_rate_must_divide_scale() {
        assert!(SwapCalculator::new(100, 1).is_ok());
        assert!(SwapCalculator::new(250, 1).is_ok());
        assert!(SwapCalculator::new(3, 1).is_err());
        assert!(SwapCalculator::new(0, 1).is_err());
    }

    #[test]
    fn test_fee_that_overflows_in_shards_rejected() {
        assert!(SwapCalculator::new(100, Amount::MAX).is_err());
        assert!(SwapCalculator::new(100, Amount::MAX / 100).is_ok());
    }

    #[test]
    fn test_round_trip_loses_only_fees_and_dust() {
        let calc = SwapCalculator::default();

        let out = calc.diamonds_to_shards(50).unwrap();
        let back = calc.shards_to_diamonds(out.converted).unwrap();

        // 50 → (fee 1) 4900 shards → (fee 100) 4800 → 48 diamonds
        assert_eq!(back.converted, 48);
        assert_eq!(back.dust, 0);
    }
}
