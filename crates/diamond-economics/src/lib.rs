//! # Diamond Economics - Economic Rule Engines
//!
//! The authoritative implementations of every economic rule in the
//! diamond economy. Preview/estimate paths and the enforcement path both
//! call these exact functions - there is deliberately no second copy of
//! any calculation anywhere in the system.
//!
//! ## Rules
//!
//! | Rule | Engine | Constant |
//! |------|--------|----------|
//! | Burn law | `BurnLawEnforcer` | 25% of every taxed transaction |
//! | Streak multiplier | `StreakMultiplierResolver` | 1.00x - 2.00x by tier |
//! | Mastery gate | `MasteryGate` | 85% accuracy, inclusive |
//! | Denomination swap | `SwapCalculator` | 100 shards per diamond |

pub mod burn;
pub mod mastery;
pub mod streak;
pub mod swap;

// Re-exports
pub use burn::{BurnLawEnforcer, BurnPolicy, BurnRecord};
pub use mastery::MasteryGate;
pub use streak::{StreakMultiplierResolver, StreakTable, StreakTier, TierResolution};
pub use swap::{SwapCalculator, SwapQuote};

/// Hard-law economic constants
pub mod constants {
    use diamond_core::Amount;

    /// Burn law rate: 25% of every taxed transaction is destroyed
    pub const BURN_RATE_BASIS_POINTS: u32 = 2_500;

    /// Smallest taxed amount that must burn at least one unit.
    ///
    /// Below this, the floored burn of zero stands; at or above it, a
    /// floored burn of zero is forced up to one unit.
    pub const MIN_BURN_THRESHOLD: Amount = 4;

    /// Mastery gate threshold: accuracy of 85% or better is eligible
    pub const MASTERY_THRESHOLD: f64 = 0.85;

    /// Scale factor for the optional above-threshold mastery bonus
    pub const MASTERY_BONUS_SCALE: f64 = 2.0;

    /// Fixed swap rate between denominations
    pub const SHARDS_PER_DIAMOND: u64 = 100;

    /// Flat swap fee, charged in the input denomination
    pub const SWAP_FLAT_FEE: Amount = 1;
}

pub use constants::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burn_rate_is_one_quarter() {
        assert_eq!(BURN_RATE_BASIS_POINTS, 2_500);
    }

    #[test]
    fn test_min_burn_threshold_matches_rate() {
        // 4 is the smallest amount whose floored 25% burn is already >= 1,
        // so the forced-minimum rule only engages for coarser configured rates.
        assert_eq!(MIN_BURN_THRESHOLD, 4);
    }
}
