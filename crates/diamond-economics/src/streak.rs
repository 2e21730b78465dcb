//! # Streak Multiplier Resolution
//!
//! Maps a consecutive-activity-day count to a reward multiplier tier.
//!
//! ## Default Tier Table
//!
//! | Tier | Min Days | Multiplier |
//! |------|----------|------------|
//! | Spark | 0 | 1.00x |
//! | Kindled | 3 | 1.20x |
//! | Burning | 7 | 1.50x |
//! | Blazing | 14 | 1.75x |
//! | Eternal | 30 | 2.00x |
//!
//! The table is the single source of truth: it is validated once at load
//! (starts at day zero, strictly ascending, so ranges can neither gap nor
//! overlap) and resolution always selects the tier with the greatest
//! `min_days` not exceeding the input. The top tier is open-ended, so the
//! cap holds for every input at or past its minimum. Negative day counts
//! clamp to zero rather than being rejected.

use diamond_core::{Amount, EconomyError, Multiplier, Result};
use serde::{Deserialize, Serialize};

/// One row of the tier table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakTier {
    /// Tier name, for display
    pub name: String,

    /// Inclusive lower bound in consecutive days
    pub min_days: u32,

    /// Reward multiplier for the tier
    pub multiplier: Multiplier,
}

impl StreakTier {
    /// Convenience constructor from basis points (12_000 = 1.20x)
    pub fn new(name: &str, min_days: u32, multiplier_bps: u32) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            min_days,
            multiplier: Multiplier::from_basis_points(multiplier_bps)?,
        })
    }
}

/// Validated, ascending tier table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakTable {
    tiers: Vec<StreakTier>,
}

impl StreakTable {
    /// Build a table, validating exhaustive range coverage.
    ///
    /// Rules: at least one tier, the first tier starts at day zero, and
    /// `min_days` strictly ascends. With open lower bounds this makes the
    /// ranges contiguous and non-overlapping by construction.
    pub fn new(tiers: Vec<StreakTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(EconomyError::InvalidConfig(
                "streak table must contain at least one tier".to_string(),
            ));
        }
        if tiers[0].min_days != 0 {
            return Err(EconomyError::InvalidConfig(format!(
                "first streak tier must start at day 0, found {}",
                tiers[0].min_days
            )));
        }
        for pair in tiers.windows(2) {
            if pair[1].min_days <= pair[0].min_days {
                return Err(EconomyError::InvalidConfig(format!(
                    "streak tiers must strictly ascend: {} then {}",
                    pair[0].min_days, pair[1].min_days
                )));
            }
        }
        Ok(Self { tiers })
    }

    /// The hard-law default table
    pub fn hard_law() -> Self {
        let tiers = vec![
            StreakTier::new("Spark", 0, 10_000),
            StreakTier::new("Kindled", 3, 12_000),
            StreakTier::new("Burning", 7, 15_000),
            StreakTier::new("Blazing", 14, 17_500),
            StreakTier::new("Eternal", 30, 20_000),
        ]
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .expect("hard-law multipliers are valid");

        Self { tiers }
    }

    /// All tiers, ascending
    pub fn tiers(&self) -> &[StreakTier] {
        &self.tiers
    }
}

impl Default for StreakTable {
    fn default() -> Self {
        Self::hard_law()
    }
}

/// Outcome of a tier lookup, including progress toward the next tier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierResolution {
    /// Name of the matched tier
    pub tier: String,

    /// Lower bound of the matched tier
    pub tier_min_days: u32,

    /// Multiplier to apply to reward bases
    pub multiplier: Multiplier,

    /// Name of the next tier up, if any
    pub next_tier: Option<String>,

    /// Days remaining until the next tier, if any.
    ///
    /// Informational only, for progress display; consistency with the
    /// tier table is its only obligation.
    pub days_to_next: Option<u32>,
}

/// Resolves day counts against the tier table
#[derive(Clone, Debug, Default)]
pub struct StreakMultiplierResolver {
    table: StreakTable,
}

impl StreakMultiplierResolver {
    /// Create a resolver over a validated table
    pub fn new(table: StreakTable) -> Self {
        Self { table }
    }

    /// Get the underlying table
    pub fn table(&self) -> &StreakTable {
        &self.table
    }

    /// Resolve a day count to its tier.
    ///
    /// Selects the tier with the greatest `min_days` that does not exceed
    /// the input; negative inputs clamp to zero (the lowest tier).
    pub fn resolve(&self, consecutive_days: i64) -> TierResolution {
        let days = consecutive_days.max(0).min(u32::MAX as i64) as u32;

        let tiers = self.table.tiers();
        let idx = tiers
            .iter()
            .rposition(|t| t.min_days <= days)
            .unwrap_or(0);

        let tier = &tiers[idx];
        let next = tiers.get(idx + 1);

        TierResolution {
            tier: tier.name.clone(),
            tier_min_days: tier.min_days,
            multiplier: tier.multiplier,
            next_tier: next.map(|t| t.name.clone()),
            days_to_next: next.map(|t| t.min_days - days),
        }
    }

    /// Scale a base reward by the resolved multiplier.
    ///
    /// Returns `(final_amount, bonus)` where
    /// `final_amount = floor(base × multiplier)` and
    /// `bonus = final_amount - base`.
    pub fn apply(&self, base_amount: Amount, consecutive_days: i64) -> (Amount, Amount) {
        let resolution = self.resolve(consecutive_days);
        let final_amount = resolution.multiplier.apply(base_amount);
        (final_amount, final_amount - base_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_law_multipliers() {
        let resolver = StreakMultiplierResolver::default();

        assert_eq!(resolver.resolve(0).multiplier.basis_points(), 10_000);
        assert_eq!(resolver.resolve(3).multiplier.basis_points(), 12_000);
        assert_eq!(resolver.resolve(7).multiplier.basis_points(), 15_000);
        assert_eq!(resolver.resolve(14).multiplier.basis_points(), 17_500);
        assert_eq!(resolver.resolve(30).multiplier.basis_points(), 20_000);
    }

    #[test]
    fn test_boundaries_use_highest_qualifying_minimum() {
        let resolver = StreakMultiplierResolver::default();

        assert_eq!(resolver.resolve(2).tier, "Spark");
        assert_eq!(resolver.resolve(3).tier, "Kindled");
        assert_eq!(resolver.resolve(6).tier, "Kindled");
        assert_eq!(resolver.resolve(7).tier, "Burning");
        assert_eq!(resolver.resolve(29).tier, "Blazing");
    }

    #[test]
    fn test_cap_holds_past_top_tier() {
        let resolver = StreakMultiplierResolver::default();

        let top = resolver.resolve(30);
        assert_eq!(resolver.resolve(365).multiplier, top.multiplier);
        assert_eq!(resolver.resolve(10_000).multiplier, top.multiplier);
        assert!(resolver.resolve(365).next_tier.is_none());
        assert!(resolver.resolve(365).days_to_next.is_none());
    }

    #[test]
    fn test_negative_days_clamp_to_lowest_tier() {
        let resolver = StreakMultiplierResolver::default();

        let r = resolver.resolve(-5);
        assert_eq!(r.tier, "Spark");
        assert_eq!(r.multiplier, Multiplier::IDENTITY);
    }

    #[test]
    fn test_days_to_next_progress() {
        let resolver = StreakMultiplierResolver::default();

        let r = resolver.resolve(5);
        assert_eq!(r.next_tier.as_deref(), Some("Burning"));
        assert_eq!(r.days_to_next, Some(2));
    }

    #[test]
    fn test_apply_floors_and_reports_bonus() {
        let resolver = StreakMultiplierResolver::default();

        assert_eq!(resolver.apply(100, 3), (120, 20));
        assert_eq!(resolver.apply(10, 14), (17, 7));
        assert_eq!(resolver.apply(0, 30), (0, 0));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_cap_holds_at_and_past_top_tier(days in 30i64..i64::MAX) {
                let resolver = StreakMultiplierResolver::default();
                prop_assert_eq!(resolver.resolve(days).multiplier.basis_points(), 20_000);
            }
        }
    }

    #[test]
    fn test_table_validation() {
        // Must start at zero
        let t = StreakTable::new(vec![StreakTier::new("A", 1, 10_000).unwrap()]);
        assert!(t.is_err());

        // Must strictly ascend
        let t = StreakTable::new(vec![
            StreakTier::new("A", 0, 10_000).unwrap(),
            StreakTier::new("B", 5, 12_000).unwrap(),
            StreakTier::new("C", 5, 15_000).unwrap(),
        ]);
        assert!(t.is_err());

        // Empty table rejected
        assert!(StreakTable::new(Vec::new()).is_err());
    }
}
