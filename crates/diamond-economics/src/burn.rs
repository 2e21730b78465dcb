//! # Burn Law Enforcement
//!
//! Applies the fixed value-destruction split to every taxed transaction:
//! a quarter of the amount is permanently removed from circulation, the
//! rest flows on as the net amount.
//!
//! ## Split Rules
//!
//! 1. Exempt sources (administrative grant, refund, migration) burn nothing.
//! 2. Otherwise `burned = floor(amount × burn_rate)`.
//! 3. Minimum-burn floor: if the floored burn is zero but the amount is at
//!    or above the configured threshold, the burn is forced to one unit.
//! 4. `net = amount - burned`, always, so `burned + net == amount` exactly.
//!
//! Enforcement never fails; an unknown or unusual source simply falls
//! through as non-exempt. Validation reports a boolean verdict instead of
//! erroring so batch audits can continue past one bad record.

use crate::constants::{BURN_RATE_BASIS_POINTS, MIN_BURN_THRESHOLD};
use diamond_core::{Amount, EntrySource, Rate};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Burn split configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnPolicy {
    /// Fraction of every taxed amount that is destroyed
    pub rate: Rate,

    /// Smallest amount that must burn at least one unit
    pub min_burn_threshold: Amount,
}

impl Default for BurnPolicy {
    fn default() -> Self {
        Self {
            rate: Rate::from_basis_points(BURN_RATE_BASIS_POINTS)
                .expect("default burn rate is a valid fraction"),
            min_burn_threshold: MIN_BURN_THRESHOLD,
        }
    }
}

/// The deterministic split derived from one taxed ledger entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnRecord {
    /// Amount before the split
    pub original_amount: Amount,

    /// Portion permanently destroyed
    pub burn_amount: Amount,

    /// Portion that flows on to the counterparty
    pub net_amount: Amount,

    /// Originating transaction category
    pub source: EntrySource,

    /// True when the source is in the exemption set
    pub exempt: bool,
}

/// Applies and independently re-checks the burn law
#[derive(Clone, Copy, Debug, Default)]
pub struct BurnLawEnforcer {
    policy: BurnPolicy,
}

impl BurnLawEnforcer {
    /// Create an enforcer with the given policy
    pub fn new(policy: BurnPolicy) -> Self {
        Self { policy }
    }

    /// Get the active policy
    pub fn policy(&self) -> &BurnPolicy {
        &self.policy
    }

    /// Split a taxed amount into burned and net portions.
    ///
    /// This is total: every `(amount, source)` pair produces a record.
    pub fn enforce(&self, amount: Amount, source: EntrySource) -> BurnRecord {
        if source.is_tax_exempt() {
            return BurnRecord {
                original_amount: amount,
                burn_amount: 0,
                net_amount: amount,
                source,
                exempt: true,
            };
        }

        let (mut burned, _) = self.policy.rate.split(amount);
        if burned == 0 && amount >= self.policy.min_burn_threshold {
            burned = 1;
        }

        BurnRecord {
            original_amount: amount,
            burn_amount: burned,
            net_amount: amount - burned,
            source,
            exempt: false,
        }
    }

    /// Re-derive the expected split and compare against a claimed one.
    ///
    /// Used by the reconciliation path to catch callers that reported an
    /// incorrect split. Both components and their sum must match exactly.
    pub fn validate(
        &self,
        original: Amount,
        claimed_burned: Amount,
        claimed_net: Amount,
        source: EntrySource,
    ) -> bool {
        let expected = self.enforce(original, source);

        let compliant = claimed_burned == expected.burn_amount
            && claimed_net == expected.net_amount
            && claimed_burned + claimed_net == original;
        if !compliant {
            warn!(
                original,
                claimed_burned,
                claimed_net,
                expected_burned = expected.burn_amount,
                source = %source,
                "non-compliant burn split"
            );
        }
        compliant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hard_law_splits() {
        let enforcer = BurnLawEnforcer::default();

        let r = enforcer.enforce(100, EntrySource::Sale);
        assert_eq!((r.burn_amount, r.net_amount), (25, 75));

        let r = enforcer.enforce(10, EntrySource::Sale);
        assert_eq!((r.burn_amount, r.net_amount), (2, 8));

        let r = enforcer.enforce(4, EntrySource::Sale);
        assert_eq!((r.burn_amount, r.net_amount), (1, 3));

        // Below the minimum-burn threshold the burn truly stays zero
        let r = enforcer.enforce(3, EntrySource::Sale);
        assert_eq!((r.burn_amount, r.net_amount), (0, 3));
    }

    #[test]
    fn test_exempt_sources_burn_nothing() {
        let enforcer = BurnLawEnforcer::default();

        for source in [
            EntrySource::AdminGrant,
            EntrySource::Refund,
            EntrySource::Migration,
        ] {
            let r = enforcer.enforce(1_000, source);
            assert!(r.exempt);
            assert_eq!(r.burn_amount, 0);
            assert_eq!(r.net_amount, 1_000);
        }
    }

    #[test]
    fn test_minimum_burn_floor_with_coarse_rate() {
        // A 1% rate floors small burns to zero; the threshold forces them up.
        let policy = BurnPolicy {
            rate: Rate::from_percent(1).unwrap(),
            min_burn_threshold: 10,
        };
        let enforcer = BurnLawEnforcer::new(policy);

        let r = enforcer.enforce(50, EntrySource::Sale);
        assert_eq!(r.burn_amount, 1);
        assert_eq!(r.net_amount, 49);

        let r = enforcer.enforce(9, EntrySource::Sale);
        assert_eq!(r.burn_amount, 0);
    }

    #[test]
    fn test_validate_accepts_correct_split() {
        let enforcer = BurnLawEnforcer::default();
        assert!(enforcer.validate(100, 25, 75, EntrySource::Sale));
        assert!(enforcer.validate(1_000, 0, 1_000, EntrySource::Refund));
    }

    #[test]
    fn test_validate_rejects_wrong_split() {
        let enforcer = BurnLawEnforcer::default();

        // Wrong components
        assert!(!enforcer.validate(100, 24, 76, EntrySource::Sale));
        // Components sum past the original
        assert!(!enforcer.validate(100, 25, 76, EntrySource::Sale));
        // Exempt source claiming a burn
        assert!(!enforcer.validate(100, 25, 75, EntrySource::AdminGrant));
    }

    proptest! {
        #[test]
        fn prop_burn_conserves_amount(amount in any::<u64>()) {
            let enforcer = BurnLawEnforcer::default();
            let r = enforcer.enforce(amount, EntrySource::Wager);
            prop_assert_eq!(r.burn_amount + r.net_amount, amount);
        }

        #[test]
        fn prop_enforce_validates_itself(amount in any::<u64>()) {
            let enforcer = BurnLawEnforcer::default();
            let r = enforcer.enforce(amount, EntrySource::Tip);
            prop_assert!(enforcer.validate(amount, r.burn_amount, r.net_amount, EntrySource::Tip));
        }
    }
}
