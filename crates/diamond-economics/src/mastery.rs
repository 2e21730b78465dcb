//! # Mastery Gate
//!
//! Minimum-performance precondition for reward eligibility. A failed
//! check must short-circuit before any ledger write or multiplier
//! application, and it surfaces the dedicated `MasteryGateFailed` error
//! so callers never mistake "ineligible" for "zero reward after
//! rounding".

use crate::constants::{MASTERY_BONUS_SCALE, MASTERY_THRESHOLD};
use diamond_core::{Amount, EconomyError, Result, BASIS_POINT_SCALE};
use serde::{Deserialize, Serialize};

/// Eligibility check comparing a performance ratio against a fixed threshold
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MasteryGate {
    /// Minimum accuracy in [0, 1]; exactly-at-threshold passes
    pub threshold: f64,

    /// Scale factor for the optional above-threshold bonus
    pub bonus_scale: f64,
}

impl Default for MasteryGate {
    fn default() -> Self {
        Self {
            threshold: MASTERY_THRESHOLD,
            bonus_scale: MASTERY_BONUS_SCALE,
        }
    }
}

impl MasteryGate {
    /// Create a gate with the given threshold and bonus scale
    pub fn new(threshold: f64, bonus_scale: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EconomyError::InvalidConfig(format!(
                "mastery threshold {threshold} outside [0, 1]"
            )));
        }
        if bonus_scale < 0.0 || !bonus_scale.is_finite() {
            return Err(EconomyError::InvalidConfig(format!(
                "mastery bonus scale {bonus_scale} must be finite and non-negative"
            )));
        }
        Ok(Self {
            threshold,
            bonus_scale,
        })
    }

    /// Eligibility: `accuracy >= threshold`, inclusive at the boundary
    pub fn check(&self, accuracy: f64) -> bool {
        accuracy >= self.threshold
    }

    /// Check eligibility, rejecting with a stable reason code on failure.
    ///
    /// Out-of-range accuracy is `InvalidInput`, never a gate failure.
    pub fn ensure(&self, accuracy: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&accuracy) || accuracy.is_nan() {
            return Err(EconomyError::InvalidInput(format!(
                "accuracy {accuracy} outside [0, 1]"
            )));
        }
        if !self.check(accuracy) {
            return Err(EconomyError::MasteryGateFailed {
                accuracy,
                threshold: self.threshold,
            });
        }
        Ok(())
    }

    /// Above-threshold bonus: `floor(base × (accuracy − threshold) × scale)`.
    ///
    /// Accuracy, threshold, and scale are quantized to basis points so
    /// the subtraction and floor happen in integer math. Subtracting the
    /// raw floats loses the low bits (`0.95 - 0.85` is not `0.10`) and
    /// the floor lands one below the exact product.
    ///
    /// Zero for ineligible accuracy; added to the base before streak
    /// multiplication.
    pub fn bonus(&self, base_amount: Amount, accuracy: f64) -> Amount {
        if !self.check(accuracy) {
            return 0;
        }
        let margin_bps = to_basis_points(accuracy).saturating_sub(to_basis_points(self.threshold));
        let scale_bps = to_basis_points(self.bonus_scale);
        let scaled = base_amount as u128 * margin_bps as u128 * scale_bps as u128
            / (BASIS_POINT_SCALE as u128 * BASIS_POINT_SCALE as u128);
        Amount::try_from(scaled).unwrap_or(Amount::MAX)
    }
}

/// Quantize a non-negative factor to basis points (`0.85` becomes `8_500`).
fn to_basis_points(value: f64) -> u64 {
    (value * BASIS_POINT_SCALE as f64).round() as u64
}
