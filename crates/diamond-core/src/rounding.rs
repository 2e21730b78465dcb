//! Deterministic integer rounding for money splits
//!
//! Every place the economy divides money uses the single floor rule
//! implemented here: `taken = floor(amount × rate)` and
//! `remainder = amount - taken`. Never banker's rounding, never ceiling.
//! Rates and multipliers are integer basis points (10_000 = 100%) so the
//! floor is exact integer arithmetic with a u128 intermediate, not a
//! float approximation.

use crate::constants::BASIS_POINT_SCALE;
use crate::error::{EconomyError, Result};
use crate::types::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fractional rate in [0, 1], stored as basis points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Basis points, bounded to [0, 10_000]
    basis_points: u32,
}

impl Rate {
    /// 0%
    pub const ZERO: Self = Self { basis_points: 0 };

    /// 100%
    pub const FULL: Self = Self {
        basis_points: BASIS_POINT_SCALE as u32,
    };

    /// Create a rate from basis points (10_000 = 100%)
    pub fn from_basis_points(basis_points: u32) -> Result<Self> {
        if basis_points as u64 > BASIS_POINT_SCALE {
            return Err(EconomyError::InvalidConfig(format!(
                "rate {basis_points} bps exceeds 100%"
            )));
        }
        Ok(Self { basis_points })
    }

    /// Create a rate from whole percent
    pub fn from_percent(percent: u32) -> Result<Self> {
        Self::from_basis_points(percent * 100)
    }

    /// Get basis points
    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    /// Fraction as f64, for display only - money math never touches this
    pub fn as_f64(&self) -> f64 {
        self.basis_points as f64 / BASIS_POINT_SCALE as f64
    }

    /// `floor(amount × rate)`
    pub fn take(&self, amount: Amount) -> Amount {
        let taken = amount as u128 * self.basis_points as u128 / BASIS_POINT_SCALE as u128;
        taken as Amount
    }

    /// Split an amount into `(taken, remainder)`.
    ///
    /// `taken + remainder == amount` holds exactly for every input.
    pub fn split(&self, amount: Amount) -> (Amount, Amount) {
        let taken = self.take(amount);
        (taken, amount - taken)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.basis_points as f64 / 100.0)
    }
}

/// Scaling factor of at least 1.0, stored as basis points (12_000 = 1.20×)
///
/// Used for streak reward multipliers, where the scaled amount must be an
/// exact `floor(base × multiplier)` with no float drift between the
/// preview and enforcement paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Multiplier {
    /// Basis points, at least 10_000 (1.00×)
    basis_points: u32,
}

impl Multiplier {
    /// 1.00× identity multiplier
    pub const IDENTITY: Self = Self {
        basis_points: BASIS_POINT_SCALE as u32,
    };

    /// Create a multiplier from basis points (10_000 = 1.00×)
    pub fn from_basis_points(basis_points: u32) -> Result<Self> {
        if (basis_points as u64) < BASIS_POINT_SCALE {
            return Err(EconomyError::InvalidConfig(format!(
                "multiplier {basis_points} bps below 1.00x"
            )));
        }
        Ok(Self { basis_points })
    }

    /// Get basis points
    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    /// Factor as f64, for display only
    pub fn as_f64(&self) -> f64 {
        self.basis_points as f64 / BASIS_POINT_SCALE as f64
    }

    /// `floor(amount × multiplier)`, saturating at `Amount::MAX`
    pub fn apply(&self, amount: Amount) -> Amount {
        let scaled = amount as u128 * self.basis_points as u128 / BASIS_POINT_SCALE as u128;
        Amount::try_from(scaled).unwrap_or(Amount::MAX)
    }

    /// Bonus over the base amount: `apply(amount) - amount`
    pub fn bonus(&self, amount: Amount) -> Amount {
        self.apply(amount) - amount
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.as_f64())
    }
}
