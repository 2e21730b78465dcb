//! # Diamond Core
//!
//! Core data structures for the diamond economy consistency core.
//!
//! This crate provides the fundamental building blocks:
//! - `Amount` / `Delta` - Integer money in the smallest currency unit
//! - `Account` - A balance holder, mutated only through ledger entries
//! - `LedgerEntry` - One immutable, signed balance-changing record
//! - `Rate` / `Multiplier` - Exact floor-based integer splitting and scaling
//!
//! ## Money model
//!
//! Every balance is a non-negative integer count of the smallest unit.
//! All splits use a single floor rule so that `taken + remainder == amount`
//! holds exactly; no fractional unit is ever created or lost anywhere in
//! the economy.

pub mod error;
pub mod rounding;
pub mod types;

pub use error::*;
pub use rounding::*;
pub use types::*;

/// Diamond currency constants
pub mod constants {
    /// Currency symbol
    pub const SYMBOL: &str = "DMD";

    /// Currency name
    pub const NAME: &str = "Diamond";

    /// Diamonds are indivisible; the smallest unit is one diamond
    pub const ONE_DIAMOND: u64 = 1;

    /// Scale used for all fractional rates and multipliers (10_000 = 100%)
    pub const BASIS_POINT_SCALE: u64 = 10_000;
}

pub use constants::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{EconomyError, Result};
    pub use crate::rounding::{Multiplier, Rate};
    pub use crate::types::*;
}
