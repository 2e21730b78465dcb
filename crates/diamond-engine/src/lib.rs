//! # Diamond Engine
//!
//! Caller-facing surface of the diamond economy. Wires the policy
//! crates (burn law, mastery gate, streak multipliers, swaps), the
//! invariant-checked ledger, and the provably fair RNG oracle behind
//! one `EconomyEngine` built from TOML configuration.
//!
//! ```no_run
//! use diamond_engine::{EconomyConfig, EconomyEngine};
//! use diamond_core::{AccountId, EntrySource};
//!
//! # fn main() -> diamond_core::Result<()> {
//! let engine = EconomyEngine::new(EconomyConfig::default())?;
//! let account = AccountId::from_external("user-42");
//! engine.open_account(account);
//! engine.apply_reward(account, 100, Some(0.92), 7, EntrySource::Reward)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;

pub use config::EconomyConfig;
pub use engine::{
    EconomyEngine, RewardBreakdown, RewardReceipt, SwapReceipt, TaxedReceipt, WagerSettlement,
};
