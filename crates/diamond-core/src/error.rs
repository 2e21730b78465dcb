//! Error types for diamond economy operations

use crate::types::{AccountId, Amount};
use thiserror::Error;

/// Result type alias for economy operations
pub type Result<T> = std::result::Result<T, EconomyError>;

/// Errors that can occur in the economy consistency core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EconomyError {
    // === Input Validation ===
    /// Caller supplied an unusable value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Debit exceeds the available balance (no partial debit is made)
    #[error("Insufficient funds: balance {balance}, required {required}, short {shortfall}")]
    InsufficientFunds {
        balance: Amount,
        required: Amount,
        shortfall: Amount,
    },

    // === Reward Gating ===
    /// Accuracy below the mastery threshold; no ledger write occurred
    #[error("Mastery gate failed: accuracy {accuracy:.4} below threshold {threshold:.4}")]
    MasteryGateFailed { accuracy: f64, threshold: f64 },

    // === Ledger Safety ===
    /// Append attempted while the ledger is frozen
    #[error("Ledger is frozen: {reason}")]
    LedgerFrozen { reason: String },

    /// Reconciliation detected balance drift
    #[error("Integrity violation: expected {expected}, actual {actual}, variance {variance}")]
    IntegrityViolation {
        expected: Amount,
        actual: Amount,
        variance: u64,
    },

    /// Account not found in the store
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    // === Fair Randomness ===
    /// Revealed seed does not match the published commitment
    #[error("RNG verification failed: revealed seed does not match commitment")]
    RngVerificationFailed,

    /// Unknown RNG round
    #[error("RNG round not found: {0}")]
    RoundNotFound(u64),

    /// Round already revealed and sealed
    #[error("RNG round {0} already revealed")]
    RoundAlreadyRevealed(u64),

    /// Settlement requires a revealed round
    #[error("RNG round {0} not yet revealed")]
    RoundNotRevealed(u64),

    // === Configuration ===
    /// Configuration rejected at load time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EconomyError {
    /// Stable machine-readable reason code.
    ///
    /// Callers must be able to distinguish "ineligible" from "zero reward
    /// due to rounding" and similar near-miss outcomes, so each failure
    /// class carries a fixed code independent of display formatting.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::MasteryGateFailed { .. } => "MASTERY_GATE_FAILED",
            Self::LedgerFrozen { .. } => "LEDGER_FROZEN",
            Self::IntegrityViolation { .. } => "INTEGRITY_VIOLATION",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::RngVerificationFailed => "RNG_VERIFICATION_FAILED",
            Self::RoundNotFound(_) => "RNG_ROUND_NOT_FOUND",
            Self::RoundAlreadyRevealed(_) => "RNG_ROUND_ALREADY_REVEALED",
            Self::RoundNotRevealed(_) => "RNG_ROUND_NOT_REVEALED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}
