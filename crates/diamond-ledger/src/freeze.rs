//! Freeze state machine
//!
//! Process-wide safety switch over the whole ledger. Two states:
//!
//! - `UNFROZEN → FROZEN` on a critical reconciliation variance or a
//!   non-compliant burn split; the transition records the violation.
//! - `FROZEN → UNFROZEN` only via the explicit, audited resolution call.
//!
//! The flag is read before every append and write-guarded by the same
//! lock that performs the transition, so there is no window in which two
//! threads disagree about frozen state. The system prefers halting over
//! silently continuing on a known-bad balance.

use diamond_core::{Amount, EconomyError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The balance discrepancy that triggered a freeze
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Balance implied by the entry log
    pub expected: Amount,

    /// Balance actually stored
    pub actual: Amount,

    /// Absolute drift between the two
    pub variance: u64,
}

/// Freeze lifecycle snapshot
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FreezeState {
    /// Whether appends are currently blocked
    pub is_frozen: bool,

    /// When the freeze was triggered (UTC seconds)
    pub frozen_at: Option<i64>,

    /// Human-readable trigger description
    pub reason: Option<String>,

    /// Discrepancy snapshot recorded at the transition
    pub violation: Option<ViolationRecord>,

    /// When the most recent freeze was resolved (UTC seconds)
    pub resolved_at: Option<i64>,
}

/// Single-writer controller for the process-wide freeze flag
#[derive(Debug, Default)]
pub struct FreezeController {
    state: RwLock<FreezeState>,
}

impl FreezeController {
    /// Create an unfrozen controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current state
    pub fn state(&self) -> FreezeState {
        self.state.read().clone()
    }

    /// Fast frozen check
    pub fn is_frozen(&self) -> bool {
        self.state.read().is_frozen
    }

    /// Reject with `LedgerFrozen` if frozen; used as the append guard
    pub fn ensure_unfrozen(&self) -> Result<()> {
        let state = self.state.read();
        if state.is_frozen {
            return Err(EconomyError::LedgerFrozen {
                reason: state
                    .reason
                    .clone()
                    .unwrap_or_else(|| "unspecified".to_string()),
            });
        }
        Ok(())
    }

    /// Transition to FROZEN, recording the violation.
    ///
    /// Idempotent: a ledger already frozen keeps its original trigger and
    /// this returns false.
    pub fn freeze(&self, reason: &str, violation: Option<ViolationRecord>, now: i64) -> bool {
        let mut state = self.state.write();
        if state.is_frozen {
            return false;
        }

        warn!(reason, ?violation, "freezing ledger");
        *state = FreezeState {
            is_frozen: true,
            frozen_at: Some(now),
            reason: Some(reason.to_string()),
            violation,
            resolved_at: None,
        };
        true
    }

    /// Explicit, audited resolution back to UNFROZEN.
    ///
    /// The discrepancy itself must have been repaired out of band; this
    /// only reopens the append path and stamps `resolved_at`.
    pub fn resolve(&self, note: &str, now: i64) -> Result<FreezeState> {
        let mut state = self.state.write();
        if !state.is_frozen {
            return Err(EconomyError::InvalidInput(
                "ledger is not frozen".to_string(),
            ));
        }

        info!(note, "resolving ledger freeze");
        state.is_frozen = false;
        state.resolved_at = Some(now);
        Ok(state.clone())
    }
}
