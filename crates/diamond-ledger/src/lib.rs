//! # Diamond Ledger
//!
//! Append-only double-entry log for diamond balances with per-account
//! write serialization, a process-wide freeze state machine, and a
//! background reconciliation auditor.
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | `store` | Entry log and balances, per-account append locking |
//! | `engine` | Freeze-gated append surface and per-account verification |
//! | `freeze` | UNFROZEN/FROZEN state machine with explicit resolution |
//! | `audit` | Periodic whole-ledger reconciliation and auto-freeze |
//!
//! ## Core Invariant
//!
//! For every account, the stored balance equals the sum of its entry
//! deltas. Every append checks it locally; the auditor re-proves it
//! globally on a fixed interval and freezes the ledger when the drift
//! passes the critical threshold.

pub mod audit;
pub mod engine;
pub mod freeze;
pub mod store;

pub use audit::{AuditPolicy, AuditStatus, ReconciliationAuditor, ReconciliationSnapshot};
pub use engine::LedgerEngine;
pub use freeze::{FreezeController, FreezeState, ViolationRecord};
pub use store::{LedgerStore, MemoryLedgerStore};
