//! # Reconciliation Auditor
//!
//! Recomputes "balance == Σ deltas" across the whole ledger, classifies
//! the observed drift, and drives the freeze state machine.
//!
//! ## Variance Classification
//!
//! | Status | Variance | Action |
//! |--------|----------|--------|
//! | Healthy | 0 | none |
//! | Warning | 0 < v ≤ warning threshold | logged |
//! | Critical | warning < v ≤ critical threshold | auto-freeze |
//! | Emergency | v > critical threshold | auto-freeze |
//!
//! The auditor reads a point-in-time snapshot of the entry log and never
//! holds an account lock across the full sum, so appends proceed during
//! an audit. A write that lands between the log snapshot and the balance
//! read shows up as a transient small variance that the next cycle
//! clears. Each run appends one immutable snapshot; history is never
//! rewritten.

use crate::freeze::{FreezeController, ViolationRecord};
use crate::store::LedgerStore;
use diamond_core::{AccountId, Amount};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Snapshots retained in memory before the oldest are dropped
const MAX_SNAPSHOT_HISTORY: usize = 1_000;

/// Severity of an observed balance drift
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuditStatus {
    /// Zero variance
    Healthy,
    /// Small drift, logged only
    Warning,
    /// Drift past the warning threshold
    Critical,
    /// Drift past the critical threshold
    Emergency,
}

impl AuditStatus {
    /// Get status name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
            Self::Emergency => "Emergency",
        }
    }

    /// Does this status trigger an automatic freeze (when enabled)?
    pub fn is_freezing(&self) -> bool {
        matches!(self, Self::Critical | Self::Emergency)
    }
}

/// Auditor thresholds and behavior
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditPolicy {
    /// Upper bound of the Warning band
    pub warning_threshold: u64,

    /// Upper bound of the Critical band
    pub critical_threshold: u64,

    /// Whether Critical/Emergency variance freezes the ledger
    pub auto_freeze: bool,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            warning_threshold: 100,
            critical_threshold: 1_000,
            auto_freeze: true,
        }
    }
}

impl AuditPolicy {
    /// Classify a variance into a severity band
    pub fn classify(&self, variance: u64) -> AuditStatus {
        if variance == 0 {
            AuditStatus::Healthy
        } else if variance <= self.warning_threshold {
            AuditStatus::Warning
        } else if variance <= self.critical_threshold {
            AuditStatus::Critical
        } else {
            AuditStatus::Emergency
        }
    }
}

/// Immutable record of one reconciliation cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSnapshot {
    /// Ledger-wide balance implied by the entry log
    pub expected_balance: Amount,

    /// Ledger-wide balance actually stored
    pub actual_balance: Amount,

    /// Sum of per-account absolute drifts.
    ///
    /// Intentionally stricter than the difference between
    /// `expected_balance` and `actual_balance` reported alongside:
    /// two offsetting corruptions cancel in the totals but each still
    /// contributes its full magnitude here, so the snapshot classifies
    /// and freezes on drift the totals alone would hide.
    pub variance: u64,

    /// Severity classification of the variance
    pub status: AuditStatus,

    /// Accounts examined this cycle
    pub accounts_audited: u64,

    /// Accounts whose stored balance disagreed with their entry sum
    pub accounts_with_drift: u64,

    /// When this cycle ran (UTC seconds)
    pub audited_at: i64,
}

/// Background reconciliation over the whole ledger
pub struct ReconciliationAuditor {
    store: Arc<dyn LedgerStore>,
    freeze: Arc<FreezeController>,
    policy: AuditPolicy,
    history: RwLock<Vec<ReconciliationSnapshot>>,
}

impl ReconciliationAuditor {
    /// Create an auditor over a store and the process-wide freeze flag
    pub fn new(
        store: Arc<dyn LedgerStore>,
        freeze: Arc<FreezeController>,
        policy: AuditPolicy,
    ) -> Self {
        Self {
            store,
            freeze,
            policy,
            history: RwLock::new(Vec::new()),
        }
    }

    /// The active policy
    pub fn policy(&self) -> &AuditPolicy {
        &self.policy
    }

    /// Run one reconciliation cycle and record its snapshot.
    ///
    /// The entry log is snapshotted first and released before balances
    /// are read, so no account lock is held across the sum.
    pub fn run_once(&self) -> ReconciliationSnapshot {
        let entries = self.store.all_entries();

        let mut expected: HashMap<AccountId, i128> = HashMap::new();
        for entry in &entries {
            *expected.entry(entry.account_id).or_insert(0) += entry.delta as i128;
        }

        let accounts = self.store.all_accounts();
        let mut expected_total: u128 = 0;
        let mut actual_total: u128 = 0;
        let mut variance: u128 = 0;
        let mut accounts_with_drift = 0u64;
        let mut worst_drift: Option<ViolationRecord> = None;

        for account in &accounts {
            let exp = expected.remove(&account.id).unwrap_or(0).max(0) as u128;
            let act = account.balance as u128;
            expected_total += exp;
            actual_total += act;

            let drift = exp.abs_diff(act);
            if drift > 0 {
                accounts_with_drift += 1;
                variance += drift;
                let record = ViolationRecord {
                    expected: exp as Amount,
                    actual: act as Amount,
                    variance: drift as u64,
                };
                if worst_drift.map_or(true, |w| record.variance > w.variance) {
                    worst_drift = Some(record);
                }
            }
        }

        // Entries for accounts the store no longer returns are pure drift.
        for (_, exp) in expected {
            let exp = exp.max(0) as u128;
            if exp > 0 {
                accounts_with_drift += 1;
                variance += exp;
                expected_total += exp;
            }
        }

        let variance = variance.min(u64::MAX as u128) as u64;
        let status = self.policy.classify(variance);
        let snapshot = ReconciliationSnapshot {
            expected_balance: expected_total.min(u64::MAX as u128) as Amount,
            actual_balance: actual_total.min(u64::MAX as u128) as Amount,
            variance,
            status,
            accounts_audited: accounts.len() as u64,
            accounts_with_drift,
            audited_at: chrono::Utc::now().timestamp(),
        };

        match status {
            AuditStatus::Healthy => {
                info!(
                    accounts = snapshot.accounts_audited,
                    "reconciliation healthy"
                );
            }
            AuditStatus::Warning => {
                warn!(variance, "reconciliation variance within warning band");
            }
            AuditStatus::Critical | AuditStatus::Emergency => {
                warn!(
                    variance,
                    status = status.name(),
                    "reconciliation variance past critical threshold"
                );
                if self.policy.auto_freeze {
                    self.freeze.freeze(
                        &format!(
                            "reconciliation variance {variance} ({}) across {accounts_with_drift} account(s)",
                            status.name()
                        ),
                        worst_drift,
                        snapshot.audited_at,
                    );
                }
            }
        }

        let mut history = self.history.write();
        history.push(snapshot.clone());
        let len = history.len();
        if len > MAX_SNAPSHOT_HISTORY {
            history.drain(0..len - MAX_SNAPSHOT_HISTORY);
        }

        snapshot
    }

    /// Most recent snapshot, if any cycle has run
    pub fn latest(&self) -> Option<ReconciliationSnapshot> {
        self.history.read().last().cloned()
    }

    /// Snapshot history, oldest first
    pub fn history(&self) -> Vec<ReconciliationSnapshot> {
        self.history.read().clone()
    }

    /// Spawn the fixed-interval background loop.
    ///
    /// Runs until the returned handle is aborted; each tick is one
    /// `run_once` cycle.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_once();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;
    use diamond_core::EntrySource;

    fn acct(n: u8) -> AccountId {
        AccountId::new([n; 32])
    }

    fn setup() -> (Arc<MemoryLedgerStore>, Arc<FreezeController>, ReconciliationAuditor) {
        let store = Arc::new(MemoryLedgerStore::new());
        let freeze = Arc::new(FreezeController::new());
        let auditor = ReconciliationAuditor::new(
            store.clone() as Arc<dyn LedgerStore>,
            freeze.clone(),
            AuditPolicy::default(),
        );
        (store, freeze, auditor)
    }

    #[test]
    fn test_clean_ledger_is_healthy() {
        let (store, freeze, auditor) = setup();
        store.append(acct(1), 500, EntrySource::Reward, None, 1).unwrap();
        store.append(acct(1), -100, EntrySource::Purchase, None, 2).unwrap();
        store.append(acct(2), 300, EntrySource::Sale, None, 3).unwrap();

        let snapshot = auditor.run_once();
        assert_eq!(snapshot.status, AuditStatus::Healthy);
        assert_eq!(snapshot.variance, 0);
        assert_eq!(snapshot.expected_balance, 700);
        assert_eq!(snapshot.actual_balance, 700);
        assert_eq!(snapshot.accounts_audited, 2);
        assert!(!freeze.is_frozen());
    }

    #[test]
    fn test_small_drift_warns_without_freezing() {
        let (store, freeze, auditor) = setup();
        store.append(acct(1), 500, EntrySource::Reward, None, 1).unwrap();
        store.corrupt_balance(&acct(1), 550);

        let snapshot = auditor.run_once();
        assert_eq!(snapshot.status, AuditStatus::Warning);
        assert_eq!(snapshot.variance, 50);
        assert_eq!(snapshot.accounts_with_drift, 1);
        assert!(!freeze.is_frozen());
    }

    #[test]
    fn test_critical_drift_freezes() {
        let (store, freeze, auditor) = setup();
        store.append(acct(1), 500, EntrySource::Reward, None, 1).unwrap();
        store.corrupt_balance(&acct(1), 5_000);

        let snapshot = auditor.run_once();
        assert_eq!(snapshot.status, AuditStatus::Emergency);
        assert!(freeze.is_frozen());

        let violation = freeze.state().violation.unwrap();
        assert_eq!(violation.expected, 500);
        assert_eq!(violation.actual, 5_000);
        assert_eq!(violation.variance, 4_500);
    }

    #[test]
    fn test_offsetting_corruption_does_not_cancel() {
        let (store, freeze, auditor) = setup();
        store.append(acct(1), 1_000, EntrySource::Reward, None, 1).unwrap();
        store.append(acct(2), 1_000, EntrySource::Reward, None, 2).unwrap();
        // +900 on one account, -900 on another: totals match, drift does not
        store.corrupt_balance(&acct(1), 1_900);
        store.corrupt_balance(&acct(2), 100);

        let snapshot = auditor.run_once();
        assert_eq!(snapshot.expected_balance, snapshot.actual_balance);
        assert_eq!(snapshot.variance, 1_800);
        assert_eq!(snapshot.status, AuditStatus::Emergency);
        assert!(freeze.is_frozen());
    }

    #[test]
    fn test_auto_freeze_can_be_disabled() {
        let store = Arc::new(MemoryLedgerStore::new());
        let freeze = Arc::new(FreezeController::new());
        let auditor = ReconciliationAuditor::new(
            store.clone() as Arc<dyn LedgerStore>,
            freeze.clone(),
            AuditPolicy {
                auto_freeze: false,
                ..AuditPolicy::default()
            },
        );

        store.append(acct(1), 10, EntrySource::Reward, None, 1).unwrap();
        store.corrupt_balance(&acct(1), 100_000);

        let snapshot = auditor.run_once();
        assert_eq!(snapshot.status, AuditStatus::Emergency);
        assert!(!freeze.is_frozen());
    }

    #[test]
    fn test_history_is_append_only() {
        let (store, _freeze, auditor) = setup();
        store.append(acct(1), 10, EntrySource::Reward, None, 1).unwrap();

        auditor.run_once();
        auditor.run_once();
        auditor.run_once();

        let history = auditor.history();
        assert_eq!(history.len(), 3);
        assert_eq!(auditor.latest().unwrap(), history[2].clone());
    }

    #[tokio::test]
    async fn test_background_loop_detects_corruption() {
        let store = Arc::new(MemoryLedgerStore::new());
        let freeze = Arc::new(FreezeController::new());
        let auditor = Arc::new(ReconciliationAuditor::new(
            store.clone() as Arc<dyn LedgerStore>,
            freeze.clone(),
            AuditPolicy::default(),
        ));

        store.append(acct(1), 100, EntrySource::Reward, None, 1).unwrap();
        store.corrupt_balance(&acct(1), 99_999);

        let handle = auditor.clone().spawn(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();

        assert!(freeze.is_frozen());
        assert!(auditor.latest().unwrap().status.is_freezing());
    }
}
