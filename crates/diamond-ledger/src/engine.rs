//! Ledger invariant engine
//!
//! The single write path for balances. Every append checks the freeze
//! flag, then hands the atomic delta+balance update to the store
//! boundary. After every single append - not just eventually - the
//! invariant "balance equals the sum of all entry deltas for that
//! account" holds. Corrections are new compensating entries; nothing is
//! ever updated or deleted.

use crate::freeze::FreezeController;
use crate::store::LedgerStore;
use diamond_core::{
    Account, AccountId, Amount, Delta, EconomyError, EntrySource, LedgerEntry, Result,
};
use std::sync::Arc;
use tracing::debug;

/// Append-only transaction log over the store boundary
#[derive(Clone)]
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    freeze: Arc<FreezeController>,
}

impl LedgerEngine {
    /// Create an engine over a store and the process-wide freeze flag
    pub fn new(store: Arc<dyn LedgerStore>, freeze: Arc<FreezeController>) -> Self {
        Self { store, freeze }
    }

    /// The store boundary
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// The freeze controller
    pub fn freeze(&self) -> &Arc<FreezeController> {
        &self.freeze
    }

    /// Append a signed delta to an account.
    ///
    /// Rejected while frozen (`LedgerFrozen`) and for debits past the
    /// available balance (`InsufficientFunds`, reporting the shortfall);
    /// rejection leaves no partial write.
    pub fn append(
        &self,
        account_id: AccountId,
        delta: Delta,
        source: EntrySource,
        reference_id: Option<[u8; 32]>,
    ) -> Result<LedgerEntry> {
        self.freeze.ensure_unfrozen()?;

        let now = chrono::Utc::now().timestamp();
        let entry = self.store.append(account_id, delta, source, reference_id, now)?;

        debug!(
            account = %account_id,
            delta,
            source = %source,
            balance_after = entry.balance_after,
            "ledger append"
        );
        Ok(entry)
    }

    /// Append a compensating correction, accepted even while frozen.
    ///
    /// The freeze flag blocks new economic activity; undoing the written
    /// half of an interrupted transaction restores the invariant the
    /// freeze protects, so corrections keep flowing. The source is
    /// always [`EntrySource::Compensation`].
    pub fn append_correction(
        &self,
        account_id: AccountId,
        delta: Delta,
        reference_id: Option<[u8; 32]>,
    ) -> Result<LedgerEntry> {
        let now = chrono::Utc::now().timestamp();
        let entry = self
            .store
            .append(account_id, delta, EntrySource::Compensation, reference_id, now)?;

        debug!(
            account = %account_id,
            delta,
            balance_after = entry.balance_after,
            "ledger correction"
        );
        Ok(entry)
    }

    /// Current stored balance
    pub fn balance(&self, account_id: &AccountId) -> Result<Amount> {
        self.store
            .account(account_id)
            .map(|a| a.balance)
            .ok_or(EconomyError::AccountNotFound(*account_id))
    }

    /// Fetch or create an account
    pub fn open_account(&self, account_id: AccountId) -> Account {
        self.store
            .account_or_create(account_id, chrono::Utc::now().timestamp())
    }

    /// Ordered entries for one account
    pub fn entries(&self, account_id: &AccountId) -> Vec<LedgerEntry> {
        self.store.entries_for(account_id)
    }

    /// Recompute one account's invariant: chained `balance_after` and
    /// entry-sum both agreeing with the stored balance.
    pub fn verify_account(&self, account_id: &AccountId) -> Result<()> {
        let account = self
            .store
            .account(account_id)
            .ok_or(EconomyError::AccountNotFound(*account_id))?;

        let entries = self.store.entries_for(account_id);
        let mut running: i128 = 0;
        for entry in &entries {
            running += entry.delta as i128;
            if entry.balance_after as i128 != running {
                return Err(EconomyError::IntegrityViolation {
                    expected: running.max(0) as Amount,
                    actual: entry.balance_after,
                    variance: (entry.balance_after as i128 - running).unsigned_abs() as u64,
                });
            }
        }

        if account.balance as i128 != running {
            return Err(EconomyError::IntegrityViolation {
                expected: running.max(0) as Amount,
                actual: account.balance,
                variance: (account.balance as i128 - running).unsigned_abs() as u64,
            });
        }
        Ok(())
    }
}
