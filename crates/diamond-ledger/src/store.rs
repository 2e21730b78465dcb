//! Ledger store boundary
//!
//! The core talks to durable storage through this narrow procedure-call
//! surface. The production implementation is an external transactional
//! store; its contract is that `append` executes as a single atomic unit
//! (precondition check, entry persistence, balance advance) serialized
//! per account. `MemoryLedgerStore` implements the same contract
//! in-process and backs tests and single-node deployments.

use dashmap::DashMap;
use diamond_core::{
    Account, AccountId, Amount, Delta, EconomyError, EntrySource, LedgerEntry, Result,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Narrow boundary to the transactional account/entry store
pub trait LedgerStore: Send + Sync {
    /// Fetch an account, if it exists
    fn account(&self, id: &AccountId) -> Option<Account>;

    /// Fetch an account, creating an empty one if absent
    fn account_or_create(&self, id: AccountId, now: i64) -> Account;

    /// Execute one append as a single atomic unit.
    ///
    /// Under the account's exclusive lock: verify `balance + delta >= 0`,
    /// persist the immutable entry with its `balance_after` snapshot, and
    /// advance the stored balance to that same value. Two concurrent
    /// appends to one account must never both read the same prior
    /// balance; appends to different accounts may proceed in parallel.
    fn append(
        &self,
        account_id: AccountId,
        delta: Delta,
        source: EntrySource,
        reference_id: Option<[u8; 32]>,
        now: i64,
    ) -> Result<LedgerEntry>;

    /// Ordered entries for one account
    fn entries_for(&self, account_id: &AccountId) -> Vec<LedgerEntry>;

    /// Point-in-time snapshot of the full ordered entry log
    fn all_entries(&self) -> Vec<LedgerEntry>;

    /// All accounts with their stored balances
    fn all_accounts(&self) -> Vec<Account>;
}

/// In-process store with per-account serialization via sharded locking
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    /// Stored balances; the map entry lock is the per-account append lock
    accounts: DashMap<AccountId, Account>,

    /// Append-only entry log in ledger-wide order
    entries: RwLock<Vec<LedgerEntry>>,

    /// Next monotonic entry id
    sequence: AtomicU64,
}

impl MemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored balance without a ledger entry.
    ///
    /// This deliberately violates the ledger invariant. It exists to
    /// simulate external corruption so reconciliation and freeze paths
    /// can be exercised; nothing in the economy itself calls it.
    pub fn corrupt_balance(&self, account_id: &AccountId, balance: Amount) -> bool {
        match self.accounts.get_mut(account_id) {
            Some(mut account) => {
                account.balance = balance;
                true
            }
            None => false,
        }
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id).map(|a| a.clone())
    }

    fn account_or_create(&self, id: AccountId, now: i64) -> Account {
        self.accounts
            .entry(id)
            .or_insert_with(|| Account::new(id, now))
            .clone()
    }

    fn append(
        &self,
        account_id: AccountId,
        delta: Delta,
        source: EntrySource,
        reference_id: Option<[u8; 32]>,
        now: i64,
    ) -> Result<LedgerEntry> {
        // Holding the map entry exclusively serializes appends per account
        // while leaving other accounts' appends fully parallel.
        let mut account = self
            .accounts
            .entry(account_id)
            .or_insert_with(|| Account::new(account_id, now));

        let balance_after = if delta >= 0 {
            account
                .balance
                .checked_add(delta as Amount)
                .ok_or_else(|| {
                    EconomyError::InvalidInput(format!("delta {delta} overflows balance"))
                })?
        } else {
            let required = delta.unsigned_abs();
            if account.balance < required {
                return Err(EconomyError::InsufficientFunds {
                    balance: account.balance,
                    required,
                    shortfall: required - account.balance,
                });
            }
            account.balance - required
        };

        let entry = LedgerEntry {
            id: self.sequence.fetch_add(1, Ordering::SeqCst),
            account_id,
            delta,
            balance_after,
            source,
            reference_id,
            created_at: now,
        };

        self.entries.write().push(entry.clone());
        account.balance = balance_after;

        Ok(entry)
    }

    fn entries_for(&self, account_id: &AccountId) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.account_id == *account_id)
            .cloned()
            .collect()
    }

    fn all_entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().clone()
    }

    fn all_accounts(&self) -> Vec<Account> {
        self.accounts.iter().map(|a| a.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn acct(n: u8) -> AccountId {
        AccountId::new([n; 32])
    }

    #[test]
    fn test_append_advances_balance_atomically() {
        let store = MemoryLedgerStore::new();
        let id = acct(1);

        let e1 = store.append(id, 100, EntrySource::Reward, None, 1).unwrap();
        assert_eq!(e1.balance_after, 100);

        let e2 = store.append(id, -30, EntrySource::Purchase, None, 2).unwrap();
        assert_eq!(e2.balance_after, 70);
        assert_eq!(store.account(&id).unwrap().balance, 70);
        assert!(e2.id > e1.id);
    }

    #[test]
    fn test_over_debit_rejected_without_entry() {
        let store = MemoryLedgerStore::new();
        let id = acct(1);
        store.append(id, 50, EntrySource::Reward, None, 1).unwrap();

        let err = store
            .append(id, -80, EntrySource::Stake, None, 2)
            .unwrap_err();
        assert_eq!(
            err,
            EconomyError::InsufficientFunds {
                balance: 50,
                required: 80,
                shortfall: 30,
            }
        );

        // No partial debit, no phantom entry
        assert_eq!(store.account(&id).unwrap().balance, 50);
        assert_eq!(store.entries_for(&id).len(), 1);
    }

    #[test]
    fn test_entry_chain_invariant() {
        let store = MemoryLedgerStore::new();
        let id = acct(2);

        for delta in [10i64, 25, -5, 40, -20] {
            store.append(id, delta, EntrySource::Wager, None, 1).unwrap();
        }

        let entries = store.entries_for(&id);
        let mut running: i64 = 0;
        for entry in &entries {
            running += entry.delta;
            assert_eq!(entry.balance_after as i64, running);
        }
        assert_eq!(store.account(&id).unwrap().balance as i64, running);
    }

    #[test]
    fn test_concurrent_appends_same_account_never_lose_updates() {
        let store = Arc::new(MemoryLedgerStore::new());
        let id = acct(3);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        store.append(id, 1, EntrySource::Reward, None, 1).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.account(&id).unwrap().balance, 2_000);
        assert_eq!(store.entries_for(&id).len(), 2_000);

        // Every balance_after is distinct: no two appends read the same
        // prior balance.
        let mut afters: Vec<_> = store
            .entries_for(&id)
            .iter()
            .map(|e| e.balance_after)
            .collect();
        afters.sort_unstable();
        afters.dedup();
        assert_eq!(afters.len(), 2_000);
    }

    #[test]
    fn test_corrupt_balance_breaks_invariant_only() {
        let store = MemoryLedgerStore::new();
        let id = acct(4);
        store.append(id, 100, EntrySource::Reward, None, 1).unwrap();

        assert!(store.corrupt_balance(&id, 5_000));
        assert_eq!(store.account(&id).unwrap().balance, 5_000);
        // Entry log untouched
        assert_eq!(store.entries_for(&id).len(), 1);
    }
}
