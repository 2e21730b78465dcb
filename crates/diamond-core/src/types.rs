//! Core type definitions for the diamond economy
//!
//! Balances are non-negative integer counts of the smallest currency unit.
//! Accounts are never written directly; every balance change flows through
//! an append-only `LedgerEntry`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-negative amount of currency in the smallest unit
pub type Amount = u64;

/// Signed balance change in the smallest unit
pub type Delta = i64;

/// Monotonic ledger entry id (ledger-wide ordering)
pub type EntryId = u64;

/// AccountId - Unique identifier for a balance holder
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccountId {
    /// 256-bit identifier, typically a BLAKE3 hash of an external user id
    id: [u8; 32],
}

impl AccountId {
    /// Create an AccountId from raw bytes
    pub fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    /// Derive an AccountId from an external user identifier
    pub fn from_external(external_id: &str) -> Self {
        Self {
            id: *blake3::hash(external_id.as_bytes()).as_bytes(),
        }
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// A balance holder
///
/// The balance is mutated only by applying ledger entries through the
/// ledger engine; it is never written directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identity
    pub id: AccountId,

    /// Current balance in the smallest unit
    pub balance: Amount,

    /// Creation timestamp (UTC seconds)
    pub created_at: i64,
}

impl Account {
    /// Create a new empty account
    pub fn new(id: AccountId, created_at: i64) -> Self {
        Self {
            id,
            balance: 0,
            created_at,
        }
    }
}

/// Tagged category of a ledger entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrySource {
    /// Training or activity reward issuance
    Reward,
    /// Arena stake placed
    Stake,
    /// Arcade wager settlement
    Wager,
    /// Marketplace sale
    Sale,
    /// Tip between accounts
    Tip,
    /// Badge or item purchase
    Purchase,
    /// Value permanently destroyed by the burn law
    Burn,
    /// Denomination exchange
    Swap,
    /// Administrative grant
    AdminGrant,
    /// Refund of a prior transaction
    Refund,
    /// Balance migration from a legacy system
    Migration,
    /// Compensating correction entry (never a deletion)
    Compensation,
}

impl EntrySource {
    /// Sources exempt from the burn law
    pub fn is_tax_exempt(&self) -> bool {
        matches!(self, Self::AdminGrant | Self::Refund | Self::Migration)
    }

    /// Get source name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reward => "Reward",
            Self::Stake => "Stake",
            Self::Wager => "Wager",
            Self::Sale => "Sale",
            Self::Tip => "Tip",
            Self::Purchase => "Purchase",
            Self::Burn => "Burn",
            Self::Swap => "Swap",
            Self::AdminGrant => "Admin Grant",
            Self::Refund => "Refund",
            Self::Migration => "Migration",
            Self::Compensation => "Compensation",
        }
    }
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One immutable balance-changing record
///
/// For any account, `balance_after` of the most recent entry equals the
/// stored balance, and across the ordered entry sequence
/// `balance_after[n] == balance_after[n-1] + delta[n]` with an implicit
/// starting balance of zero. Entries are append-only: no update, no
/// delete, ever.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Monotonic ledger-wide entry id
    pub id: EntryId,

    /// Account whose balance this entry changes
    pub account_id: AccountId,

    /// Signed balance change
    pub delta: Delta,

    /// Balance snapshot immediately after applying this entry
    pub balance_after: Amount,

    /// Originating category
    pub source: EntrySource,

    /// Optional link to the originating domain event
    pub reference_id: Option<[u8; 32]>,

    /// Creation timestamp (UTC seconds)
    pub created_at: i64,
}

impl LedgerEntry {
    /// Reference tag for a compensating entry that undoes this one.
    ///
    /// Entries are never deleted; a correction is a new entry carrying
    /// this tag so the pair stays linkable.
    pub fn reversal_reference(&self) -> [u8; 32] {
        let mut reference = [0u8; 32];
        reference[..8].copy_from_slice(&self.id.to_le_bytes());
        reference
    }
}

/// Per-account consecutive-activity streak
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    /// Current run of consecutive qualifying days
    pub consecutive_days: u32,

    /// Longest run ever recorded for this account
    pub longest_streak: u32,

    /// Timestamp of the most recent qualifying activity (UTC seconds)
    pub last_activity_at: i64,
}

impl StreakState {
    /// Record a qualifying activity day.
    ///
    /// Consecutive calendar days extend the run; a same-day repeat is a
    /// no-op; any gap resets the run to one.
    pub fn record_activity(&mut self, now: i64) {
        const DAY_SECS: i64 = 24 * 3600;

        let prev_day = self.last_activity_at.div_euclid(DAY_SECS);
        let this_day = now.div_euclid(DAY_SECS);

        if self.consecutive_days == 0 {
            self.consecutive_days = 1;
        } else if this_day == prev_day {
            // Same day, streak unchanged
        } else if this_day == prev_day + 1 {
            self.consecutive_days += 1;
        } else {
            self.consecutive_days = 1;
        }

        self.last_activity_at = now;
        self.longest_streak = self.longest_streak.max(self.consecutive_days);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 24 * 3600;

    #[test]
    fn test_account_id_from_external() {
        let a = AccountId::from_external("player-1234");
        let b = AccountId::from_external("player-1234");
        let c = AccountId::from_external("player-5678");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn test_exempt_sources() {
        assert!(EntrySource::AdminGrant.is_tax_exempt());
        assert!(EntrySource::Refund.is_tax_exempt());
        assert!(EntrySource::Migration.is_tax_exempt());
        assert!(!EntrySource::Sale.is_tax_exempt());
        assert!(!EntrySource::Wager.is_tax_exempt());
    }

    #[test]
    fn test_streak_consecutive_days() {
        let mut streak = StreakState::default();

        streak.record_activity(DAY * 100);
        assert_eq!(streak.consecutive_days, 1);

        streak.record_activity(DAY * 101);
        streak.record_activity(DAY * 102);
        assert_eq!(streak.consecutive_days, 3);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn test_streak_same_day_is_noop() {
        let mut streak = StreakState::default();

        streak.record_activity(DAY * 100);
        streak.record_activity(DAY * 100 + 3600);
        assert_eq!(streak.consecutive_days, 1);
    }

    #[test]
    fn test_streak_gap_resets() {
        let mut streak = StreakState::default();

        streak.record_activity(DAY * 100);
        streak.record_activity(DAY * 101);
        streak.record_activity(DAY * 105);

        assert_eq!(streak.consecutive_days, 1);
        assert_eq!(streak.longest_streak, 2);
    }
}
