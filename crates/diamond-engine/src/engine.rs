//! # Economy Engine
//!
//! Single facade wiring the policy components, the ledger, and the RNG
//! oracle into the caller-facing operations:
//!
//! | Operation | Pipeline |
//! |-----------|----------|
//! | `apply_reward` | mastery gate, streak multiplier, ledger credit |
//! | `apply_taxed_transaction` | burn split, self-check, two ledger debits |
//! | `apply_stake` / `settle_wager` | committed round, debit, reveal, payout |
//! | `swap_to_shards` / `swap_from_shards` | fixed-rate quote, ledger write |
//! | `run_reconciliation` | whole-ledger audit cycle |
//!
//! Preview variants run the exact enforcement code with the ledger
//! write skipped, so a displayed estimate can never drift from what
//! enforcement later records.

use crate::config::EconomyConfig;
use diamond_core::{
    AccountId, Amount, EconomyError, EntrySource, LedgerEntry, Multiplier, Result, StreakState,
};
use diamond_economics::{
    BurnLawEnforcer, BurnRecord, MasteryGate, StreakMultiplierResolver, SwapCalculator, SwapQuote,
};
use diamond_fairness::{RevealedRound, RngCommitment, RngOracle};
use diamond_ledger::{
    FreezeController, FreezeState, LedgerEngine, MemoryLedgerStore, ReconciliationAuditor,
    ReconciliationSnapshot,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Reward arithmetic shared by preview and enforcement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    /// Caller-supplied base amount
    pub base_amount: Amount,

    /// Extra units earned above the mastery threshold
    pub mastery_bonus: Amount,

    /// Streak tier the account qualified for
    pub tier: String,

    /// Streak multiplier applied
    pub multiplier: Multiplier,

    /// Extra units contributed by the streak multiplier
    pub streak_bonus: Amount,

    /// Total credited amount
    pub final_amount: Amount,
}

/// A credited reward with its ledger entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardReceipt {
    /// How the credited amount was computed
    pub breakdown: RewardBreakdown,

    /// The committed ledger entry
    pub entry: LedgerEntry,
}

/// A taxed spend with its burn split and ledger entries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxedReceipt {
    /// The enforced burn split
    pub record: BurnRecord,

    /// Debit for the net amount, tagged with the domain source
    pub net_entry: LedgerEntry,

    /// Debit for the burned amount, absent when nothing burned
    pub burn_entry: Option<LedgerEntry>,
}

/// A denomination swap with its ledger entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwapReceipt {
    /// The fixed-rate quote that was applied
    pub quote: SwapQuote,

    /// The diamond-side ledger entry
    pub entry: LedgerEntry,
}

/// Outcome of settling a wagering round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WagerSettlement {
    /// The revealed round, replayable by any third party
    pub round: RevealedRound,

    /// Whether the roll fell inside the win window
    pub won: bool,

    /// Payout credit, present only on a win
    pub payout_entry: Option<LedgerEntry>,
}

/// A winning payout owed for a revealed round whose credit failed
#[derive(Clone, Copy, Debug)]
struct PendingPayout {
    account_id: AccountId,
    amount: Amount,
}

/// Top-level economy engine
pub struct EconomyEngine {
    store: Arc<MemoryLedgerStore>,
    ledger: LedgerEngine,
    auditor: Arc<ReconciliationAuditor>,
    oracle: RngOracle,
    burn: BurnLawEnforcer,
    mastery: MasteryGate,
    streaks: StreakMultiplierResolver,
    swap: SwapCalculator,
    activity: RwLock<HashMap<AccountId, StreakState>>,
    pending_payouts: RwLock<HashMap<u64, PendingPayout>>,
    config: EconomyConfig,
}

impl EconomyEngine {
    /// Build an engine from validated configuration
    pub fn new(config: EconomyConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(MemoryLedgerStore::new());
        let freeze = Arc::new(FreezeController::new());
        let ledger = LedgerEngine::new(store.clone(), freeze.clone());
        let auditor = Arc::new(ReconciliationAuditor::new(
            store.clone(),
            freeze,
            config.audit_policy(),
        ));

        Ok(Self {
            store,
            ledger,
            auditor,
            oracle: RngOracle::new(),
            burn: BurnLawEnforcer::new(config.burn_policy()?),
            mastery: config.mastery_gate()?,
            streaks: StreakMultiplierResolver::new(config.streak_table()?),
            swap: config.swap_calculator()?,
            activity: RwLock::new(HashMap::new()),
            pending_payouts: RwLock::new(HashMap::new()),
            config,
        })
    }

    /// Engine with the default economy
    pub fn with_defaults() -> Result<Self> {
        Self::new(EconomyConfig::default())
    }

    /// The underlying ledger surface
    pub fn ledger(&self) -> &LedgerEngine {
        &self.ledger
    }

    /// The backing in-process store
    pub fn store(&self) -> &Arc<MemoryLedgerStore> {
        &self.store
    }

    /// Open an account idempotently
    pub fn open_account(&self, account_id: AccountId) {
        self.ledger.open_account(account_id);
    }

    /// Current stored balance
    pub fn balance(&self, account_id: &AccountId) -> Result<Amount> {
        self.ledger.balance(account_id)
    }

    /// Full entry history for an account, oldest first
    pub fn entries(&self, account_id: &AccountId) -> Vec<LedgerEntry> {
        self.ledger.entries(account_id)
    }

    // ---- rewards ----

    /// Gate, scale, and credit a reward.
    ///
    /// `accuracy` of `None` skips the mastery gate for reward flows
    /// that carry no accuracy signal.
    pub fn apply_reward(
        &self,
        account_id: AccountId,
        base_amount: Amount,
        accuracy: Option<f64>,
        consecutive_days: i64,
        source: EntrySource,
    ) -> Result<RewardReceipt> {
        let breakdown = self.compute_reward(base_amount, accuracy, consecutive_days)?;
        let delta = to_delta(breakdown.final_amount)?;
        let entry = self.ledger.append(account_id, delta, source, None)?;

        info!(
            account = %account_id,
            base = base_amount,
            credited = breakdown.final_amount,
            tier = %breakdown.tier,
            "reward applied"
        );
        Ok(RewardReceipt { breakdown, entry })
    }

    /// Compute a reward without writing the ledger.
    ///
    /// Identical arithmetic to `apply_reward`; any estimate shown to a
    /// caller matches what enforcement will credit.
    pub fn preview_reward(
        &self,
        base_amount: Amount,
        accuracy: Option<f64>,
        consecutive_days: i64,
    ) -> Result<RewardBreakdown> {
        self.compute_reward(base_amount, accuracy, consecutive_days)
    }

    fn compute_reward(
        &self,
        base_amount: Amount,
        accuracy: Option<f64>,
        consecutive_days: i64,
    ) -> Result<RewardBreakdown> {
        let mastery_bonus = match accuracy {
            Some(accuracy) => {
                self.mastery.ensure(accuracy)?;
                self.mastery.bonus(base_amount, accuracy)
            }
            None => 0,
        };

        let gated = base_amount
            .checked_add(mastery_bonus)
            .ok_or_else(|| EconomyError::InvalidInput("reward amount overflow".to_string()))?;
        let resolution = self.streaks.resolve(consecutive_days);
        let final_amount = resolution.multiplier.apply(gated);

        Ok(RewardBreakdown {
            base_amount,
            mastery_bonus,
            tier: resolution.tier,
            multiplier: resolution.multiplier,
            streak_bonus: final_amount - gated,
            final_amount,
        })
    }

    // ---- taxed spends ----

    /// Split a taxed spend per the burn law and debit the payer.
    ///
    /// The net and burned parts are recorded as two debits, the burn
    /// tagged `EntrySource::Burn` so destroyed supply stays queryable.
    /// A split that fails self-validation freezes the ledger before
    /// any write.
    pub fn apply_taxed_transaction(
        &self,
        payer_id: AccountId,
        amount: Amount,
        source: EntrySource,
    ) -> Result<TaxedReceipt> {
        let record = self.burn.enforce(amount, source);
        if !self
            .burn
            .validate(amount, record.burn_amount, record.net_amount, source)
        {
            warn!(amount, source = %source, "burn split failed self-validation");
            self.ledger.freeze().freeze(
                "burn law self-validation failed",
                None,
                chrono::Utc::now().timestamp(),
            );
            return Err(EconomyError::IntegrityViolation {
                expected: amount,
                actual: record.burn_amount + record.net_amount,
                variance: amount.abs_diff(record.burn_amount + record.net_amount),
            });
        }

        // Upfront balance check so the second debit cannot strand a
        // half-applied spend in the common case.
        let balance = self.ledger.balance(&payer_id)?;
        if balance < amount {
            return Err(EconomyError::InsufficientFunds {
                balance,
                required: amount,
                shortfall: amount - balance,
            });
        }

        let net_entry =
            self.ledger
                .append(payer_id, -to_delta(record.net_amount)?, source, None)?;

        let burn_entry = if record.burn_amount > 0 {
            match self
                .ledger
                .append(payer_id, -to_delta(record.burn_amount)?, EntrySource::Burn, None)
            {
                Ok(entry) => Some(entry),
                Err(err) => {
                    // Entries are never deleted; undo the net debit
                    // with a compensating credit. The correction path
                    // skips the freeze flag, so a freeze landing
                    // between the two debits cannot strand the spend
                    // half-applied.
                    self.ledger.append_correction(
                        payer_id,
                        to_delta(record.net_amount)?,
                        Some(net_entry.reversal_reference()),
                    )?;
                    return Err(err);
                }
            }
        } else {
            None
        };

        Ok(TaxedReceipt {
            record,
            net_entry,
            burn_entry,
        })
    }

    /// Burn split for a prospective spend, no ledger write
    pub fn preview_taxed_transaction(&self, amount: Amount, source: EntrySource) -> BurnRecord {
        self.burn.enforce(amount, source)
    }

    // ---- wagering ----

    /// Open a provably fair round: commitment hash published first
    pub fn commit_rng_round(&self, client_seed: &str) -> RngCommitment {
        self.oracle.commit(client_seed)
    }

    /// Publish the server seed for a settled round
    pub fn reveal_rng_round(&self, round_id: u64) -> Result<RevealedRound> {
        self.oracle.reveal(round_id)
    }

    /// Replay-verify a revealed round from its stored record
    pub fn verify_rng_round(&self, round_id: u64) -> Result<()> {
        self.oracle.verify(round_id)
    }

    /// Debit a stake against a committed, unrevealed round
    pub fn apply_stake(
        &self,
        account_id: AccountId,
        stake: Amount,
        round_id: u64,
    ) -> Result<LedgerEntry> {
        let round = self.oracle.round(round_id)?;
        if round.revealed_at.is_some() {
            // Betting after the seed is public defeats the protocol.
            return Err(EconomyError::RoundAlreadyRevealed(round_id));
        }
        self.ledger.append(
            account_id,
            -to_delta(stake)?,
            EntrySource::Stake,
            Some(round_reference(round_id)),
        )
    }

    /// Reveal a round and credit the payout when the roll wins.
    ///
    /// `win_chance` is the width of the win window in `[0, 1]`; the
    /// round wins when `roll < win_chance`. A reveal consumes the
    /// round, so the freeze flag and the payout delta are checked
    /// before it; if the payout credit still fails after the reveal,
    /// the owed amount is retained and the next call for the round
    /// credits it.
    pub fn settle_wager(
        &self,
        account_id: AccountId,
        round_id: u64,
        win_chance: f64,
        payout: Amount,
    ) -> Result<WagerSettlement> {
        if !(0.0..=1.0).contains(&win_chance) {
            return Err(EconomyError::InvalidInput(format!(
                "win chance {win_chance} outside [0, 1]"
            )));
        }
        let payout_delta = to_delta(payout)?;
        self.ledger.freeze().ensure_unfrozen()?;

        let owed = self.pending_payouts.read().get(&round_id).copied();
        if let Some(owed) = owed {
            let round = self.oracle.revealed(round_id)?;
            let entry = self.ledger.append(
                owed.account_id,
                to_delta(owed.amount)?,
                EntrySource::Wager,
                Some(round_reference(round_id)),
            )?;
            self.pending_payouts.write().remove(&round_id);

            info!(
                account = %owed.account_id,
                round = round_id,
                payout = owed.amount,
                "deferred wager payout credited"
            );
            return Ok(WagerSettlement {
                round,
                won: true,
                payout_entry: Some(entry),
            });
        }

        let round = self.oracle.reveal(round_id)?;
        let won = round.roll_value < win_chance;
        let payout_entry = if won {
            match self.ledger.append(
                account_id,
                payout_delta,
                EntrySource::Wager,
                Some(round_reference(round_id)),
            ) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    // The reveal cannot be undone; keep the owed
                    // payout so a later call can credit it.
                    self.pending_payouts
                        .write()
                        .insert(round_id, PendingPayout { account_id, amount: payout });
                    warn!(
                        account = %account_id,
                        round = round_id,
                        payout,
                        "payout credit failed, settlement deferred"
                    );
                    return Err(err);
                }
            }
        } else {
            None
        };

        info!(
            account = %account_id,
            round = round_id,
            roll = round.roll_value,
            won,
            "wager settled"
        );
        Ok(WagerSettlement {
            round,
            won,
            payout_entry,
        })
    }

    // ---- streak activity ----

    /// Record qualifying activity and return the updated streak
    pub fn record_activity(&self, account_id: AccountId) -> StreakState {
        let now = chrono::Utc::now().timestamp();
        let mut activity = self.activity.write();
        let state = activity.entry(account_id).or_default();
        state.record_activity(now);
        state.clone()
    }

    /// Current streak for an account, zeroed if never active
    pub fn streak_state(&self, account_id: &AccountId) -> StreakState {
        self.activity
            .read()
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Tier and multiplier an account currently qualifies for
    pub fn current_multiplier(&self, account_id: &AccountId) -> Multiplier {
        let state = self.streak_state(account_id);
        self.streaks.resolve(state.consecutive_days as i64).multiplier
    }

    // ---- denomination swaps ----

    /// Convert diamonds into shards, debiting the diamond side
    pub fn swap_to_shards(&self, account_id: AccountId, diamonds: Amount) -> Result<SwapReceipt> {
        let quote = self.swap.diamonds_to_shards(diamonds)?;
        let entry = self
            .ledger
            .append(account_id, -to_delta(diamonds)?, EntrySource::Swap, None)?;
        Ok(SwapReceipt { quote, entry })
    }

    /// Convert shards into diamonds, crediting the diamond side
    pub fn swap_from_shards(&self, account_id: AccountId, shards: Amount) -> Result<SwapReceipt> {
        let quote = self.swap.shards_to_diamonds(shards)?;
        let entry = self.ledger.append(
            account_id,
            to_delta(quote.converted)?,
            EntrySource::Swap,
            None,
        )?;
        Ok(SwapReceipt { quote, entry })
    }

    /// Quote a swap in either direction without writing the ledger
    pub fn preview_swap_to_shards(&self, diamonds: Amount) -> Result<SwapQuote> {
        self.swap.diamonds_to_shards(diamonds)
    }

    /// Quote the reverse swap without writing the ledger
    pub fn preview_swap_from_shards(&self, shards: Amount) -> Result<SwapQuote> {
        self.swap.shards_to_diamonds(shards)
    }

    // ---- audit and freeze ----

    /// Run one reconciliation cycle now
    pub fn run_reconciliation(&self) -> ReconciliationSnapshot {
        self.auditor.run_once()
    }

    /// Reconciliation snapshots, oldest first
    pub fn reconciliation_history(&self) -> Vec<ReconciliationSnapshot> {
        self.auditor.history()
    }

    /// Spawn the background reconciliation loop at the configured interval
    pub fn spawn_auditor(&self) -> tokio::task::JoinHandle<()> {
        self.auditor.clone().spawn(self.config.audit_interval())
    }

    /// Current freeze lifecycle snapshot
    pub fn freeze_state(&self) -> FreezeState {
        self.ledger.freeze().state()
    }

    /// Operator action: unfreeze with an audit note
    pub fn resolve_freeze(&self, note: &str) -> Result<FreezeState> {
        self.ledger
            .freeze()
            .resolve(note, chrono::Utc::now().timestamp())
    }

    /// Re-prove the balance invariant for one account
    pub fn verify_account(&self, account_id: &AccountId) -> Result<()> {
        self.ledger.verify_account(account_id)
    }
}

/// Reference tag linking ledger entries to an oracle round
fn round_reference(round_id: u64) -> [u8; 32] {
    let mut reference = [0u8; 32];
    reference[..8].copy_from_slice(&round_id.to_le_bytes());
    reference
}

fn to_delta(amount: Amount) -> Result<i64> {
    i64::try_from(amount)
        .map_err(|_| EconomyError::InvalidInput(format!("amount {amount} exceeds ledger range")))
}
