//! # Commit-Reveal RNG Oracle
//!
//! Provably fair randomness for wagering rounds. The protocol binds the
//! server before play and exposes everything needed for replay after:
//!
//! 1. **Commit**: the server draws a secret seed and publishes only
//!    `blake3(server_seed)` before any outcome-affecting input.
//! 2. **Play**: the caller supplies a client seed; the oracle assigns
//!    an incrementing nonce per round.
//! 3. **Reveal**: after settlement the raw server seed is published.
//! 4. **Verify**: anyone recomputes the commitment hash and the roll
//!    from (server_seed, client_seed, nonce).
//!
//! ## Roll Derivation
//!
//! `roll = blake3(server_seed || client_seed || nonce_le)` taken as the
//! top 53 bits of the first 8 digest bytes, divided by 2^53. The result
//! is uniform in `[0, 1)` and exactly representable as an `f64`, so a
//! third-party replay reproduces it bit for bit.

use diamond_core::{EconomyError, Result};
use parking_lot::{Mutex, RwLock};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Divisor mapping a 53-bit integer into [0, 1)
const ROLL_DIVISOR: f64 = (1u64 << 53) as f64;

/// Full lifecycle record of one wagering round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RngCommitment {
    /// Oracle-assigned round identifier
    pub round_id: u64,

    /// blake3 of the server seed, published at commit time
    pub seed_hash: [u8; 32],

    /// Raw server seed, present only after reveal
    pub server_seed: Option<[u8; 32]>,

    /// Caller-supplied entropy contribution
    pub client_seed: String,

    /// Incrementing per-round counter mixed into the roll
    pub nonce: u64,

    /// Derived outcome in [0, 1), present only after reveal
    pub roll_value: Option<f64>,

    /// When the commitment was recorded (UTC seconds)
    pub committed_at: i64,

    /// When the seed was published (UTC seconds)
    pub revealed_at: Option<i64>,
}

impl RngCommitment {
    /// Hex encoding of the published commitment hash
    pub fn seed_hash_hex(&self) -> String {
        hex::encode(self.seed_hash)
    }
}

/// A settled round with everything needed for third-party replay
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevealedRound {
    /// Round identifier
    pub round_id: u64,

    /// Published server seed
    pub server_seed: [u8; 32],

    /// Commitment hash published before play
    pub seed_hash: [u8; 32],

    /// Caller-supplied entropy contribution
    pub client_seed: String,

    /// Per-round counter
    pub nonce: u64,

    /// Outcome in [0, 1)
    pub roll_value: f64,

    /// Whether the revealed seed matches the commitment
    pub verifiable: bool,
}

/// Pure roll function over the three protocol inputs.
///
/// Identical inputs always produce an identical roll.
pub fn derive_roll(server_seed: &[u8; 32], client_seed: &str, nonce: u64) -> f64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(server_seed);
    hasher.update(client_seed.as_bytes());
    hasher.update(&nonce.to_le_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    let bits = u64::from_le_bytes(prefix) >> 11;
    bits as f64 / ROLL_DIVISOR
}

/// Replay check for an already-settled round
pub fn verify_round(
    server_seed: &[u8; 32],
    seed_hash: &[u8; 32],
    client_seed: &str,
    nonce: u64,
    claimed_roll: f64,
) -> bool {
    let hash_ok = blake3::hash(server_seed).as_bytes() == seed_hash;
    hash_ok && derive_roll(server_seed, client_seed, nonce) == claimed_roll
}

/// In-process oracle holding round state across commit and reveal
pub struct RngOracle {
    rounds: RwLock<HashMap<u64, RngCommitment>>,
    seeds: RwLock<HashMap<u64, [u8; 32]>>,
    next_round: AtomicU64,
    rng: Mutex<ChaCha20Rng>,
}

impl Default for RngOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl RngOracle {
    /// Create an oracle seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rounds: RwLock::new(HashMap::new()),
            seeds: RwLock::new(HashMap::new()),
            next_round: AtomicU64::new(1),
            rng: Mutex::new(ChaCha20Rng::from_entropy()),
        }
    }

    /// Open a round: draw the secret seed and record its hash.
    ///
    /// The commitment is stored before this returns, so no wager can be
    /// accepted against a round whose hash the server has not yet
    /// bound itself to.
    pub fn commit(&self, client_seed: &str) -> RngCommitment {
        let mut server_seed = [0u8; 32];
        self.rng.lock().fill_bytes(&mut server_seed);

        let round_id = self.next_round.fetch_add(1, Ordering::SeqCst);
        let commitment = RngCommitment {
            round_id,
            seed_hash: *blake3::hash(&server_seed).as_bytes(),
            server_seed: None,
            client_seed: client_seed.to_string(),
            nonce: round_id,
            roll_value: None,
            committed_at: chrono::Utc::now().timestamp(),
            revealed_at: None,
        };

        self.seeds.write().insert(round_id, server_seed);
        self.rounds.write().insert(round_id, commitment.clone());
        commitment
    }

    /// Look up a round in its current lifecycle state
    pub fn round(&self, round_id: u64) -> Result<RngCommitment> {
        self.rounds
            .read()
            .get(&round_id)
            .cloned()
            .ok_or(EconomyError::RoundNotFound(round_id))
    }

    /// Derive the roll for a committed round without publishing the seed.
    ///
    /// Settlement uses this; the seed stays secret until `reveal`.
    pub fn roll_for(&self, round_id: u64) -> Result<f64> {
        let commitment = self.round(round_id)?;
        let seeds = self.seeds.read();
        let seed = seeds
            .get(&round_id)
            .ok_or(EconomyError::RoundNotFound(round_id))?;
        Ok(derive_roll(seed, &commitment.client_seed, commitment.nonce))
    }

    /// Publish the server seed and seal the round.
    ///
    /// A round reveals exactly once; the sealed record is immutable.
    pub fn reveal(&self, round_id: u64) -> Result<RevealedRound> {
        let mut rounds = self.rounds.write();
        let commitment = rounds
            .get_mut(&round_id)
            .ok_or(EconomyError::RoundNotFound(round_id))?;
        if commitment.revealed_at.is_some() {
            return Err(EconomyError::RoundAlreadyRevealed(round_id));
        }

        let seeds = self.seeds.read();
        let server_seed = *seeds
            .get(&round_id)
            .ok_or(EconomyError::RoundNotFound(round_id))?;

        let roll_value = derive_roll(&server_seed, &commitment.client_seed, commitment.nonce);
        commitment.server_seed = Some(server_seed);
        commitment.roll_value = Some(roll_value);
        commitment.revealed_at = Some(chrono::Utc::now().timestamp());

        Ok(RevealedRound {
            round_id,
            server_seed,
            seed_hash: commitment.seed_hash,
            client_seed: commitment.client_seed.clone(),
            nonce: commitment.nonce,
            roll_value,
            verifiable: blake3::hash(&server_seed).as_bytes() == &commitment.seed_hash,
        })
    }

    /// The sealed record of an already-revealed round.
    ///
    /// `RoundNotRevealed` while the seed is still secret; after a
    /// reveal this returns the same record `reveal` produced.
    pub fn revealed(&self, round_id: u64) -> Result<RevealedRound> {
        let commitment = self.round(round_id)?;
        match (commitment.server_seed, commitment.roll_value) {
            (Some(server_seed), Some(roll_value)) => Ok(RevealedRound {
                round_id,
                server_seed,
                seed_hash: commitment.seed_hash,
                client_seed: commitment.client_seed,
                nonce: commitment.nonce,
                roll_value,
                verifiable: blake3::hash(&server_seed).as_bytes() == &commitment.seed_hash,
            }),
            _ => Err(EconomyError::RoundNotRevealed(round_id)),
        }
    }

    /// Replay-verify a revealed round from its stored record.
    ///
    /// Fails loudly: a mismatch is an error, never a silent pass.
    pub fn verify(&self, round_id: u64) -> Result<()> {
        let commitment = self.round(round_id)?;
        let (server_seed, roll_value) = match (commitment.server_seed, commitment.roll_value) {
            (Some(seed), Some(roll)) => (seed, roll),
            _ => return Err(EconomyError::RoundNotRevealed(round_id)),
        };

        if verify_round(
            &server_seed,
            &commitment.seed_hash,
            &commitment.client_seed,
            commitment.nonce,
            roll_value,
        ) {
            Ok(())
        } else {
            Err(EconomyError::RngVerificationFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roll_is_deterministic() {
        let seed = [7u8; 32];
        let a = derive_roll(&seed, "client-entropy", 42);
        let b = derive_roll(&seed, "client-entropy", 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_roll_varies_with_each_input() {
        let seed = [7u8; 32];
        let base = derive_roll(&seed, "client", 1);
        assert_ne!(base, derive_roll(&[8u8; 32], "client", 1));
        assert_ne!(base, derive_roll(&seed, "other", 1));
        assert_ne!(base, derive_roll(&seed, "client", 2));
    }

    #[test]
    fn test_commit_publishes_hash_not_seed() {
        let oracle = RngOracle::new();
        let commitment = oracle.commit("player-seed");
        assert!(commitment.server_seed.is_none());
        assert!(commitment.roll_value.is_none());
        assert_eq!(commitment.seed_hash_hex().len(), 64);
    }

    #[test]
    fn test_reveal_matches_commitment() {
        let oracle = RngOracle::new();
        let commitment = oracle.commit("player-seed");
        let revealed = oracle.reveal(commitment.round_id).unwrap();

        assert!(revealed.verifiable);
        assert_eq!(revealed.seed_hash, commitment.seed_hash);
        assert_eq!(
            blake3::hash(&revealed.server_seed).as_bytes(),
            &commitment.seed_hash
        );
        oracle.verify(commitment.round_id).unwrap();
    }

    #[test]
    fn test_settlement_roll_equals_revealed_roll() {
        let oracle = RngOracle::new();
        let commitment = oracle.commit("player-seed");
        let settled = oracle.roll_for(commitment.round_id).unwrap();
        let revealed = oracle.reveal(commitment.round_id).unwrap();
        assert_eq!(settled, revealed.roll_value);
    }

    #[test]
    fn test_third_party_replay() {
        let oracle = RngOracle::new();
        let commitment = oracle.commit("player-seed");
        let revealed = oracle.reveal(commitment.round_id).unwrap();

        // A verifier recomputes everything from published values only
        assert!(verify_round(
            &revealed.server_seed,
            &revealed.seed_hash,
            &revealed.client_seed,
            revealed.nonce,
            revealed.roll_value,
        ));

        // A tampered roll fails replay
        assert!(!verify_round(
            &revealed.server_seed,
            &revealed.seed_hash,
            &revealed.client_seed,
            revealed.nonce,
            (revealed.roll_value + 0.1) % 1.0,
        ));
    }

    #[test]
    fn test_revealed_record_matches_reveal() {
        let oracle = RngOracle::new();
        let commitment = oracle.commit("player-seed");

        assert!(matches!(
            oracle.revealed(commitment.round_id).unwrap_err(),
            EconomyError::RoundNotRevealed(_)
        ));

        let sealed = oracle.reveal(commitment.round_id).unwrap();
        assert_eq!(oracle.revealed(commitment.round_id).unwrap(), sealed);
    }

    #[test]
    fn test_double_reveal_rejected() {
        let oracle = RngOracle::new();
        let commitment = oracle.commit("player-seed");
        oracle.reveal(commitment.round_id).unwrap();

        let err = oracle.reveal(commitment.round_id).unwrap_err();
        assert!(matches!(err, EconomyError::RoundAlreadyRevealed(_)));
    }

    #[test]
    fn test_unknown_round() {
        let oracle = RngOracle::new();
        assert!(matches!(
            oracle.reveal(999).unwrap_err(),
            EconomyError::RoundNotFound(999)
        ));
    }

    #[test]
    fn test_verify_before_reveal_rejected() {
        let oracle = RngOracle::new();
        let commitment = oracle.commit("player-seed");
        assert!(matches!(
            oracle.verify(commitment.round_id).unwrap_err(),
            EconomyError::RoundNotRevealed(_)
        ));
    }

    proptest! {
        #[test]
        fn prop_roll_in_unit_interval(seed in any::<[u8; 32]>(), client in ".*", nonce in any::<u64>()) {
            let roll = derive_roll(&seed, &client, nonce);
            prop_assert!((0.0..1.0).contains(&roll));
        }
    }
}
