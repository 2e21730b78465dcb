//! # Diamond Fairness
//!
//! Provably fair randomness for wagering flows. The oracle commits to a
//! blake3 seed hash before play, reveals the raw seed after settlement,
//! and derives every roll as a pure function of (server seed, client
//! seed, nonce) so any third party can replay the outcome.

pub mod oracle;

pub use oracle::{derive_roll, verify_round, RevealedRound, RngCommitment, RngOracle};
