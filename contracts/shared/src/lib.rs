//! Move and commitment primitives shared by the Rock-Paper-Scissors contracts.
//!
//! A player hides a move behind a commitment before the opponent's move is
//! known, then opens it during the reveal phase:
//!
//!   `commitment = sha256(label || nonce)`
//!
//! `label` is the ASCII move name (`Rock`, `Paper`, `Scissors`) and `nonce` is
//! any byte string chosen by the player. Clients can build the same preimage
//! off-chain, e.g. `sha256("Rock" + "1")`.
//!
//! Also holds the leaderboard row type, which the game reads back through its
//! leaderboard client.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{contracttype, Address, Bytes, BytesN, Env};

pub const MAX_LEADERBOARD_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One hand in a round. Encoded on the wire as its label symbol, so an
/// unknown label is rejected by the host before any contract code runs.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

/// Result of a single round, seen from the first argument of `resolve_round`.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RoundOutcome {
    AWins,
    BWins,
    Tie,
}

/// A player's row on the leaderboard.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerStats {
    pub player: Address,
    pub wins: u32,
    pub games_played: u32,
    /// Net tokens won across all matches: stakes taken minus stakes lost.
    pub winnings: i128,
    /// Sequence number assigned when the player was first recorded; breaks
    /// ties between equal win counts.
    pub first_recorded: u64,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// ASCII label hashed into the commitment preimage.
    pub fn label(&self) -> &'static str {
        match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
        }
    }

    /// Rock beats Scissors, Scissors beats Paper, Paper beats Rock.
    pub fn beats(&self, other: &Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

// ---------------------------------------------------------------------------
// Commitment scheme
// ---------------------------------------------------------------------------

/// `label || nonce`, the bytes fed to sha256.
pub fn commitment_preimage(env: &Env, game_move: &Move, nonce: &Bytes) -> Bytes {
    let mut preimage = Bytes::from_slice(env, game_move.label().as_bytes());
    preimage.append(nonce);
    preimage
}

/// Hash a move and nonce into a commitment.
pub fn commit(env: &Env, game_move: &Move, nonce: &Bytes) -> BytesN<32> {
    env.crypto()
        .sha256(&commitment_preimage(env, game_move, nonce))
        .into()
}

/// True when `game_move` and `nonce` open `commitment`.
pub fn verify(env: &Env, commitment: &BytesN<32>, game_move: &Move, nonce: &Bytes) -> bool {
    commit(env, game_move, nonce) == *commitment
}

// ---------------------------------------------------------------------------
// Round resolution
// ---------------------------------------------------------------------------

pub fn resolve_round(move_a: &Move, move_b: &Move) -> RoundOutcome {
    if move_a == move_b {
        RoundOutcome::Tie
    } else if move_a.beats(move_b) {
        RoundOutcome::AWins
    } else {
        RoundOutcome::BWins
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
