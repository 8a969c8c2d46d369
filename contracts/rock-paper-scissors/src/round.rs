//! Commit/reveal transitions on a `MatchRecord`.
//!
//! Nothing here touches storage or tokens. Callers persist the record (or
//! conclude the match) based on what a transition returns.

use soroban_sdk::{Address, Bytes, BytesN, Env};

use rps_shared::{resolve_round, verify, Move, RoundOutcome};

use crate::{Error, MatchPhase, MatchRecord, RevealedMove};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Seat {
    Player1,
    Player2,
}

impl Seat {
    pub(crate) fn other(self) -> Seat {
        match self {
            Seat::Player1 => Seat::Player2,
            Seat::Player2 => Seat::Player1,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Resolution {
    pub player1_move: Move,
    pub player2_move: Move,
    pub outcome: RoundOutcome,
    /// Set when this round brought a player to `hands_to_win`.
    pub match_winner: Option<Seat>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum RevealStep {
    AwaitingOpponent,
    Resolved(Resolution),
}

pub(crate) fn seat_of(record: &MatchRecord, player: &Address) -> Result<Seat, Error> {
    if &record.player1 == player {
        return Ok(Seat::Player1);
    }
    match &record.player2 {
        Some(p2) if p2 == player => Ok(Seat::Player2),
        _ => Err(Error::NotParticipant),
    }
}

pub(crate) fn address_of(record: &MatchRecord, seat: Seat) -> Result<Address, Error> {
    match seat {
        Seat::Player1 => Ok(record.player1.clone()),
        Seat::Player2 => record.player2.clone().ok_or(Error::InvalidState),
    }
}

/// Only a match with both seats filled that has not concluded accepts moves.
pub(crate) fn ensure_live(record: &MatchRecord) -> Result<(), Error> {
    match record.phase {
        MatchPhase::Concluded => Err(Error::MatchFinished),
        MatchPhase::AwaitingOpponent => Err(Error::InvalidState),
        MatchPhase::CommitPhase | MatchPhase::RevealPhase => Ok(()),
    }
}

fn commitment_slot(record: &mut MatchRecord, seat: Seat) -> &mut Option<BytesN<32>> {
    match seat {
        Seat::Player1 => &mut record.player1_commitment,
        Seat::Player2 => &mut record.player2_commitment,
    }
}

fn move_slot(record: &mut MatchRecord, seat: Seat) -> &mut RevealedMove {
    match seat {
        Seat::Player1 => &mut record.player1_move,
        Seat::Player2 => &mut record.player2_move,
    }
}

pub(crate) fn apply_commit(
    record: &mut MatchRecord,
    seat: Seat,
    hashed_move: BytesN<32>,
) -> Result<(), Error> {
    // Both slots are locked once the round is in its reveal phase.
    if record.phase != MatchPhase::CommitPhase {
        return Err(Error::AlreadyCommitted);
    }

    let slot = commitment_slot(record, seat);
    if slot.is_some() {
        return Err(Error::AlreadyCommitted);
    }
    *slot = Some(hashed_move);

    if record.player1_commitment.is_some() && record.player2_commitment.is_some() {
        record.phase = MatchPhase::RevealPhase;
    }
    Ok(())
}

/// Accept a reveal if it opens the seat's commitment. A mismatch leaves the
/// record untouched so the player can retry.
pub(crate) fn apply_reveal(
    env: &Env,
    record: &mut MatchRecord,
    seat: Seat,
    game_move: Move,
    nonce: &Bytes,
) -> Result<RevealStep, Error> {
    if record.phase != MatchPhase::RevealPhase {
        return Err(Error::RevealNotOpen);
    }
    if move_slot(record, seat).shown().is_some() {
        return Err(Error::AlreadyRevealed);
    }

    let commitment = commitment_slot(record, seat)
        .clone()
        .ok_or(Error::InvalidState)?;
    if !verify(env, &commitment, &game_move, nonce) {
        return Err(Error::CommitmentMismatch);
    }
    *move_slot(record, seat) = RevealedMove::Shown(game_move);

    match (record.player1_move.shown(), record.player2_move.shown()) {
        (Some(m1), Some(m2)) => Ok(RevealStep::Resolved(resolve(record, m1, m2)?)),
        _ => Ok(RevealStep::AwaitingOpponent),
    }
}

/// Score a fully revealed round and reset the slots for the next one.
fn resolve(record: &mut MatchRecord, m1: Move, m2: Move) -> Result<Resolution, Error> {
    let outcome = resolve_round(&m1, &m2);

    let scorer = match outcome {
        RoundOutcome::AWins => {
            record.player1_hands_won = record
                .player1_hands_won
                .checked_add(1)
                .ok_or(Error::Overflow)?;
            Some((Seat::Player1, record.player1_hands_won))
        }
        RoundOutcome::BWins => {
            record.player2_hands_won = record
                .player2_hands_won
                .checked_add(1)
                .ok_or(Error::Overflow)?;
            Some((Seat::Player2, record.player2_hands_won))
        }
        RoundOutcome::Tie => {
            record.hands_tied = record.hands_tied.checked_add(1).ok_or(Error::Overflow)?;
            None
        }
    };

    record.player1_commitment = None;
    record.player2_commitment = None;
    record.player1_move = RevealedMove::Hidden;
    record.player2_move = RevealedMove::Hidden;

    let match_winner = match scorer {
        Some((seat, hands)) if hands >= record.hands_to_win => Some(seat),
        _ => None,
    };

    if match_winner.is_none() {
        record.round = record.round.checked_add(1).ok_or(Error::Overflow)?;
        record.phase = MatchPhase::CommitPhase;
    }

    Ok(Resolution {
        player1_move: m1,
        player2_move: m2,
        outcome,
        match_winner,
    })
}

/// True when `seat` has done its part in the current phase and the opponent
/// has not.
pub(crate) fn is_blocked_by_opponent(record: &MatchRecord, seat: Seat) -> bool {
    let (p1_done, p2_done) = match record.phase {
        MatchPhase::CommitPhase => (
            record.player1_commitment.is_some(),
            record.player2_commitment.is_some(),
        ),
        MatchPhase::RevealPhase => (
            record.player1_move.shown().is_some(),
            record.player2_move.shown().is_some(),
        ),
        _ => return false,
    };
    match seat {
        Seat::Player1 => p1_done && !p2_done,
        Seat::Player2 => p2_done && !p1_done,
    }
}
