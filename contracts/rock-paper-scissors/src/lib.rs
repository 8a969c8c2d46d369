//! Rock-Paper-Scissors Wagering Contract
//!
//! Pairs players who stake the same amount for the same match length, escrows
//! both stakes, and plays a best-of-N match with a commit-reveal protocol so
//! neither player can pick a hand after seeing the other's.
//!
//! ## Match Flow
//! 1. `join_game` → stake transfers in. The first player for a given
//!    `(stake, hands_to_win)` waits; the next compatible player starts the match.
//! 2. Each round both players `commit_move` with `sha256(label || nonce)`,
//!    in any order. The round opens for reveals once both commitments exist.
//! 3. Both players `reveal_move` with the move and nonce. A reveal that does
//!    not hash to the stored commitment is rejected and may be retried.
//! 4. Once both reveals are in, the round resolves. Ties replay the round.
//!    The first player to win `hands_to_win` rounds takes both stakes and is
//!    credited on the leaderboard contract, along with the stake won or lost.
//!
//! ## Liveness
//! A player left waiting on an unresponsive opponent can `claim_timeout`
//! once the match has been idle for `move_timeout_secs`, provided the claimant
//! has already acted in the current phase and the opponent has not. Either
//! player may `forfeit_game` at any time; a queued player may
//! `leave_waiting_queue` for a full refund.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, Token, Leaderboard, MoveTimeout, Paused, NextMatchId.
//! - `persistent()`: match records, escrow accounts, the registry indexes
//!   (waiting-by-config, player, pair) and the open/active listings, each
//!   bumped on every write. Listings are stored one slot per entry
//!   (`ListAt`) with a length and a reverse index, never as a single vector.
//!
//! ## Invariant
//! `get_total_escrowed() == token.balance(contract_address)` at all times,
//! assuming all token inflows go through `join_game`.
#![no_std]
#![allow(unexpected_cfgs)]

mod escrow;
mod registry;
mod round;

use soroban_sdk::{
    contract, contractclient, contracterror, contractevent, contractimpl, contracttype, Address,
    Bytes, BytesN, Env, Vec,
};

pub use rps_shared::{Move, PlayerStats, RoundOutcome, MAX_LEADERBOARD_SIZE};

use round::{RevealStep, Seat};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;
/// Longest match a player may ask for, in rounds won.
pub const MAX_HANDS_TO_WIN: u32 = 100;
/// Shortest idle window accepted for `claim_timeout`.
pub const MIN_MOVE_TIMEOUT_SECS: u64 = 60;
/// Page size cap for the open/active match listings.
pub const MAX_QUERY_LIMIT: u32 = 30;

// ---------------------------------------------------------------------------
// Leaderboard interface
// ---------------------------------------------------------------------------

/// The subset of the leaderboard contract this game calls. A failed call
/// traps, rolling back the whole invocation.
#[contractclient(name = "LeaderboardClient")]
pub trait Leaderboard {
    fn record_win(env: Env, caller: Address, player: Address, amount: i128) -> u32;
    fn record_loss(env: Env, caller: Address, player: Address, amount: i128) -> u32;
    fn ranked_view(env: Env, limit: u32) -> Vec<PlayerStats>;
}

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized     = 2,
    NotAuthorized      = 3,
    ContractPaused     = 4,
    AlreadyPaused      = 5,
    NotPaused          = 6,
    InvalidAmount      = 7,
    InvalidHandsToWin  = 8,
    InvalidTimeout     = 9,
    InvalidLimit       = 10,
    /// The player already occupies a waiting or active match.
    AlreadyInMatch     = 11,
    MatchNotFound      = 12,
    NotParticipant     = 13,
    /// `leave_waiting_queue` on a match that already has an opponent.
    NotWaiting         = 14,
    InvalidState       = 15,
    AlreadyCommitted   = 16,
    RevealNotOpen      = 17,
    AlreadyRevealed    = 18,
    CommitmentMismatch = 19,
    MatchFinished      = 20,
    TimeoutNotReached  = 21,
    NothingToClaim     = 22,
    EscrowNotFound     = 23,
    Overflow           = 24,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MatchPhase {
    AwaitingOpponent = 0,
    CommitPhase = 1,
    RevealPhase = 2,
    Concluded = 3,
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConclusionReason {
    Decided = 0,
    Forfeit = 1,
    Timeout = 2,
}

/// A seat's opened move for the current round.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RevealedMove {
    Hidden,
    Shown(Move),
}

impl RevealedMove {
    pub fn shown(&self) -> Option<Move> {
        match self {
            RevealedMove::Hidden => None,
            RevealedMove::Shown(game_move) => Some(*game_move),
        }
    }
}

/// A match between two players. `player2` is unset while the match waits
/// for an opponent. Commitment and move slots belong to the current round
/// and are cleared whenever a round resolves.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchRecord {
    pub match_id: u64,
    pub player1: Address,
    pub player2: Option<Address>,
    pub stake: i128,
    pub hands_to_win: u32,
    pub phase: MatchPhase,
    pub round: u32,
    pub player1_commitment: Option<BytesN<32>>,
    pub player2_commitment: Option<BytesN<32>>,
    pub player1_move: RevealedMove,
    pub player2_move: RevealedMove,
    pub player1_hands_won: u32,
    pub player2_hands_won: u32,
    pub hands_tied: u32,
    pub winner: Option<Address>,
    pub created_at: u64,
    /// Ledger timestamp of the last accepted join, commit or reveal.
    pub updated_at: u64,
}

/// Funds held for one match. Each player can stake at most once.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowAccount {
    pub held: i128,
    pub player1_staked: bool,
    pub player2_staked: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinOutcome {
    pub match_id: u64,
    pub opponent_found: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerGameView {
    pub game: MatchRecord,
    pub waiting_for_opponent: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContractConfig {
    pub admin: Address,
    pub token: Address,
    pub leaderboard: Address,
    pub move_timeout_secs: u64,
    pub paused: bool,
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Listing {
    Open,
    Active,
}

#[contracttype]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Token,
    Leaderboard,
    MoveTimeout,
    Paused,
    NextMatchId,
    // --- persistent() ---
    Match(u64),
    Escrow(u64),
    TotalEscrowed,
    /// Waiting match id for a `(stake, hands_to_win)` configuration.
    Waiting(i128, u32),
    /// Latest match id a player sat in, concluded ones included.
    PlayerMatch(Address),
    /// Latest match id for a pair; written under both orderings.
    Pair(Address, Address),
    /// Number of ids in a listing.
    ListLen(Listing),
    /// Match id at a slot of a listing.
    ListAt(Listing, u32),
    /// Slot a match id occupies in a listing.
    ListPos(Listing, u64),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    #[topic]
    pub admin: Address,
    pub token: Address,
    pub leaderboard: Address,
    pub move_timeout_secs: u64,
}

#[contractevent]
pub struct PlayerQueued {
    #[topic]
    pub match_id: u64,
    #[topic]
    pub player: Address,
    pub stake: i128,
    pub hands_to_win: u32,
}

#[contractevent]
pub struct MatchStarted {
    #[topic]
    pub match_id: u64,
    pub player1: Address,
    pub player2: Address,
    pub stake: i128,
    pub hands_to_win: u32,
}

#[contractevent]
pub struct MoveCommitted {
    #[topic]
    pub match_id: u64,
    #[topic]
    pub player: Address,
    pub round: u32,
}

#[contractevent]
pub struct MoveRevealed {
    #[topic]
    pub match_id: u64,
    #[topic]
    pub player: Address,
    pub round: u32,
    pub game_move: Move,
}

#[contractevent]
pub struct RoundResolved {
    #[topic]
    pub match_id: u64,
    pub round: u32,
    pub player1_move: Move,
    pub player2_move: Move,
    pub outcome: RoundOutcome,
}

#[contractevent]
pub struct MatchConcluded {
    #[topic]
    pub match_id: u64,
    #[topic]
    pub winner: Address,
    pub loser: Address,
    pub payout: i128,
    pub reason: ConclusionReason,
}

#[contractevent]
pub struct StakeRefunded {
    #[topic]
    pub match_id: u64,
    #[topic]
    pub player: Address,
    pub amount: i128,
}

#[contractevent]
pub struct PauseChanged {
    pub paused: bool,
    pub admin: Address,
}

#[contractevent]
pub struct AdminChanged {
    pub old_admin: Address,
    pub new_admin: Address,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct RockPaperScissors;

#[contractimpl]
impl RockPaperScissors {
    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    /// Initialize the game. May only be called once.
    ///
    /// `token` is the SEP-41 contract all stakes are paid in. `leaderboard`
    /// must authorize this contract as a writer before the first match ends.
    pub fn init(
        env: Env,
        admin: Address,
        token: Address,
        leaderboard: Address,
        move_timeout_secs: u64,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        if move_timeout_secs < MIN_MOVE_TIMEOUT_SECS {
            return Err(Error::InvalidTimeout);
        }

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::Leaderboard, &leaderboard);
        env.storage()
            .instance()
            .set(&DataKey::MoveTimeout, &move_timeout_secs);
        env.storage().instance().set(&DataKey::Paused, &false);
        env.storage().instance().set(&DataKey::NextMatchId, &1u64);
        escrow::init_total(&env);

        Initialized {
            admin,
            token,
            leaderboard,
            move_timeout_secs,
        }
        .publish(&env);

        Ok(())
    }

    pub fn set_admin(env: Env, admin: Address, new_admin: Address) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        env.storage().instance().set(&DataKey::Admin, &new_admin);
        AdminChanged {
            old_admin: admin,
            new_admin,
        }
        .publish(&env);
        Ok(())
    }

    pub fn set_move_timeout(env: Env, admin: Address, move_timeout_secs: u64) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        if move_timeout_secs < MIN_MOVE_TIMEOUT_SECS {
            return Err(Error::InvalidTimeout);
        }
        env.storage()
            .instance()
            .set(&DataKey::MoveTimeout, &move_timeout_secs);
        Ok(())
    }

    /// Stop new players from joining. Matches already under way can still be
    /// played out, forfeited or claimed.
    pub fn pause(env: Env, admin: Address) -> Result<(), Error> {
        require_admin(&env, &admin)?;
        if is_paused(&env) {
            return Err(Error::AlreadyPaused);
        }

        env.storage().instance().set(&DataKey::Paused, &true);
        PauseChanged {
            paused: true,
            admin,
        }
        .publish(&env);
        Ok(())
    }

    pub fn unpause(env: Env, admin: Address) -> Result<(), Error> {
        require_admin(&env, &admin)?;
        if !is_paused(&env) {
            return Err(Error::NotPaused);
        }

        env.storage().instance().set(&DataKey::Paused, &false);
        PauseChanged {
            paused: false,
            admin,
        }
        .publish(&env);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // join_game / leave_waiting_queue
    // -----------------------------------------------------------------------

    /// Enter matchmaking with `stake` tokens for a first-to-`hands_to_win` match.
    ///
    /// Pairs with the player already waiting on the same configuration, or
    /// queues the caller if there is none. A configuration mismatch is not an
    /// error: it simply opens a separate waiting match.
    pub fn join_game(
        env: Env,
        player: Address,
        hands_to_win: u32,
        stake: i128,
    ) -> Result<JoinOutcome, Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;

        if stake <= 0 {
            return Err(Error::InvalidAmount);
        }
        if hands_to_win == 0 || hands_to_win > MAX_HANDS_TO_WIN {
            return Err(Error::InvalidHandsToWin);
        }

        player.require_auth();

        if registry::lookup(&env, &player).is_some() {
            return Err(Error::AlreadyInMatch);
        }

        let (record, opponent_found) =
            registry::find_or_create_waiting(&env, stake, hands_to_win, &player)?;
        escrow::hold(&env, &record, &player, stake)?;

        if opponent_found {
            MatchStarted {
                match_id: record.match_id,
                player1: record.player1.clone(),
                player2: player,
                stake,
                hands_to_win,
            }
            .publish(&env);
        } else {
            PlayerQueued {
                match_id: record.match_id,
                player,
                stake,
                hands_to_win,
            }
            .publish(&env);
        }

        Ok(JoinOutcome {
            match_id: record.match_id,
            opponent_found,
        })
    }

    /// Withdraw from matchmaking before an opponent arrives. The stake is
    /// refunded in full.
    pub fn leave_waiting_queue(env: Env, player: Address) -> Result<i128, Error> {
        require_initialized(&env)?;
        player.require_auth();

        let record = registry::lookup(&env, &player).ok_or(Error::MatchNotFound)?;
        if record.phase != MatchPhase::AwaitingOpponent {
            return Err(Error::NotWaiting);
        }

        registry::remove_waiting(&env, &record);
        let amount = escrow::refund(&env, record.match_id, &player)?;

        StakeRefunded {
            match_id: record.match_id,
            player,
            amount,
        }
        .publish(&env);

        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // commit_move / reveal_move
    // -----------------------------------------------------------------------

    /// Lock in a hidden move for the current round of the `player1`/`player2`
    /// match. The pair may be given in either order.
    pub fn commit_move(
        env: Env,
        player: Address,
        player1: Address,
        player2: Address,
        hashed_move: BytesN<32>,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        player.require_auth();

        let mut record =
            registry::lookup_pair(&env, &player1, &player2).ok_or(Error::MatchNotFound)?;
        round::ensure_live(&record)?;
        let seat = round::seat_of(&record, &player)?;

        round::apply_commit(&mut record, seat, hashed_move)?;
        record.updated_at = env.ledger().timestamp();
        registry::save(&env, &record);

        MoveCommitted {
            match_id: record.match_id,
            player,
            round: record.round,
        }
        .publish(&env);

        Ok(())
    }

    /// Open the caller's commitment for the current round. The round resolves
    /// as soon as both players have revealed.
    pub fn reveal_move(
        env: Env,
        player: Address,
        player1: Address,
        player2: Address,
        game_move: Move,
        nonce: Bytes,
    ) -> Result<(), Error> {
        require_initialized(&env)?;

        player.require_auth();

        let mut record =
            registry::lookup_pair(&env, &player1, &player2).ok_or(Error::MatchNotFound)?;
        round::ensure_live(&record)?;
        let seat = round::seat_of(&record, &player)?;
        let revealed_round = record.round;

        let step = round::apply_reveal(&env, &mut record, seat, game_move, &nonce)?;
        record.updated_at = env.ledger().timestamp();

        MoveRevealed {
            match_id: record.match_id,
            player,
            round: revealed_round,
            game_move,
        }
        .publish(&env);

        match step {
            RevealStep::AwaitingOpponent => registry::save(&env, &record),
            RevealStep::Resolved(resolution) => {
                RoundResolved {
                    match_id: record.match_id,
                    round: revealed_round,
                    player1_move: resolution.player1_move,
                    player2_move: resolution.player2_move,
                    outcome: resolution.outcome,
                }
                .publish(&env);

                match resolution.match_winner {
                    Some(seat) => conclude(&env, &mut record, seat, ConclusionReason::Decided)?,
                    None => registry::save(&env, &record),
                }
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // forfeit_game / claim_timeout
    // -----------------------------------------------------------------------

    /// Concede the caller's active match. The opponent receives both stakes.
    pub fn forfeit_game(env: Env, player: Address) -> Result<(), Error> {
        require_initialized(&env)?;
        player.require_auth();

        let mut record = registry::latest(&env, &player).ok_or(Error::MatchNotFound)?;
        round::ensure_live(&record)?;
        let seat = round::seat_of(&record, &player)?;

        conclude(&env, &mut record, seat.other(), ConclusionReason::Forfeit)
    }

    /// Win by default when the opponent has stalled for longer than the move
    /// timeout. The claimant must have committed (or revealed) in the current
    /// phase while the opponent has not.
    pub fn claim_timeout(
        env: Env,
        claimant: Address,
        player1: Address,
        player2: Address,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        claimant.require_auth();

        let mut record =
            registry::lookup_pair(&env, &player1, &player2).ok_or(Error::MatchNotFound)?;
        round::ensure_live(&record)?;
        let seat = round::seat_of(&record, &claimant)?;

        let deadline = record
            .updated_at
            .checked_add(get_move_timeout(&env)?)
            .ok_or(Error::Overflow)?;
        if env.ledger().timestamp() <= deadline {
            return Err(Error::TimeoutNotReached);
        }

        if !round::is_blocked_by_opponent(&record, seat) {
            return Err(Error::NothingToClaim);
        }

        conclude(&env, &mut record, seat, ConclusionReason::Timeout)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The waiting or active match a player occupies, in either seat.
    pub fn get_game_by_player(env: Env, player: Address) -> Option<PlayerGameView> {
        registry::lookup(&env, &player).map(|record| PlayerGameView {
            waiting_for_opponent: record.phase == MatchPhase::AwaitingOpponent,
            game: record,
        })
    }

    /// The latest match between two players, including a concluded one.
    pub fn get_game(env: Env, player1: Address, player2: Address) -> Option<MatchRecord> {
        registry::lookup_pair(&env, &player1, &player2)
    }

    pub fn get_game_by_id(env: Env, match_id: u64) -> Result<MatchRecord, Error> {
        registry::load(&env, match_id)
    }

    /// Waiting matches, `limit` at a time from slot `start`. Slot order is
    /// not join order: removing a match moves the last one into its slot.
    pub fn get_open_games(env: Env, start: u32, limit: u32) -> Result<Vec<MatchRecord>, Error> {
        check_query_limit(limit)?;
        Ok(registry::list(&env, Listing::Open, start, limit))
    }

    pub fn get_active_games(
        env: Env,
        start: u32,
        limit: u32,
    ) -> Result<Vec<MatchRecord>, Error> {
        check_query_limit(limit)?;
        Ok(registry::list(&env, Listing::Active, start, limit))
    }

    pub fn get_open_game_count(env: Env) -> u32 {
        registry::list_len(&env, Listing::Open)
    }

    pub fn get_active_game_count(env: Env) -> u32 {
        registry::list_len(&env, Listing::Active)
    }

    /// Ranked standings from the leaderboard contract.
    pub fn get_leaderboard(env: Env, limit: u32) -> Result<Vec<PlayerStats>, Error> {
        if limit == 0 || limit > MAX_LEADERBOARD_SIZE {
            return Err(Error::InvalidLimit);
        }
        let board = get_leaderboard_address(&env)?;
        Ok(LeaderboardClient::new(&env, &board).ranked_view(&limit))
    }

    pub fn get_escrow(env: Env, match_id: u64) -> i128 {
        escrow::held(&env, match_id)
    }

    pub fn get_total_escrowed(env: Env) -> i128 {
        escrow::total_escrowed(&env)
    }

    pub fn get_config(env: Env) -> Result<ContractConfig, Error> {
        Ok(ContractConfig {
            admin: get_admin(&env)?,
            token: escrow::get_token(&env)?,
            leaderboard: get_leaderboard_address(&env)?,
            move_timeout_secs: get_move_timeout(&env)?,
            paused: is_paused(&env),
        })
    }
}

// ---------------------------------------------------------------------------
// Conclusion
// ---------------------------------------------------------------------------

/// End the match in favour of `winner_seat`: archive the record, pay out the
/// escrow and credit the leaderboard. Records are written before the token
/// transfer and the leaderboard call.
fn conclude(
    env: &Env,
    record: &mut MatchRecord,
    winner_seat: Seat,
    reason: ConclusionReason,
) -> Result<(), Error> {
    let winner = round::address_of(record, winner_seat)?;
    let loser = round::address_of(record, winner_seat.other())?;

    record.phase = MatchPhase::Concluded;
    record.winner = Some(winner.clone());
    record.updated_at = env.ledger().timestamp();
    registry::archive(env, record);

    let payout = escrow::release(env, record.match_id, &winner)?;

    let board = LeaderboardClient::new(env, &get_leaderboard_address(env)?);
    let this = env.current_contract_address();
    board.record_win(&this, &winner, &record.stake);
    board.record_loss(&this, &loser, &record.stake);

    MatchConcluded {
        match_id: record.match_id,
        winner,
        loser,
        payout,
        reason,
    }
    .publish(env);

    Ok(())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn get_admin(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)
}

/// Verify that `caller` is the stored admin and has signed the invocation.
fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin = get_admin(env)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn is_paused(env: &Env) -> bool {
    env.storage()
        .instance()
        .get::<_, bool>(&DataKey::Paused)
        .unwrap_or(false)
}

fn ensure_not_paused(env: &Env) -> Result<(), Error> {
    if is_paused(env) {
        return Err(Error::ContractPaused);
    }
    Ok(())
}

fn get_leaderboard_address(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Leaderboard)
        .ok_or(Error::NotInitialized)
}

fn get_move_timeout(env: &Env) -> Result<u64, Error> {
    env.storage()
        .instance()
        .get(&DataKey::MoveTimeout)
        .ok_or(Error::NotInitialized)
}

fn check_query_limit(limit: u32) -> Result<(), Error> {
    if limit == 0 || limit > MAX_QUERY_LIMIT {
        return Err(Error::InvalidLimit);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
