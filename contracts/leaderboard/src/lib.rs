//! Rock-Paper-Scissors Leaderboard Contract
//!
//! Tracks cumulative match wins and net winnings per player and keeps a
//! ranked standings list. Only the admin or authorized game contracts may
//! record results.
//!
//! ## Ranking
//! Standings are ordered by wins, highest first. Players with equal wins keep
//! the order in which they first appeared on the board, so an earlier entrant
//! is never overtaken by a later one without strictly more wins.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, Authorized writers, entry sequence counter.
//! - `persistent()`: per-player `Profile` entries and the capped `Standings`
//!   list, each bumped on every write.

#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env, Vec,
};

pub use rps_shared::{PlayerStats, MAX_LEADERBOARD_SIZE};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const PERSISTENT_BUMP_LEDGERS: u32 = 518_400; // ~30 days

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,
    InvalidLimit = 4,
    Overflow = 5,
    InvalidAmount = 6,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
pub enum DataKey {
    Admin,
    Authorized(Address),
    NextEntrySeq,
    Profile(Address),
    Standings,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct WriterAuthorized {
    #[topic]
    pub writer: Address,
    pub authorized: bool,
}

#[contractevent]
pub struct WinRecorded {
    #[topic]
    pub player: Address,
    pub wins: u32,
    pub winnings: i128,
}

#[contractevent]
pub struct LossRecorded {
    #[topic]
    pub player: Address,
    pub games_played: u32,
    pub winnings: i128,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct LeaderboardContract;

#[contractimpl]
impl LeaderboardContract {
    /// Initialize the leaderboard with an admin, who is also an authorized writer.
    pub fn init(env: Env, admin: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage()
            .instance()
            .set(&DataKey::Authorized(admin), &true);
        env.storage().instance().set(&DataKey::NextEntrySeq, &0u64);
        Ok(())
    }

    /// Authorize or deauthorize an address (e.g., a game contract) to record results.
    pub fn set_authorized(
        env: Env,
        admin: Address,
        writer: Address,
        authorized: bool,
    ) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        env.storage()
            .instance()
            .set(&DataKey::Authorized(writer.clone()), &authorized);
        WriterAuthorized { writer, authorized }.publish(&env);
        Ok(())
    }

    pub fn is_authorized(env: Env, writer: Address) -> bool {
        is_writer(&env, &writer)
    }

    /// Credit `player` with one match win worth `amount` tokens of net gain.
    /// Creates the entry if absent. Returns the player's new win count.
    pub fn record_win(
        env: Env,
        caller: Address,
        player: Address,
        amount: i128,
    ) -> Result<u32, Error> {
        require_writer(&env, &caller)?;
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }

        let mut stats = load_or_new_profile(&env, &player)?;
        stats.wins = stats.wins.checked_add(1).ok_or(Error::Overflow)?;
        stats.games_played = stats.games_played.checked_add(1).ok_or(Error::Overflow)?;
        stats.winnings = stats.winnings.checked_add(amount).ok_or(Error::Overflow)?;
        save_profile(&env, &stats);
        update_standings(&env, &stats);

        WinRecorded {
            player,
            wins: stats.wins,
            winnings: stats.winnings,
        }
        .publish(&env);

        Ok(stats.wins)
    }

    /// Count a lost match for `player`, debiting `amount` from their net
    /// winnings. Wins are untouched. Returns the player's new games-played count.
    pub fn record_loss(
        env: Env,
        caller: Address,
        player: Address,
        amount: i128,
    ) -> Result<u32, Error> {
        require_writer(&env, &caller)?;
        if amount < 0 {
            return Err(Error::InvalidAmount);
        }

        let mut stats = load_or_new_profile(&env, &player)?;
        stats.games_played = stats.games_played.checked_add(1).ok_or(Error::Overflow)?;
        stats.winnings = stats.winnings.checked_sub(amount).ok_or(Error::Overflow)?;
        save_profile(&env, &stats);
        update_standings(&env, &stats);

        LossRecorded {
            player,
            games_played: stats.games_played,
            winnings: stats.winnings,
        }
        .publish(&env);

        Ok(stats.games_played)
    }

    /// Top `limit` standings, most wins first.
    pub fn ranked_view(env: Env, limit: u32) -> Result<Vec<PlayerStats>, Error> {
        if limit == 0 || limit > MAX_LEADERBOARD_SIZE {
            return Err(Error::InvalidLimit);
        }

        let standings = load_standings(&env);
        let mut result = Vec::new(&env);
        let actual_limit = if limit < standings.len() {
            limit
        } else {
            standings.len()
        };

        for i in 0..actual_limit {
            result.push_back(standings.get_unchecked(i));
        }

        Ok(result)
    }

    /// 1-indexed rank of a player, or 0 if the player is not on the board.
    pub fn player_rank(env: Env, player: Address) -> u32 {
        match position_of(&load_standings(&env), &player) {
            Some(idx) => idx + 1,
            None => 0,
        }
    }

    pub fn player_stats(env: Env, player: Address) -> Option<PlayerStats> {
        env.storage().persistent().get(&DataKey::Profile(player))
    }

    pub fn player_wins(env: Env, player: Address) -> u32 {
        env.storage()
            .persistent()
            .get::<_, PlayerStats>(&DataKey::Profile(player))
            .map(|stats| stats.wins)
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Internal Helpers
// ---------------------------------------------------------------------------

fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn is_writer(env: &Env, writer: &Address) -> bool {
    env.storage()
        .instance()
        .get(&DataKey::Authorized(writer.clone()))
        .unwrap_or(false)
}

fn require_writer(env: &Env, caller: &Address) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    caller.require_auth();
    if !is_writer(env, caller) {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn load_or_new_profile(env: &Env, player: &Address) -> Result<PlayerStats, Error> {
    if let Some(stats) = env
        .storage()
        .persistent()
        .get(&DataKey::Profile(player.clone()))
    {
        return Ok(stats);
    }

    let seq: u64 = env
        .storage()
        .instance()
        .get(&DataKey::NextEntrySeq)
        .unwrap_or(0);
    let next = seq.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&DataKey::NextEntrySeq, &next);

    Ok(PlayerStats {
        player: player.clone(),
        wins: 0,
        games_played: 0,
        winnings: 0,
        first_recorded: seq,
    })
}

fn save_profile(env: &Env, stats: &PlayerStats) {
    let key = DataKey::Profile(stats.player.clone());
    env.storage().persistent().set(&key, stats);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

fn load_standings(env: &Env) -> Vec<PlayerStats> {
    env.storage()
        .persistent()
        .get(&DataKey::Standings)
        .unwrap_or(Vec::new(env))
}

fn position_of(standings: &Vec<PlayerStats>, player: &Address) -> Option<u32> {
    for i in 0..standings.len() {
        if &standings.get_unchecked(i).player == player {
            return Some(i);
        }
    }
    None
}

/// Strict ranking order: more wins first, then earlier first appearance.
fn ranks_ahead(a: &PlayerStats, b: &PlayerStats) -> bool {
    a.wins > b.wins || (a.wins == b.wins && a.first_recorded < b.first_recorded)
}

fn update_standings(env: &Env, stats: &PlayerStats) {
    let mut standings = load_standings(env);

    if let Some(idx) = position_of(&standings, &stats.player) {
        standings.remove(idx);
    }

    let mut insert_at = standings.len();
    for i in 0..standings.len() {
        if ranks_ahead(stats, &standings.get_unchecked(i)) {
            insert_at = i;
            break;
        }
    }

    if insert_at < standings.len() {
        standings.insert(insert_at, stats.clone());
    } else if standings.len() < MAX_LEADERBOARD_SIZE {
        standings.push_back(stats.clone());
    }

    while standings.len() > MAX_LEADERBOARD_SIZE {
        standings.pop_back();
    }

    env.storage().persistent().set(&DataKey::Standings, &standings);
    env.storage().persistent().extend_ttl(
        &DataKey::Standings,
        PERSISTENT_BUMP_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
