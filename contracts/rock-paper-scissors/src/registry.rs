//! Match records and the indexes used to find them.
//!
//! Records live in an arena keyed by match id. Three indexes point into it:
//! - `Waiting(stake, hands_to_win)`: the single open match for a configuration.
//! - `PlayerMatch(player)`: the latest match a player sat in. Kept after
//!   conclusion until the player joins again.
//! - `Pair(a, b)`: the latest match between two players, written under both
//!   orderings so lookups are symmetric. Kept after conclusion.
//!
//! The open and active listings keep one id per `ListAt` slot. Removal swaps
//! the last slot into the freed one, so every write touches a fixed number of
//! entries however many matches are listed.

use soroban_sdk::{Address, Env, IntoVal, Val, Vec};

use crate::{
    DataKey, Error, Listing, MatchPhase, MatchRecord, RevealedMove, PERSISTENT_BUMP_LEDGERS,
};

pub(crate) fn next_match_id(env: &Env) -> Result<u64, Error> {
    let id: u64 = env
        .storage()
        .instance()
        .get(&DataKey::NextMatchId)
        .ok_or(Error::NotInitialized)?;
    let next = id.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&DataKey::NextMatchId, &next);
    Ok(id)
}

pub(crate) fn load(env: &Env, match_id: u64) -> Result<MatchRecord, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Match(match_id))
        .ok_or(Error::MatchNotFound)
}

pub(crate) fn save(env: &Env, record: &MatchRecord) {
    set_persistent(env, &DataKey::Match(record.match_id), record);
}

/// Seat `player` in the waiting match for this configuration, or open a new
/// one. Returns the record and whether an opponent was found.
pub(crate) fn find_or_create_waiting(
    env: &Env,
    stake: i128,
    hands_to_win: u32,
    player: &Address,
) -> Result<(MatchRecord, bool), Error> {
    let now = env.ledger().timestamp();
    let waiting_key = DataKey::Waiting(stake, hands_to_win);

    if let Some(match_id) = env.storage().persistent().get::<_, u64>(&waiting_key) {
        let mut record = load(env, match_id)?;
        if record.phase != MatchPhase::AwaitingOpponent || record.player2.is_some() {
            return Err(Error::InvalidState);
        }

        record.player2 = Some(player.clone());
        record.phase = MatchPhase::CommitPhase;
        record.round = 0;
        record.updated_at = now;
        save(env, &record);

        env.storage().persistent().remove(&waiting_key);
        list_remove(env, Listing::Open, match_id);
        list_push(env, Listing::Active, match_id)?;

        set_persistent(env, &DataKey::PlayerMatch(player.clone()), &match_id);
        set_persistent(
            env,
            &DataKey::Pair(record.player1.clone(), player.clone()),
            &match_id,
        );
        set_persistent(
            env,
            &DataKey::Pair(player.clone(), record.player1.clone()),
            &match_id,
        );

        return Ok((record, true));
    }

    let match_id = next_match_id(env)?;
    let record = MatchRecord {
        match_id,
        player1: player.clone(),
        player2: None,
        stake,
        hands_to_win,
        phase: MatchPhase::AwaitingOpponent,
        round: 0,
        player1_commitment: None,
        player2_commitment: None,
        player1_move: RevealedMove::Hidden,
        player2_move: RevealedMove::Hidden,
        player1_hands_won: 0,
        player2_hands_won: 0,
        hands_tied: 0,
        winner: None,
        created_at: now,
        updated_at: now,
    };
    save(env, &record);

    set_persistent(env, &waiting_key, &match_id);
    list_push(env, Listing::Open, match_id)?;
    set_persistent(env, &DataKey::PlayerMatch(player.clone()), &match_id);

    Ok((record, false))
}

/// The latest match `player` sat in, concluded or not.
pub(crate) fn latest(env: &Env, player: &Address) -> Option<MatchRecord> {
    let match_id: u64 = env
        .storage()
        .persistent()
        .get(&DataKey::PlayerMatch(player.clone()))?;
    load(env, match_id).ok()
}

/// The waiting or active match `player` occupies, in either seat.
pub(crate) fn lookup(env: &Env, player: &Address) -> Option<MatchRecord> {
    latest(env, player).filter(|record| record.phase != MatchPhase::Concluded)
}

/// The latest match between `a` and `b`, in either order.
pub(crate) fn lookup_pair(env: &Env, a: &Address, b: &Address) -> Option<MatchRecord> {
    let match_id: u64 = env
        .storage()
        .persistent()
        .get(&DataKey::Pair(a.clone(), b.clone()))?;
    load(env, match_id).ok()
}

/// Persist a concluded match and drop it from the active listing. Both
/// players are free to join again once the phase is `Concluded`.
pub(crate) fn archive(env: &Env, record: &MatchRecord) {
    save(env, record);
    list_remove(env, Listing::Active, record.match_id);
}

/// Drop a match that never found an opponent.
pub(crate) fn remove_waiting(env: &Env, record: &MatchRecord) {
    env.storage()
        .persistent()
        .remove(&DataKey::Waiting(record.stake, record.hands_to_win));
    env.storage()
        .persistent()
        .remove(&DataKey::PlayerMatch(record.player1.clone()));
    env.storage()
        .persistent()
        .remove(&DataKey::Match(record.match_id));
    list_remove(env, Listing::Open, record.match_id);
}

pub(crate) fn list_len(env: &Env, listing: Listing) -> u32 {
    env.storage()
        .persistent()
        .get(&DataKey::ListLen(listing))
        .unwrap_or(0)
}

/// Up to `limit` records from slot `start` onwards.
pub(crate) fn list(env: &Env, listing: Listing, start: u32, limit: u32) -> Vec<MatchRecord> {
    let end = start.saturating_add(limit).min(list_len(env, listing));
    let mut result = Vec::new(env);
    for slot in start..end {
        let match_id: Option<u64> = env
            .storage()
            .persistent()
            .get(&DataKey::ListAt(listing, slot));
        if let Some(Ok(record)) = match_id.map(|id| load(env, id)) {
            result.push_back(record);
        }
    }
    result
}

fn list_push(env: &Env, listing: Listing, match_id: u64) -> Result<(), Error> {
    let len = list_len(env, listing);
    let next = len.checked_add(1).ok_or(Error::Overflow)?;

    set_persistent(env, &DataKey::ListAt(listing, len), &match_id);
    set_persistent(env, &DataKey::ListPos(listing, match_id), &len);
    set_persistent(env, &DataKey::ListLen(listing), &next);
    Ok(())
}

fn list_remove(env: &Env, listing: Listing, match_id: u64) {
    let pos_key = DataKey::ListPos(listing, match_id);
    let pos: u32 = match env.storage().persistent().get(&pos_key) {
        Some(pos) => pos,
        None => return,
    };
    let last = list_len(env, listing).saturating_sub(1);

    if pos != last {
        let moved: Option<u64> = env
            .storage()
            .persistent()
            .get(&DataKey::ListAt(listing, last));
        if let Some(moved) = moved {
            set_persistent(env, &DataKey::ListAt(listing, pos), &moved);
            set_persistent(env, &DataKey::ListPos(listing, moved), &pos);
        }
    }

    env.storage()
        .persistent()
        .remove(&DataKey::ListAt(listing, last));
    env.storage().persistent().remove(&pos_key);
    set_persistent(env, &DataKey::ListLen(listing), &last);
}

fn set_persistent<V: IntoVal<Env, Val>>(env: &Env, key: &DataKey, value: &V) {
    env.storage().persistent().set(key, value);
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}
