//! Stake custody for matches.
//!
//! Each match has an `EscrowAccount` holding the stakes paid in by its two
//! players, and `TotalEscrowed` tracks the sum across all matches. The
//! account is removed when its balance leaves the contract, so a match pays
//! out at most once.

use soroban_sdk::{token::TokenClient, Address, Env};

use crate::{DataKey, Error, EscrowAccount, MatchPhase, MatchRecord, PERSISTENT_BUMP_LEDGERS};

pub(crate) fn init_total(env: &Env) {
    set_total(env, 0);
}

pub(crate) fn get_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(Error::NotInitialized)
}

pub(crate) fn held(env: &Env, match_id: u64) -> i128 {
    env.storage()
        .persistent()
        .get::<_, EscrowAccount>(&DataKey::Escrow(match_id))
        .map(|account| account.held)
        .unwrap_or(0)
}

pub(crate) fn total_escrowed(env: &Env) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalEscrowed)
        .unwrap_or(0)
}

/// Pull `amount` from `player` into the contract and credit it to the match.
///
/// Each seat stakes once. A concluded match, or a seat that has already paid,
/// is not accepting stakes.
pub(crate) fn hold(
    env: &Env,
    record: &MatchRecord,
    player: &Address,
    amount: i128,
) -> Result<(), Error> {
    if amount <= 0 {
        return Err(Error::InvalidAmount);
    }
    if record.phase == MatchPhase::Concluded {
        return Err(Error::InvalidState);
    }

    let key = DataKey::Escrow(record.match_id);
    let mut account: EscrowAccount = env
        .storage()
        .persistent()
        .get(&key)
        .unwrap_or(EscrowAccount {
            held: 0,
            player1_staked: false,
            player2_staked: false,
        });

    if &record.player1 == player {
        if account.player1_staked {
            return Err(Error::InvalidState);
        }
        account.player1_staked = true;
    } else if record.player2.as_ref() == Some(player) {
        if account.player2_staked {
            return Err(Error::InvalidState);
        }
        account.player2_staked = true;
    } else {
        return Err(Error::NotParticipant);
    }

    let token = get_token(env)?;
    TokenClient::new(env, &token).transfer(player, env.current_contract_address(), &amount);

    account.held = account.held.checked_add(amount).ok_or(Error::Overflow)?;
    let new_total = total_escrowed(env)
        .checked_add(amount)
        .ok_or(Error::Overflow)?;

    env.storage().persistent().set(&key, &account);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
    set_total(env, new_total);

    Ok(())
}

/// Pay the whole match balance to `winner`. Returns the amount paid.
pub(crate) fn release(env: &Env, match_id: u64, winner: &Address) -> Result<i128, Error> {
    let amount = close_account(env, match_id)?;

    let token = get_token(env)?;
    TokenClient::new(env, &token).transfer(&env.current_contract_address(), winner, &amount);

    Ok(amount)
}

/// Return a lone waiting player's stake.
pub(crate) fn refund(env: &Env, match_id: u64, player: &Address) -> Result<i128, Error> {
    let key = DataKey::Escrow(match_id);
    let account: EscrowAccount = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::EscrowNotFound)?;
    if account.player2_staked {
        return Err(Error::InvalidState);
    }

    let amount = close_account(env, match_id)?;

    let token = get_token(env)?;
    TokenClient::new(env, &token).transfer(&env.current_contract_address(), player, &amount);

    Ok(amount)
}

/// Remove the match's account and debit the global total. Accounting is
/// settled here, before any outbound transfer.
fn close_account(env: &Env, match_id: u64) -> Result<i128, Error> {
    let key = DataKey::Escrow(match_id);
    let account: EscrowAccount = env
        .storage()
        .persistent()
        .get(&key)
        .ok_or(Error::EscrowNotFound)?;
    if account.held <= 0 {
        return Err(Error::EscrowNotFound);
    }

    let new_total = total_escrowed(env)
        .checked_sub(account.held)
        .ok_or(Error::Overflow)?;

    env.storage().persistent().remove(&key);
    set_total(env, new_total);

    Ok(account.held)
}

fn set_total(env: &Env, value: i128) {
    env.storage().persistent().set(&DataKey::TotalEscrowed, &value);
    env.storage().persistent().extend_ttl(
        &DataKey::TotalEscrowed,
        PERSISTENT_BUMP_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}
