//! The balance mutator: the only code in the crate that writes
//! `account.balance`.
//!
//! Applying a transaction moves the balance by the transaction amount in the
//! direction of its category type and records a before/after snapshot.
//! Rolling a transaction back restores the balance to the recorded
//! `balance_before` snapshot rather than computing the inverse, which keeps
//! the rollback correct against the state the transaction was actually
//! applied to. Every mutation checks the non-negative invariant.
//!
//! Callers are expected to run these functions inside an SQL transaction
//! together with the transaction-record write they belong to, so the
//! account's stored balance and the recorded `balance_after` can never
//! disagree.

use rusqlite::{Connection, params};

use crate::{Error, account::Account, category::CategoryType, database_id::AccountId};

/// The before/after snapshot produced by applying a transaction to an
/// account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BalanceChange {
    /// The account balance immediately before the transaction was applied.
    pub before: f64,
    /// The account balance immediately after the transaction was applied.
    pub after: f64,
}

/// Apply the balance effect of one transaction to `account` and persist the
/// new balance.
///
/// Income always succeeds. An expense fails with [Error::InsufficientFunds]
/// if it would drive the balance below zero, in which case nothing is
/// written.
pub(crate) fn apply(
    connection: &Connection,
    account: &Account,
    kind: CategoryType,
    amount: f64,
) -> Result<BalanceChange, Error> {
    let before = account.balance;
    let after = match kind {
        CategoryType::Income => before + amount,
        CategoryType::Expense => {
            let next = before - amount;
            if next < 0.0 {
                return Err(Error::InsufficientFunds);
            }
            next
        }
    };

    write_balance(connection, account.id, after)?;

    Ok(BalanceChange { before, after })
}

/// Roll back a previously applied transaction by restoring the account's
/// balance to the recorded `balance_before` snapshot.
///
/// Snapshots are only ever taken from balances that passed the non-negative
/// check, so a negative `snapshot` means the stored data is corrupt. The
/// restore is refused with [Error::CorruptSnapshot] in that case rather
/// than writing an invalid balance.
pub(crate) fn restore(
    connection: &Connection,
    account_id: AccountId,
    snapshot: f64,
) -> Result<(), Error> {
    if snapshot < 0.0 {
        return Err(Error::CorruptSnapshot(snapshot));
    }

    write_balance(connection, account_id, snapshot)
}

/// Overwrite an account's balance from an account edit.
///
/// This is the one balance write that does not go through a transaction;
/// it still enforces the non-negative invariant.
pub(crate) fn set(
    connection: &Connection,
    account_id: AccountId,
    balance: f64,
) -> Result<(), Error> {
    if balance < 0.0 {
        return Err(Error::Validation("Balance must be >= 0".to_owned()));
    }

    write_balance(connection, account_id, balance)
}

fn write_balance(
    connection: &Connection,
    account_id: AccountId,
    balance: f64,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        params![balance, account_id],
    )?;

    if rows_updated == 0 {
        return Err(Error::AccountNotFound);
    }

    Ok(())
}
