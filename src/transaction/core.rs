//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row, params};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::CategoryType,
    database_id::{AccountId, CategoryId, TransactionId, UserId},
};

/// A single posting that adjusted exactly one account's balance.
///
/// The `balance_before`/`balance_after` pair records the account balance
/// around the moment the transaction was applied. Rolling the transaction
/// back (on edit or delete) restores the account to `balance_before`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The ID of the user that owns the transaction.
    #[serde(rename = "user")]
    pub user_id: UserId,
    /// The ID of the account the transaction was applied to.
    #[serde(rename = "account")]
    pub account_id: AccountId,
    /// The ID of the category the transaction was recorded under.
    #[serde(rename = "category")]
    pub category_id: CategoryId,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// Whether the transaction added to or subtracted from the balance.
    ///
    /// Copied from the category at the time the transaction was recorded,
    /// so later category edits do not rewrite history.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// The account balance immediately before this transaction was applied.
    #[serde(rename = "balanceBefore")]
    pub balance_before: f64,
    /// The account balance immediately after this transaction was applied.
    #[serde(rename = "balanceAfter")]
    pub balance_after: f64,
    /// A free-form note.
    pub comment: String,
    /// When the transaction happened, as entered by the user.
    pub date: Date,
    /// When the transaction was recorded.
    #[serde(rename = "createdAt")]
    pub created_at: OffsetDateTime,
}

/// The data needed to record a new transaction, i.e. a [Transaction] without
/// the database-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransactionRecord {
    /// The ID of the user that owns the transaction.
    pub user_id: UserId,
    /// The ID of the account the transaction was applied to.
    pub account_id: AccountId,
    /// The ID of the category the transaction was recorded under.
    pub category_id: CategoryId,
    /// The amount of money spent or earned, always positive.
    pub amount: f64,
    /// Whether the transaction added to or subtracted from the balance.
    pub kind: CategoryType,
    /// The account balance immediately before the transaction was applied.
    pub balance_before: f64,
    /// The account balance immediately after the transaction was applied.
    pub balance_after: f64,
    /// A free-form note.
    pub comment: String,
    /// When the transaction happened, as entered by the user.
    pub date: Date,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// The account and category foreign keys carry no delete action, so an
/// account or category cannot be deleted while transactions reference it.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub(crate) fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                amount REAL NOT NULL,
                type TEXT NOT NULL,
                balance_before REAL NOT NULL,
                balance_after REAL NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id),
                FOREIGN KEY(category_id) REFERENCES category(id)
                )",
        (),
    )?;

    // Composite index used by the list and summary queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date
         ON \"transaction\"(user_id, date)",
        (),
    )?;

    Ok(())
}

pub(crate) const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, category_id, amount, \
     type, balance_before, balance_after, comment, date, created_at";

/// Map a database row to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        category_id: row.get(3)?,
        amount: row.get(4)?,
        kind: row.get(5)?,
        balance_before: row.get(6)?,
        balance_after: row.get(7)?,
        comment: row.get(8)?,
        date: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Persist a new transaction.
///
/// Callers must run this inside the same SQL transaction as the balance
/// write that produced the snapshots, so the account's stored balance and
/// `balance_after` cannot disagree.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn insert_transaction(
    connection: &Connection,
    record: TransactionRecord,
) -> Result<Transaction, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO \"transaction\" (user_id, account_id, category_id, amount, type,
                 balance_before, balance_after, comment, date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.user_id,
            record.account_id,
            record.category_id,
            record.amount,
            record.kind,
            record.balance_before,
            record.balance_after,
            record.comment,
            record.date,
            created_at
        ],
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        user_id: record.user_id,
        account_id: record.account_id,
        category_id: record.category_id,
        amount: record.amount,
        kind: record.kind,
        balance_before: record.balance_before,
        balance_after: record.balance_after,
        comment: record.comment,
        date: record.date,
        created_at,
    })
}

/// Retrieve the transaction `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn get_transaction(
    connection: &Connection,
    id: TransactionId,
    user_id: UserId,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row(params![id, user_id], map_transaction_row)
        .map_err(|error| error.into())
}

/// Persist the mutable fields of `transaction`.
///
/// The owner and creation timestamp are never rewritten.
pub(crate) fn update_transaction(
    connection: &Connection,
    transaction: &Transaction,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE \"transaction\"
         SET account_id = ?1, category_id = ?2, amount = ?3, type = ?4,
             balance_before = ?5, balance_after = ?6, comment = ?7, date = ?8
         WHERE id = ?9",
        params![
            transaction.account_id,
            transaction.category_id,
            transaction.amount,
            transaction.kind,
            transaction.balance_before,
            transaction.balance_after,
            transaction.comment,
            transaction.date,
            transaction.id
        ],
    )?;

    Ok(())
}

/// Delete the transaction `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the transaction does not exist or belongs to
///   another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn delete_transaction(
    connection: &Connection,
    id: TransactionId,
    user_id: UserId,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
