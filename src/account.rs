//! This file defines the `Account` type and the API routes for managing
//! accounts. An account is a balance-holding bucket owned by a user.
//!
//! The balance field is only ever written by the functions in
//! [crate::balance]; the handlers here delegate to that module when an edit
//! touches the balance.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    AppState, Error, balance,
    auth::AuthUser,
    database_id::{AccountId, UserId},
};

/// A balance-holding bucket owned by a user, e.g., a bank account or a cash
/// wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The ID of the user that owns the account.
    #[serde(rename = "user")]
    pub user_id: UserId,
    /// The display name of the account.
    pub name: String,
    /// A free-form tag describing the account, e.g., "card", "cash".
    #[serde(rename = "type")]
    pub kind: String,
    /// The amount of money currently available on the account.
    pub balance: f64,
    /// A free-form note.
    pub comment: String,
    /// When the account was created.
    #[serde(rename = "createdAt")]
    pub created_at: OffsetDateTime,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub(crate) fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                balance REAL NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to an [Account].
pub(crate) fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        balance: row.get(4)?,
        comment: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Create a new account owned by `user_id` with an opening balance.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn insert_account(
    connection: &Connection,
    user_id: UserId,
    name: &str,
    kind: &str,
    balance: f64,
    comment: &str,
) -> Result<Account, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO account (user_id, name, type, balance, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, name, kind, balance, comment, created_at],
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        user_id,
        name: name.to_owned(),
        kind: kind.to_owned(),
        balance,
        comment: comment.to_owned(),
        created_at,
    })
}

/// Retrieve the account `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or belongs to another
///   user,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn get_account(
    connection: &Connection,
    id: AccountId,
    user_id: UserId,
) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, type, balance, comment, created_at FROM account
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id], map_account_row)
        .map_err(|error| error.into())
}

/// Retrieve all accounts owned by `user_id`, newest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn list_accounts(
    connection: &Connection,
    user_id: UserId,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, type, balance, comment, created_at FROM account
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?
        .query_map(params![user_id], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Persist the name, type and comment fields of `account`.
///
/// The balance is deliberately not written here, see [crate::balance].
pub(crate) fn update_account_details(
    connection: &Connection,
    account: &Account,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE account SET name = ?1, type = ?2, comment = ?3 WHERE id = ?4",
        params![account.name, account.kind, account.comment, account.id],
    )?;

    Ok(())
}

/// Delete the account `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the account does not exist or belongs to another
///   user,
/// - [Error::AccountInUse] if transactions still reference the account,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn delete_account(
    connection: &Connection,
    id: AccountId,
    user_id: UserId,
) -> Result<(), Error> {
    let rows_deleted = connection
        .execute(
            "DELETE FROM account WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::AccountInUse,
            error => error.into(),
        })?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The request body for creating or updating an account.
#[derive(Debug, Deserialize)]
pub(crate) struct AccountData {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    balance: Option<f64>,
    comment: Option<String>,
}

/// A route handler for listing the authenticated user's accounts.
pub(crate) async fn list_accounts_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let accounts = list_accounts(&connection, user.id)?;

    Ok(Json(json!({ "accounts": accounts })).into_response())
}

/// A route handler for creating a new account.
///
/// The opening balance must be present and non-negative.
pub(crate) async fn create_account_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(data): Json<AccountData>,
) -> Result<Response, Error> {
    let name = data
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());
    let kind = data
        .kind
        .map(|kind| kind.trim().to_owned())
        .filter(|kind| !kind.is_empty());

    let (Some(name), Some(kind)) = (name, kind) else {
        return Err(Error::Validation("Name and type are required".to_owned()));
    };

    let Some(balance) = data.balance.filter(|balance| *balance >= 0.0) else {
        return Err(Error::Validation("Balance must be >= 0".to_owned()));
    };

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let account = insert_account(
        &connection,
        user.id,
        &name,
        &kind,
        balance,
        data.comment.as_deref().unwrap_or(""),
    )?;

    Ok((StatusCode::CREATED, Json(json!({ "account": account }))).into_response())
}

/// A route handler for updating an account.
///
/// A balance edit here bypasses the transaction history, so it goes through
/// the balance module like every other balance write.
pub(crate) async fn update_account_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<AccountId>,
    Json(data): Json<AccountData>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let sql_transaction = connection.unchecked_transaction()?;

    let mut account = get_account(&sql_transaction, id, user.id)?;

    if let Some(name) = data.name {
        let name = name.trim().to_owned();
        if !name.is_empty() {
            account.name = name;
        }
    }
    if let Some(kind) = data.kind {
        let kind = kind.trim().to_owned();
        if !kind.is_empty() {
            account.kind = kind;
        }
    }
    if let Some(comment) = data.comment {
        account.comment = comment;
    }

    update_account_details(&sql_transaction, &account)?;

    if let Some(balance) = data.balance {
        balance::set(&sql_transaction, account.id, balance)?;
        account.balance = balance;
    }

    sql_transaction.commit()?;

    Ok(Json(json!({ "account": account })).into_response())
}

/// A route handler for deleting an account.
///
/// Deletion is refused while transactions still reference the account, so
/// no transaction can be orphaned.
pub(crate) async fn delete_account_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<AccountId>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    delete_account(&connection, id, user.id)?;

    Ok(Json(json!({ "success": true })).into_response())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod account_query_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize, user::insert_test_user};

    use super::{delete_account, get_account, insert_account, list_accounts};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn, "foo@bar.baz");

        let inserted = insert_account(&conn, user_id, "Checking", "card", 120.5, "main")
            .expect("Could not insert account");

        let selected = get_account(&conn, inserted.id, user_id).unwrap();

        assert_eq!(inserted, selected);
    }

    #[test]
    fn get_fails_for_other_users_account() {
        let conn = get_test_connection();
        let owner = insert_test_user(&conn, "foo@bar.baz");
        let other = insert_test_user(&conn, "bar@baz.qux");

        let account = insert_account(&conn, owner, "Checking", "card", 0.0, "").unwrap();

        assert_eq!(get_account(&conn, account.id, other), Err(Error::NotFound));
    }

    #[test]
    fn list_returns_only_own_accounts() {
        let conn = get_test_connection();
        let owner = insert_test_user(&conn, "foo@bar.baz");
        let other = insert_test_user(&conn, "bar@baz.qux");

        insert_account(&conn, owner, "Checking", "card", 0.0, "").unwrap();
        insert_account(&conn, other, "Savings", "card", 0.0, "").unwrap();

        let accounts = list_accounts(&conn, owner).unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Checking");
    }

    #[test]
    fn delete_missing_account_fails() {
        let conn = get_test_connection();
        let user_id = insert_test_user(&conn, "foo@bar.baz");

        assert_eq!(delete_account(&conn, 1337, user_id), Err(Error::NotFound));
    }
}
