//! Sets up the application's SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{Error, account, category, transaction, user};

/// Create the tables for the domain models if they do not already exist.
///
/// Also enables foreign key enforcement, which SQLite leaves off by default.
/// Transactions reference their account and category with plain foreign
/// keys, so an account or category cannot be deleted while transactions
/// still point at it.
///
/// # Errors
/// Returns an error if a table cannot be created or there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    user::create_user_table(&sql_transaction)?;
    account::create_account_table(&sql_transaction)?;
    category::create_category_table(&sql_transaction)?;
    transaction::create_transaction_table(&sql_transaction)?;

    sql_transaction.commit()?;

    Ok(())
}
