//! The route handler for recording a new transaction.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error, balance,
    account::get_account,
    auth::AuthUser,
    category::get_category,
    database_id::{AccountId, CategoryId},
};

use super::core::{TransactionRecord, insert_transaction};

/// The request body for recording a new transaction.
#[derive(Debug, Deserialize)]
pub(crate) struct NewTransactionData {
    account: Option<AccountId>,
    category: Option<CategoryId>,
    amount: Option<f64>,
    comment: Option<String>,
    date: Option<Date>,
}

/// A route handler for recording a new transaction.
///
/// Resolves the referenced account and category, applies the balance effect
/// and persists the transaction with its balance snapshots. The balance
/// write and the transaction insert run in one SQL transaction, so a
/// rejected transaction leaves no trace.
pub(crate) async fn create_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(data): Json<NewTransactionData>,
) -> Result<Response, Error> {
    let (Some(account_id), Some(category_id), Some(amount), Some(date)) =
        (data.account, data.category, data.amount, data.date)
    else {
        return Err(Error::Validation(
            "account, category, amount, date are required".to_owned(),
        ));
    };

    if amount <= 0.0 {
        return Err(Error::Validation(
            "Amount must be greater than 0".to_owned(),
        ));
    }

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let sql_transaction = connection.unchecked_transaction()?;

    let account = get_account(&sql_transaction, account_id, user.id).map_err(|error| {
        match error {
            Error::NotFound => Error::AccountNotFound,
            error => error,
        }
    })?;
    let category = get_category(&sql_transaction, category_id, user.id).map_err(|error| {
        match error {
            Error::NotFound => Error::CategoryNotFound,
            error => error,
        }
    })?;

    let change = balance::apply(&sql_transaction, &account, category.kind, amount)?;

    let transaction = insert_transaction(
        &sql_transaction,
        TransactionRecord {
            user_id: user.id,
            account_id: account.id,
            category_id: category.id,
            amount,
            kind: category.kind,
            balance_before: change.before,
            balance_after: change.after,
            comment: data.comment.unwrap_or_default(),
            date,
        },
    )?;

    sql_transaction.commit()?;

    Ok((StatusCode::CREATED, Json(json!({ "transaction": transaction }))).into_response())
}
