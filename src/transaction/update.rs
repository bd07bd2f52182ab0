//! The route handler for editing an existing transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
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
    database_id::{AccountId, CategoryId, TransactionId},
};

use super::core::{get_transaction, update_transaction};

/// The request body for editing a transaction. Absent fields keep their
/// current values.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionPatch {
    account: Option<AccountId>,
    category: Option<CategoryId>,
    amount: Option<f64>,
    comment: Option<String>,
    date: Option<Date>,
}

/// A route handler for editing a transaction.
///
/// The edit is a rollback followed by a re-apply: the original account's
/// balance is restored to the transaction's recorded `balance_before`, then
/// the new amount and category polarity are applied against the (possibly
/// different) target account. Both phases and the record update run in one
/// SQL transaction, so a failed re-apply rolls the restore back too and the
/// stores never disagree.
pub(crate) async fn update_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TransactionId>,
    Json(data): Json<TransactionPatch>,
) -> Result<Response, Error> {
    if let Some(amount) = data.amount
        && amount <= 0.0
    {
        return Err(Error::Validation(
            "Amount must be greater than 0".to_owned(),
        ));
    }

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let sql_transaction = connection.unchecked_transaction()?;

    let mut transaction = get_transaction(&sql_transaction, id, user.id)?;

    // Phase 1: roll the original posting back.
    balance::restore(
        &sql_transaction,
        transaction.account_id,
        transaction.balance_before,
    )?;

    // Phase 2: re-apply against the target account. The account is re-read
    // after the rollback so a same-account edit sees the restored balance.
    let target_account_id = data.account.unwrap_or(transaction.account_id);
    let account = get_account(&sql_transaction, target_account_id, user.id).map_err(|error| {
        match error {
            Error::NotFound => Error::AccountNotFound,
            error => error,
        }
    })?;

    let category_id = data.category.unwrap_or(transaction.category_id);
    let category = get_category(&sql_transaction, category_id, user.id).map_err(|error| {
        match error {
            Error::NotFound => Error::CategoryNotFound,
            error => error,
        }
    })?;

    let amount = data.amount.unwrap_or(transaction.amount);
    let change = balance::apply(&sql_transaction, &account, category.kind, amount)?;

    transaction.account_id = account.id;
    transaction.category_id = category.id;
    transaction.amount = amount;
    transaction.kind = category.kind;
    transaction.balance_before = change.before;
    transaction.balance_after = change.after;
    if let Some(comment) = data.comment {
        transaction.comment = comment;
    }
    if let Some(date) = data.date {
        transaction.date = date;
    }

    update_transaction(&sql_transaction, &transaction)?;

    sql_transaction.commit()?;

    Ok(Json(json!({ "transaction": transaction })).into_response())
}
