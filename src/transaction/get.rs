//! The route handler for fetching a single transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, Error, auth::AuthUser, database_id::TransactionId};

use super::core::get_transaction;

/// A route handler for fetching one transaction by its ID.
pub(crate) async fn get_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TransactionId>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let transaction = get_transaction(&connection, id, user.id)?;

    Ok(Json(json!({ "transaction": transaction })).into_response())
}
