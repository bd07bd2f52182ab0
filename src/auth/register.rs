//! The registration route handler: creates a user and issues their first
//! token.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    user::{Role, hash_password, insert_user, normalize_email},
};

use super::issue_token;

/// The request body for registering a new user.
#[derive(Debug, Deserialize)]
pub(crate) struct RegisterData {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

/// A route handler for registering a new user.
///
/// New users always get the regular user role; administrators are created
/// through the admin endpoints.
pub(crate) async fn register_endpoint(
    State(state): State<AppState>,
    Json(data): Json<RegisterData>,
) -> Result<Response, Error> {
    let name = data
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());

    let (Some(name), Some(email), Some(password)) = (name, data.email, data.password) else {
        return Err(Error::Validation(
            "Name, email and password are required".to_owned(),
        ));
    };

    let email = normalize_email(&email)?;
    let password_hash = hash_password(&password)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let user = insert_user(&connection, &name, &email, &password_hash, Role::User)?;

    let token = match issue_token(user.id, state.token_duration, state.encoding_key()) {
        Ok(token) => token,
        Err(error) => return Ok(error.into_response()),
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "token": token, "user": user })),
    )
        .into_response())
}
