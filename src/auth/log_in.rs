//! The log-in route handler: verifies credentials and issues a token.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use bcrypt::verify;
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, Error, user::get_user_by_email};

use super::{AuthError, issue_token};

/// The credentials sent to the log-in endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

/// A route handler for logging in a user.
///
/// On success the response carries a fresh bearer token and the user's
/// profile. Unknown emails and wrong passwords both produce the same 401
/// so the response does not reveal which part was wrong.
pub(crate) async fn log_in_endpoint(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Response, AuthError> {
    let (Some(email), Some(password)) = (credentials.email, credentials.password) else {
        return Err(AuthError::MissingCredentials);
    };
    let email = email.trim().to_ascii_lowercase();

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| AuthError::InternalError)?;

    let user = get_user_by_email(&connection, &email).map_err(|error| match error {
        Error::NotFound => AuthError::WrongCredentials,
        error => {
            tracing::error!("Could not look up user: {}", error);
            AuthError::InternalError
        }
    })?;

    let password_matches = verify(&password, &user.password_hash).map_err(|error| {
        tracing::error!("Error verifying password: {}", error);
        AuthError::InternalError
    })?;
    if !password_matches {
        return Err(AuthError::WrongCredentials);
    }

    let token = issue_token(user.id, state.token_duration, state.encoding_key())?;

    Ok(Json(json!({ "token": token, "user": user })).into_response())
}
