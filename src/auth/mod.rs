//! Authentication: JWT bearer tokens, the middleware that guards the API
//! routes, and the register/log-in handlers that issue tokens.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

mod log_in;
mod middleware;
mod register;
mod token;

pub(crate) use log_in::log_in_endpoint;
pub(crate) use middleware::{AuthUser, admin_guard, auth_guard};
pub(crate) use register::register_endpoint;
pub(crate) use token::{DEFAULT_TOKEN_DURATION, decode_token, issue_token};

/// The errors that may occur while authenticating a request.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AuthError {
    /// The request did not contain a bearer token.
    MissingToken,
    /// The bearer token could not be decoded or has expired.
    InvalidToken,
    /// The credentials sent to log in were incomplete.
    MissingCredentials,
    /// The email/password combination did not match a registered user.
    WrongCredentials,
    /// The authenticated user is not an administrator.
    Forbidden,
    /// A token could not be created.
    TokenCreation,
    /// An unexpected internal error occurred.
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Authorization token missing"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::MissingCredentials => {
                (StatusCode::BAD_REQUEST, "Email and password are required")
            }
            AuthError::WrongCredentials => (StatusCode::UNAUTHORIZED, "Invalid email or password"),
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::TokenCreation => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Token creation error")
            }
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
