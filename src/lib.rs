//! Moneta is a personal finance tracker served as a JSON REST API.
//!
//! Users record income and expense transactions against their accounts, and
//! the server keeps each account's balance consistent with its transaction
//! history: applying a transaction adjusts the balance, editing or deleting
//! one rolls the balance back to the recorded snapshot, and no operation may
//! drive a balance below zero.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod admin;
mod app_state;
mod auth;
mod balance;
mod category;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod pagination;
mod routing;
#[cfg(test)]
mod test_utils;
mod transaction;
mod user;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A request was missing required fields or contained malformed values.
    ///
    /// The message is shown to the client and should name the offending
    /// fields.
    #[error("{0}")]
    Validation(String),

    /// The requested resource was not found, or belongs to another user.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The account referenced by a transaction operation does not exist for
    /// the acting user.
    ///
    /// Unlike [Error::NotFound], this maps to a 400 response because the
    /// account is a *referenced* resource, not the request's subject.
    #[error("Account not found")]
    AccountNotFound,

    /// The category referenced by a transaction operation does not exist for
    /// the acting user.
    #[error("Category not found")]
    CategoryNotFound,

    /// An expense would drive the account balance below zero.
    #[error("Insufficient funds on account")]
    InsufficientFunds,

    /// A stored balance snapshot was negative, which should be impossible:
    /// snapshots are only ever taken from balances that passed the
    /// non-negative check.
    ///
    /// Restoring such a snapshot would corrupt the account, so the rollback
    /// is refused and the error is reported as an internal failure rather
    /// than a validation problem.
    #[error("stored balance snapshot {0} is negative, refusing to restore it")]
    CorruptSnapshot(f64),

    /// Tried to delete an account that still has transactions recorded
    /// against it.
    #[error("Account is referenced by existing transactions")]
    AccountInUse,

    /// Tried to delete a category that still has transactions recorded
    /// against it.
    #[error("Category is referenced by existing transactions")]
    CategoryInUse,

    /// The email address is already registered to another user.
    #[error("Email already in use")]
    DuplicateEmail,

    /// An unexpected error occurred in the password hashing library.
    ///
    /// The error string should only be logged on the server, never sent to
    /// the client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::Validation(_)
            | Error::AccountNotFound
            | Error::CategoryNotFound
            | Error::InsufficientFunds
            | Error::AccountInUse
            | Error::CategoryInUse => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateEmail => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal errors are not intended to be shown to the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
