//! Administrative user management endpoints.
//!
//! All routes here sit behind the admin guard, so handlers can assume the
//! acting user is an administrator.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::params;
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState, Error,
    auth::AuthUser,
    database_id::UserId,
    user::{
        Role, get_user, hash_password, insert_user, list_users, normalize_email,
        set_password_hash, update_user,
    },
};

/// A route handler for listing all registered users.
pub(crate) async fn list_users_endpoint(State(state): State<AppState>) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let users = list_users(&connection)?;

    Ok(Json(json!({ "users": users })).into_response())
}

/// The request body for creating a user administratively.
#[derive(Debug, Deserialize)]
pub(crate) struct AdminUserData {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<String>,
}

/// A route handler for creating a user with an arbitrary role.
pub(crate) async fn create_user_endpoint(
    State(state): State<AppState>,
    Json(data): Json<AdminUserData>,
) -> Result<Response, Error> {
    let name = data
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());

    let (Some(name), Some(email), Some(password)) = (name, data.email, data.password) else {
        return Err(Error::Validation(
            "email, password, name are required".to_owned(),
        ));
    };

    let email = normalize_email(&email)?;
    let password_hash = hash_password(&password)?;
    let role = match data.role {
        Some(role) => Role::parse(&role)?,
        None => Role::User,
    };

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let user = insert_user(&connection, &name, &email, &password_hash, role)?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))).into_response())
}

/// A route handler for editing another user's name, email or role.
pub(crate) async fn update_user_endpoint(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(data): Json<AdminUserData>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let mut user = get_user(&connection, id)?;

    if let Some(name) = data.name {
        let name = name.trim().to_owned();
        if !name.is_empty() {
            user.name = name;
        }
    }
    if let Some(email) = data.email {
        user.email = normalize_email(&email)?;
    }
    if let Some(role) = data.role {
        user.role = Role::parse(&role)?;
    }

    update_user(&connection, &user)?;

    Ok(Json(json!({ "user": user })).into_response())
}

/// The request body for an administrative password reset.
#[derive(Debug, Deserialize)]
pub(crate) struct PasswordResetData {
    password: Option<String>,
}

/// A route handler for resetting another user's password.
///
/// Unlike the self-service password change, no current password is needed.
pub(crate) async fn reset_password_endpoint(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(data): Json<PasswordResetData>,
) -> Result<Response, Error> {
    let Some(password) = data.password else {
        return Err(Error::Validation(
            "Password must be at least 6 characters".to_owned(),
        ));
    };
    let password_hash = hash_password(&password)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    // Resolve first so a missing user is a 404, not a silent no-op.
    let user = get_user(&connection, id)?;
    set_password_hash(&connection, user.id, &password_hash)?;

    Ok(Json(json!({ "success": true })).into_response())
}

/// A route handler for deleting a user together with all of their data.
///
/// The user's transactions go first, then their accounts and categories,
/// then the user row, all in one SQL transaction, so the foreign keys from
/// transactions to accounts and categories never block the delete.
pub(crate) async fn delete_user_endpoint(
    State(state): State<AppState>,
    Extension(acting_user): Extension<AuthUser>,
    Path(id): Path<UserId>,
) -> Result<Response, Error> {
    if id == acting_user.id {
        return Err(Error::Validation("Cannot delete self".to_owned()));
    }

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let sql_transaction = connection.unchecked_transaction()?;

    sql_transaction.execute(
        "DELETE FROM \"transaction\" WHERE user_id = ?1",
        params![id],
    )?;
    sql_transaction.execute("DELETE FROM account WHERE user_id = ?1", params![id])?;
    sql_transaction.execute("DELETE FROM category WHERE user_id = ?1", params![id])?;
    let rows_deleted = sql_transaction.execute("DELETE FROM user WHERE id = ?1", params![id])?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    sql_transaction.commit()?;

    Ok(Json(json!({ "success": true })).into_response())
}

// ============================================================================
// TESTS
// ============================================================================
