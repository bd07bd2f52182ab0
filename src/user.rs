//! This file defines the `User` type, its database queries and the API
//! routes for the authenticated user's own profile.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use bcrypt::{DEFAULT_COST, hash, verify};
use email_address::EmailAddress;
use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::{AppState, Error, auth::AuthUser, database_id::UserId};

/// The minimum number of characters for a password.
pub(crate) const MIN_PASSWORD_LENGTH: usize = 6;

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A regular user managing their own finances.
    User,
    /// An administrator who can also manage other users.
    Admin,
}

impl Role {
    /// The lowercase text form stored in the database and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a role from user input.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `text` is neither "user" nor "admin".
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::Validation("Role must be user or admin".to_owned())),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|text| Role::parse(text).map_err(|_| FromSqlError::InvalidType))
    }
}

/// A registered user of the application.
///
/// The password hash is never serialized into responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The ID of the user.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// The user's email address, unique across the application.
    pub email: String,
    /// What the user is allowed to do.
    pub role: Role,
    /// The bcrypt hash of the user's password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the user registered.
    #[serde(rename = "createdAt")]
    pub created_at: OffsetDateTime,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the user table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub(crate) fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [User].
pub(crate) fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const USER_COLUMNS: &str = "id, name, email, role, password_hash, created_at";

/// Create a new user.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn insert_user(
    connection: &Connection,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO user (name, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, email, password_hash, role, created_at],
        )
        .map_err(map_duplicate_email)?;

    Ok(User {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        email: email.to_owned(),
        role,
        password_hash: password_hash.to_owned(),
        created_at,
    })
}

/// Retrieve a user by their `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid user,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn get_user(connection: &Connection, id: UserId) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = ?1"))?
        .query_row(params![id], map_user_row)
        .map_err(|error| error.into())
}

/// Retrieve a user by their email address.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if no user has registered with `email`,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn get_user_by_email(connection: &Connection, email: &str) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE email = ?1"))?
        .query_row(params![email], map_user_row)
        .map_err(|error| error.into())
}

/// Retrieve all registered users.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn list_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user ORDER BY id ASC"))?
        .query_map([], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Persist a user's name, email and role.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if the email is registered to another user,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn update_user(connection: &Connection, user: &User) -> Result<(), Error> {
    connection
        .execute(
            "UPDATE user SET name = ?1, email = ?2, role = ?3 WHERE id = ?4",
            params![user.name, user.email, user.role, user.id],
        )
        .map_err(map_duplicate_email)?;

    Ok(())
}

/// Overwrite a user's password hash.
pub(crate) fn set_password_hash(
    connection: &Connection,
    id: UserId,
    password_hash: &str,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE user SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, id],
    )?;

    Ok(())
}

fn map_duplicate_email(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && desc.contains("user.email") =>
        {
            Error::DuplicateEmail
        }
        error => error.into(),
    }
}

/// Hash a password for storage.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the password is shorter than
///   [MIN_PASSWORD_LENGTH],
/// - or [Error::HashingError] if the hashing library fails.
pub(crate) fn hash_password(password: &str) -> Result<String, Error> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(Error::Validation(
            "Password must be at least 6 characters".to_owned(),
        ));
    }

    hash(password, DEFAULT_COST).map_err(|error| Error::HashingError(error.to_string()))
}

/// Normalise and validate an email address for storage.
///
/// # Errors
/// Returns [Error::Validation] if the address is not a valid email.
pub(crate) fn normalize_email(email: &str) -> Result<String, Error> {
    let email = email.trim().to_ascii_lowercase();

    EmailAddress::from_str(&email)
        .map(|_| email)
        .map_err(|_| Error::Validation("Invalid email address".to_owned()))
}

/// Insert a user with a placeholder password hash, for tests that do not go
/// through the register endpoint.
#[cfg(test)]
pub(crate) fn insert_test_user(connection: &Connection, email: &str) -> UserId {
    insert_user(connection, "Test User", email, "not-a-real-hash", Role::User)
        .expect("Could not insert test user")
        .id
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler for fetching the authenticated user's profile.
pub(crate) async fn get_me_endpoint(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let user = get_user(&connection, auth_user.id)?;

    Ok(Json(json!({ "user": user })).into_response())
}

/// The request body for updating the authenticated user's profile.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileData {
    name: Option<String>,
    email: Option<String>,
}

/// A route handler for updating the authenticated user's profile.
pub(crate) async fn update_me_endpoint(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(data): Json<ProfileData>,
) -> Result<Response, Error> {
    let (Some(name), Some(email)) = (data.name, data.email) else {
        return Err(Error::Validation("Name and email are required".to_owned()));
    };
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(Error::Validation("Name and email are required".to_owned()));
    }
    let email = normalize_email(&email)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let mut user = get_user(&connection, auth_user.id)?;
    user.name = name;
    user.email = email;

    update_user(&connection, &user)?;

    Ok(Json(json!({ "user": user })).into_response())
}

/// The request body for a password change.
#[derive(Debug, Deserialize)]
pub(crate) struct PasswordChangeData {
    #[serde(rename = "currentPassword")]
    current_password: Option<String>,
    #[serde(rename = "newPassword")]
    new_password: Option<String>,
}

/// A route handler for changing the authenticated user's password.
///
/// The current password must be supplied and verify against the stored
/// hash before the new one is accepted.
pub(crate) async fn change_password_endpoint(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(data): Json<PasswordChangeData>,
) -> Result<Response, Error> {
    let (Some(current_password), Some(new_password)) = (data.current_password, data.new_password)
    else {
        return Err(Error::Validation(
            "Current and new password are required".to_owned(),
        ));
    };

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let user = get_user(&connection, auth_user.id)?;

    let password_matches = verify(&current_password, &user.password_hash)
        .map_err(|error| Error::HashingError(error.to_string()))?;
    if !password_matches {
        return Err(Error::Validation("Current password is incorrect".to_owned()));
    }

    let new_hash = hash_password(&new_password)?;
    set_password_hash(&connection, user.id, &new_hash)?;

    Ok(Json(json!({ "success": true })).into_response())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod user_query_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{Role, get_user_by_email, insert_user, update_user};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_select_by_email() {
        let conn = get_test_connection();

        let inserted = insert_user(&conn, "Alice", "alice@example.com", "hash", Role::User)
            .expect("Could not insert user");

        let selected = get_user_by_email(&conn, "alice@example.com").unwrap();

        assert_eq!(inserted, selected);
    }

    #[test]
    fn insert_fails_on_duplicate_email() {
        let conn = get_test_connection();
        insert_user(&conn, "Alice", "alice@example.com", "hash", Role::User).unwrap();

        let duplicate = insert_user(&conn, "Bob", "alice@example.com", "hash2", Role::User);

        assert_eq!(duplicate, Err(Error::DuplicateEmail));
    }

    #[test]
    fn update_fails_on_email_taken_by_another_user() {
        let conn = get_test_connection();
        insert_user(&conn, "Alice", "alice@example.com", "hash", Role::User).unwrap();
        let mut bob = insert_user(&conn, "Bob", "bob@example.com", "hash2", Role::User).unwrap();

        bob.email = "alice@example.com".to_owned();

        assert_eq!(update_user(&conn, &bob), Err(Error::DuplicateEmail));
    }
}


#[cfg(test)]
mod profile_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        test_utils::{TEST_EMAIL, TEST_PASSWORD, server_with_user, test_server},
    };

    #[tokio::test]
    async fn get_me_returns_profile_without_password() {
        let (server, token) = server_with_user().await;

        let response = server.get(endpoints::ME).authorization_bearer(&token).await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["user"]["email"], TEST_EMAIL);
        assert_eq!(body["user"]["role"], "user");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn update_me_changes_name_and_email() {
        let (server, token) = server_with_user().await;

        let response = server
            .put(endpoints::ME)
            .authorization_bearer(&token)
            .json(&json!({ "name": "New Name", "email": "new@example.com" }))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["user"]["name"], "New Name");
        assert_eq!(body["user"]["email"], "new@example.com");
    }

    #[tokio::test]
    async fn update_me_rejects_taken_email() {
        let server = test_server().await;

        server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "First",
                "email": "taken@example.com",
                "password": TEST_PASSWORD,
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let token = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "Second",
                "email": "second@example.com",
                "password": TEST_PASSWORD,
            }))
            .await
            .json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = server
            .put(endpoints::ME)
            .authorization_bearer(&token)
            .json(&json!({ "name": "Second", "email": "taken@example.com" }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["error"], "Email already in use");
    }

    #[tokio::test]
    async fn change_password_then_log_in_with_new_password() {
        let (server, token) = server_with_user().await;

        server
            .put(endpoints::CHANGE_PASSWORD)
            .authorization_bearer(&token)
            .json(&json!({
                "currentPassword": TEST_PASSWORD,
                "newPassword": "an even safer password",
            }))
            .await
            .assert_status_ok();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": TEST_EMAIL, "password": "an even safer password" }))
            .await
            .assert_status_ok();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_rejects_wrong_current_password() {
        let (server, token) = server_with_user().await;

        let response = server
            .put(endpoints::CHANGE_PASSWORD)
            .authorization_bearer(&token)
            .json(&json!({
                "currentPassword": "definitely wrong",
                "newPassword": "an even safer password",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"],
            "Current password is incorrect"
        );
    }
}
