//! This file defines the `Category` type and the API routes for managing
//! categories. A category classifies transactions as either income or
//! expense; the classification is copied onto each transaction when it is
//! recorded, so editing a category's type later does not rewrite history.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{
    Connection, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    auth::AuthUser,
    database_id::{CategoryId, UserId},
};

/// Whether transactions in a category add to or subtract from an account's
/// balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    /// Transactions in this category increase the account balance.
    Income,
    /// Transactions in this category decrease the account balance.
    Expense,
}

impl CategoryType {
    /// The lowercase text form stored in the database and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
        }
    }

    /// Parse a category type from user input.
    ///
    /// Leading/trailing whitespace and letter case are ignored.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `text` is neither "income" nor
    /// "expense".
    pub fn parse(text: &str) -> Result<Self, Error> {
        match text.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            _ => Err(Error::Validation(
                "Type must be income or expense".to_owned(),
            )),
        }
    }
}

impl ToSql for CategoryType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CategoryType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|text| CategoryType::parse(text).map_err(|_| FromSqlError::InvalidType))
    }
}

/// A user-defined classification for transactions, e.g., 'Groceries',
/// 'Wages'.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The ID of the user that owns the category.
    #[serde(rename = "user")]
    pub user_id: UserId,
    /// The display name of the category.
    pub name: String,
    /// Whether the category records income or expenses.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// A free-form note.
    pub comment: String,
    /// When the category was created.
    #[serde(rename = "createdAt")]
    pub created_at: OffsetDateTime,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub(crate) fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                comment TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Category].
pub(crate) fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Create a new category owned by `user_id`.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn insert_category(
    connection: &Connection,
    user_id: UserId,
    name: &str,
    kind: CategoryType,
    comment: &str,
) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO category (user_id, name, type, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, name, kind, comment, created_at],
    )?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        user_id,
        name: name.to_owned(),
        kind,
        comment: comment.to_owned(),
        created_at,
    })
}

/// Retrieve the category `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or belongs to another
///   user,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn get_category(
    connection: &Connection,
    id: CategoryId,
    user_id: UserId,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, type, comment, created_at FROM category
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row(params![id, user_id], map_category_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories owned by `user_id`, newest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn list_categories(
    connection: &Connection,
    user_id: UserId,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, type, comment, created_at FROM category
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?
        .query_map(params![user_id], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Persist changed fields of `category`.
pub(crate) fn update_category(connection: &Connection, category: &Category) -> Result<(), Error> {
    connection.execute(
        "UPDATE category SET name = ?1, type = ?2, comment = ?3 WHERE id = ?4",
        params![category.name, category.kind, category.comment, category.id],
    )?;

    Ok(())
}

/// Delete the category `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the category does not exist or belongs to another
///   user,
/// - [Error::CategoryInUse] if transactions still reference the category,
/// - or [Error::SqlError] if there is some other SQL error.
pub(crate) fn delete_category(
    connection: &Connection,
    id: CategoryId,
    user_id: UserId,
) -> Result<(), Error> {
    let rows_deleted = connection
        .execute(
            "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::CategoryInUse,
            error => error.into(),
        })?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// The request body for creating or updating a category.
#[derive(Debug, Deserialize)]
pub(crate) struct CategoryData {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    comment: Option<String>,
}

/// A route handler for listing the authenticated user's categories.
pub(crate) async fn list_categories_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let categories = list_categories(&connection, user.id)?;

    Ok(Json(json!({ "categories": categories })).into_response())
}

/// A route handler for creating a new category.
pub(crate) async fn create_category_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(data): Json<CategoryData>,
) -> Result<Response, Error> {
    let name = data
        .name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty());
    let kind = data.kind.filter(|kind| !kind.trim().is_empty());

    let (Some(name), Some(kind)) = (name, kind) else {
        return Err(Error::Validation("Name and type are required".to_owned()));
    };
    let kind = CategoryType::parse(&kind)?;

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let category = insert_category(
        &connection,
        user.id,
        &name,
        kind,
        data.comment.as_deref().unwrap_or(""),
    )?;

    Ok((StatusCode::CREATED, Json(json!({ "category": category }))).into_response())
}

/// A route handler for updating a category.
///
/// Changing the category's type only affects transactions recorded after
/// the change.
pub(crate) async fn update_category_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<CategoryId>,
    Json(data): Json<CategoryData>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let mut category = get_category(&connection, id, user.id)?;

    if let Some(name) = data.name {
        let name = name.trim().to_owned();
        if !name.is_empty() {
            category.name = name;
        }
    }
    if let Some(kind) = data.kind {
        category.kind = CategoryType::parse(&kind)?;
    }
    if let Some(comment) = data.comment {
        category.comment = comment;
    }

    update_category(&connection, &category)?;

    Ok(Json(json!({ "category": category })).into_response())
}

/// A route handler for deleting a category.
pub(crate) async fn delete_category_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<CategoryId>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    delete_category(&connection, id, user.id)?;

    Ok(Json(json!({ "success": true })).into_response())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod category_type_tests {
    use crate::Error;

    use super::CategoryType;

    #[test]
    fn parse_accepts_both_polarities() {
        assert_eq!(CategoryType::parse("income"), Ok(CategoryType::Income));
        assert_eq!(CategoryType::parse("expense"), Ok(CategoryType::Expense));
    }

    #[test]
    fn parse_normalises_case_and_whitespace() {
        assert_eq!(CategoryType::parse(" Income "), Ok(CategoryType::Income));
        assert_eq!(CategoryType::parse("EXPENSE"), Ok(CategoryType::Expense));
    }

    #[test]
    fn parse_rejects_unknown_type() {
        assert_eq!(
            CategoryType::parse("transfer"),
            Err(Error::Validation(
                "Type must be income or expense".to_owned()
            ))
        );
    }
}
