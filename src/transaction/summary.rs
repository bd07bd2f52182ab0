//! The income/expense summary across all of a user's transactions.
//!
//! The summary is a full aggregation over the transaction table, not a
//! running counter, so it is always consistent with the stored history.

use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::{
    AppState, Error,
    auth::AuthUser,
    category::CategoryType,
    database_id::{CategoryId, UserId},
};

/// The summed amount of one category's transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CategorySummary {
    /// The ID of the category.
    #[serde(rename = "categoryId")]
    pub category_id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// The polarity the category's transactions were recorded with.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    /// The sum of the transaction amounts in this category.
    pub total: f64,
}

/// Grand totals and a per-category breakdown of a user's transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Summary {
    /// The sum of all income transaction amounts.
    pub income: f64,
    /// The sum of all expense transaction amounts.
    pub expense: f64,
    /// Per-category totals. Categories without transactions do not appear.
    #[serde(rename = "byCategory")]
    pub by_category: Vec<CategorySummary>,
}

/// Compute the income/expense totals and per-category breakdown for
/// `user_id`.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub(crate) fn summarize(connection: &Connection, user_id: UserId) -> Result<Summary, Error> {
    let mut income = 0.0;
    let mut expense = 0.0;

    let mut statement = connection.prepare(
        "SELECT type, SUM(amount) FROM \"transaction\" WHERE user_id = ?1 GROUP BY type",
    )?;
    let totals = statement.query_map(params![user_id], |row| {
        Ok((row.get::<_, CategoryType>(0)?, row.get::<_, f64>(1)?))
    })?;

    for maybe_total in totals {
        let (kind, total) = maybe_total?;
        match kind {
            CategoryType::Income => income = total,
            CategoryType::Expense => expense = total,
        }
    }

    // The type column comes from the transactions, not the category, so a
    // category whose polarity was edited mid-history is reported with the
    // polarity its transactions were actually recorded under.
    let by_category = connection
        .prepare(
            "SELECT category.id, category.name, \"transaction\".type,
                    SUM(\"transaction\".amount)
             FROM \"transaction\"
             JOIN category ON category.id = \"transaction\".category_id
             WHERE \"transaction\".user_id = ?1
             GROUP BY category.id",
        )?
        .query_map(params![user_id], |row| {
            Ok(CategorySummary {
                category_id: row.get(0)?,
                name: row.get(1)?,
                kind: row.get(2)?,
                total: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Summary {
        income,
        expense,
        by_category,
    })
}

/// A route handler for the analytics endpoint: the summary on its own.
pub(crate) async fn analytics_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let summary = summarize(&connection, user.id)?;

    Ok(Json(summary).into_response())
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod analytics_endpoint_tests {
    use serde_json::Value;

    use crate::{
        endpoints,
        test_utils::{
            create_test_account, create_test_category, create_test_transaction, server_with_user,
        },
    };

    #[tokio::test]
    async fn returns_totals_and_breakdown() {
        let (server, token) = server_with_user().await;
        let account_id = create_test_account(&server, &token, "Checking", 1000.0).await;
        let wages = create_test_category(&server, &token, "Wages", "income").await;
        let food = create_test_category(&server, &token, "Food", "expense").await;
        create_test_transaction(&server, &token, account_id, wages, 500.0).await;
        create_test_transaction(&server, &token, account_id, food, 75.0).await;

        let response = server
            .get(endpoints::TRANSACTION_ANALYTICS)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["income"], 500.0);
        assert_eq!(body["expense"], 75.0);
        assert_eq!(body["byCategory"].as_array().unwrap().len(), 2);
    }
}
