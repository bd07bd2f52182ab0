//! The route handler for listing transactions with filters and pagination.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::{params_from_iter, types::Value};
use serde::Deserialize;
use serde_json::json;
use time::Date;

use crate::{
    AppState, Error,
    auth::AuthUser,
    database_id::{AccountId, CategoryId},
    pagination::Pagination,
};

use super::{
    core::{TRANSACTION_COLUMNS, map_transaction_row},
    summary::summarize,
};

/// The query parameters accepted by the transaction list.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionListQuery {
    page: Option<u64>,
    limit: Option<u64>,
    account: Option<AccountId>,
    category: Option<CategoryId>,
    /// Inclusive lower bound on the transaction date.
    #[serde(rename = "dateFrom")]
    date_from: Option<Date>,
    /// Inclusive upper bound on the transaction date.
    #[serde(rename = "dateTo")]
    date_to: Option<Date>,
}

/// A route handler for listing the authenticated user's transactions.
///
/// Transactions are sorted newest first and paged; the response also embeds
/// the overall income/expense summary.
pub(crate) async fn list_transactions_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Response, Error> {
    let pagination = Pagination::new(query.page, query.limit);

    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let mut where_parts = vec!["user_id = ?1".to_owned()];
    let mut parameters = vec![Value::Integer(user.id)];

    if let Some(account_id) = query.account {
        parameters.push(Value::Integer(account_id));
        where_parts.push(format!("account_id = ?{}", parameters.len()));
    }
    if let Some(category_id) = query.category {
        parameters.push(Value::Integer(category_id));
        where_parts.push(format!("category_id = ?{}", parameters.len()));
    }
    if let Some(date_from) = query.date_from {
        parameters.push(Value::Text(date_from.to_string()));
        where_parts.push(format!("date >= ?{}", parameters.len()));
    }
    if let Some(date_to) = query.date_to {
        parameters.push(Value::Text(date_to.to_string()));
        where_parts.push(format!("date <= ?{}", parameters.len()));
    }

    let where_clause = where_parts.join(" AND ");

    let total: u64 = connection
        .prepare(&format!(
            "SELECT COUNT(*) FROM \"transaction\" WHERE {where_clause}"
        ))?
        .query_row(params_from_iter(parameters.iter()), |row| {
            row.get::<_, i64>(0)
        })? as u64;

    // Sort by date, then creation time and ID so the order stays stable
    // between requests.
    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE {where_clause}
             ORDER BY date DESC, created_at DESC, id DESC
             LIMIT {} OFFSET {}",
            pagination.limit,
            pagination.offset(),
        ))?
        .query_map(params_from_iter(parameters.iter()), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect::<Result<Vec<_>, Error>>()?;

    let summary = summarize(&connection, user.id)?;

    Ok(Json(json!({
        "transactions": transactions,
        "total": total,
        "page": pagination.page,
        "pages": pagination.page_count(total),
        "summary": summary,
    }))
    .into_response())
}

#[cfg(test)]
mod list_transactions_endpoint_tests {
    use serde_json::Value;

    use crate::{
        database_id::DatabaseId,
        endpoints,
        test_utils::{
            create_test_account, create_test_category, create_test_transaction_on_date,
            server_with_user,
        },
    };

    use axum_test::TestServer;

    /// One account and one expense category with a handful of transactions
    /// dated 2025-06-01, 2025-06-02, ...
    async fn seed_transactions(
        server: &TestServer,
        token: &str,
        count: usize,
    ) -> (DatabaseId, DatabaseId) {
        let account_id = create_test_account(server, token, "Checking", 10_000.0).await;
        let category_id = create_test_category(server, token, "Groceries", "expense").await;

        for day in 1..=count {
            create_test_transaction_on_date(
                server,
                token,
                account_id,
                category_id,
                10.0,
                &format!("2025-06-{day:02}"),
            )
            .await;
        }

        (account_id, category_id)
    }

    #[tokio::test]
    async fn pages_are_clamped_and_counted() {
        let (server, token) = server_with_user().await;
        seed_transactions(&server, &token, 5).await;

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .add_query_param("page", 2)
            .add_query_param("limit", 2)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["total"], 5);
        assert_eq!(body["page"], 2);
        assert_eq!(body["pages"], 3);
        assert_eq!(body["transactions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sorts_newest_date_first() {
        let (server, token) = server_with_user().await;
        seed_transactions(&server, &token, 3).await;

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .await;

        let body = response.json::<Value>();
        let dates: Vec<&str> = body["transactions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|transaction| transaction["date"].as_str().unwrap())
            .collect();
        assert_eq!(dates, ["2025-06-03", "2025-06-02", "2025-06-01"]);
    }

    #[tokio::test]
    async fn filters_by_account() {
        let (server, token) = server_with_user().await;
        let (_account_a, category_id) = seed_transactions(&server, &token, 2).await;
        let account_b = create_test_account(&server, &token, "Savings", 100.0).await;
        create_test_transaction_on_date(
            &server,
            &token,
            account_b,
            category_id,
            10.0,
            "2025-06-10",
        )
        .await;

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .add_query_param("account", account_b)
            .await;

        let body = response.json::<Value>();
        assert_eq!(body["total"], 1);
        assert_eq!(body["transactions"][0]["account"], account_b);

        // The unfiltered list still sees all three.
        let body = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .await
            .json::<Value>();
        assert_eq!(body["total"], 3);
    }

    #[tokio::test]
    async fn date_range_bounds_are_inclusive() {
        let (server, token) = server_with_user().await;
        seed_transactions(&server, &token, 4).await;

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .add_query_param("dateFrom", "2025-06-02")
            .add_query_param("dateTo", "2025-06-03")
            .await;

        let body = response.json::<Value>();
        assert_eq!(body["total"], 2);
        let dates: Vec<&str> = body["transactions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|transaction| transaction["date"].as_str().unwrap())
            .collect();
        assert_eq!(dates, ["2025-06-03", "2025-06-02"]);
    }

    #[tokio::test]
    async fn embeds_the_summary() {
        let (server, token) = server_with_user().await;
        seed_transactions(&server, &token, 3).await;

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .await;

        let body = response.json::<Value>();
        assert_eq!(body["summary"]["expense"], 30.0);
        assert_eq!(body["summary"]["income"], 0.0);
        assert_eq!(body["summary"]["byCategory"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_list_has_zero_pages() {
        let (server, token) = server_with_user().await;

        let response = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["total"], 0);
        assert_eq!(body["pages"], 0);
        assert!(body["transactions"].as_array().unwrap().is_empty());
    }
}
