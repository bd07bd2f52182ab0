//! The route handler for deleting a transaction.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, Error, auth::AuthUser, balance, database_id::TransactionId};

use super::core::{delete_transaction, get_transaction};

/// A route handler for deleting a transaction.
///
/// Restores the account's balance to the transaction's recorded
/// `balance_before`, then removes the record. Both writes run in one SQL
/// transaction.
pub(crate) async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TransactionId>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;
    let sql_transaction = connection.unchecked_transaction()?;

    let transaction = get_transaction(&sql_transaction, id, user.id)?;

    balance::restore(
        &sql_transaction,
        transaction.account_id,
        transaction.balance_before,
    )?;
    delete_transaction(&sql_transaction, transaction.id, user.id)?;

    sql_transaction.commit()?;

    Ok(Json(json!({ "success": true })).into_response())
}

#[cfg(test)]
mod delete_transaction_endpoint_tests {
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        test_utils::{
            create_test_account, create_test_category, create_test_transaction,
            get_account_balance, server_with_user,
        },
    };

    #[tokio::test]
    async fn create_then_delete_restores_the_balance() {
        let (server, token) = server_with_user().await;
        let account_id = create_test_account(&server, &token, "Checking", 100.0).await;
        let category_id = create_test_category(&server, &token, "Groceries", "expense").await;
        let transaction =
            create_test_transaction(&server, &token, account_id, category_id, 30.0).await;
        assert_eq!(get_account_balance(&server, &token, account_id).await, 70.0);

        let response = server
            .delete(&format_endpoint(
                endpoints::TRANSACTION,
                transaction["id"].as_i64().unwrap(),
            ))
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["success"], true);
        assert_eq!(
            get_account_balance(&server, &token, account_id).await,
            100.0
        );
    }

    #[tokio::test]
    async fn deleting_an_income_rolls_the_balance_back_down() {
        let (server, token) = server_with_user().await;
        let account_id = create_test_account(&server, &token, "Checking", 50.0).await;
        let category_id = create_test_category(&server, &token, "Wages", "income").await;
        let transaction =
            create_test_transaction(&server, &token, account_id, category_id, 20.0).await;
        assert_eq!(get_account_balance(&server, &token, account_id).await, 70.0);

        server
            .delete(&format_endpoint(
                endpoints::TRANSACTION,
                transaction["id"].as_i64().unwrap(),
            ))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        assert_eq!(get_account_balance(&server, &token, account_id).await, 50.0);
    }

    #[tokio::test]
    async fn deleting_a_missing_transaction_returns_not_found() {
        let (server, token) = server_with_user().await;

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, 999))
            .authorization_bearer(&token)
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn another_users_transaction_is_invisible() {
        let (server, token) = server_with_user().await;
        let account_id = create_test_account(&server, &token, "Checking", 100.0).await;
        let category_id = create_test_category(&server, &token, "Groceries", "expense").await;
        let transaction =
            create_test_transaction(&server, &token, account_id, category_id, 30.0).await;

        // A second user must not be able to delete the first user's
        // transaction.
        let other_token = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "Other",
                "email": "other@example.com",
                "password": "averysafepassword",
            }))
            .await
            .json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_owned();

        let response = server
            .delete(&format_endpoint(
                endpoints::TRANSACTION,
                transaction["id"].as_i64().unwrap(),
            ))
            .authorization_bearer(&other_token)
            .await;

        response.assert_status_not_found();
        assert_eq!(get_account_balance(&server, &token, account_id).await, 70.0);
    }
}
