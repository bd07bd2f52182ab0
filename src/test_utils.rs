//! Shared helpers for endpoint tests: an in-memory server, a registered
//! user and fixture data.

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{AppState, build_router, database_id::DatabaseId, endpoints};

/// The email the standard test user registers with.
pub(crate) const TEST_EMAIL: &str = "test@example.com";
/// The password the standard test user registers with.
pub(crate) const TEST_PASSWORD: &str = "averysafepassword";

/// Create an [AppState] backed by a fresh in-memory database.
pub(crate) fn test_state() -> AppState {
    let connection = Connection::open_in_memory().expect("Could not open database in memory");

    AppState::new(connection, "test-secret").expect("Could not create test app state")
}

/// Create a test server with no registered users.
pub(crate) async fn test_server() -> TestServer {
    TestServer::new(build_router(test_state()))
}

async fn register(server: &TestServer, email: &str) -> String {
    let response = server
        .post(endpoints::REGISTER)
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": TEST_PASSWORD,
        }))
        .await;

    response.json::<Value>()["token"]
        .as_str()
        .expect("register response should carry a token")
        .to_owned()
}

/// Create a test server with one registered user, returning their bearer
/// token.
pub(crate) async fn server_with_user() -> (TestServer, String) {
    let server = test_server().await;
    let token = register(&server, TEST_EMAIL).await;

    (server, token)
}

/// Create a test server with one administrator, returning their bearer
/// token.
pub(crate) async fn server_with_admin() -> (TestServer, String) {
    let state = test_state();
    let server = TestServer::new(build_router(state.clone()));
    let token = register(&server, TEST_EMAIL).await;

    state
        .db_connection
        .lock()
        .unwrap()
        .execute(
            "UPDATE user SET role = 'admin' WHERE email = ?1",
            [TEST_EMAIL],
        )
        .expect("Could not promote test user to admin");

    (server, token)
}

/// Create an account through the API and return its ID.
pub(crate) async fn create_test_account(
    server: &TestServer,
    token: &str,
    name: &str,
    balance: f64,
) -> DatabaseId {
    let response = server
        .post(endpoints::ACCOUNTS)
        .authorization_bearer(token)
        .json(&json!({ "name": name, "type": "card", "balance": balance }))
        .await;

    response.json::<Value>()["account"]["id"]
        .as_i64()
        .expect("create account response should carry an id")
}

/// Create a category through the API and return its ID.
pub(crate) async fn create_test_category(
    server: &TestServer,
    token: &str,
    name: &str,
    kind: &str,
) -> DatabaseId {
    let response = server
        .post(endpoints::CATEGORIES)
        .authorization_bearer(token)
        .json(&json!({ "name": name, "type": kind }))
        .await;

    response.json::<Value>()["category"]["id"]
        .as_i64()
        .expect("create category response should carry an id")
}

/// Record a transaction through the API and return its JSON representation.
pub(crate) async fn create_test_transaction(
    server: &TestServer,
    token: &str,
    account_id: DatabaseId,
    category_id: DatabaseId,
    amount: f64,
) -> Value {
    create_test_transaction_on_date(server, token, account_id, category_id, amount, "2025-06-15")
        .await
}

/// Record a transaction on a specific date through the API and return its
/// JSON representation.
pub(crate) async fn create_test_transaction_on_date(
    server: &TestServer,
    token: &str,
    account_id: DatabaseId,
    category_id: DatabaseId,
    amount: f64,
    date: &str,
) -> Value {
    let response = server
        .post(endpoints::TRANSACTIONS)
        .authorization_bearer(token)
        .json(&json!({
            "account": account_id,
            "category": category_id,
            "amount": amount,
            "date": date,
        }))
        .await;

    let transaction = response.json::<Value>()["transaction"].clone();
    assert!(
        transaction.is_object(),
        "could not create test transaction: {}",
        response.text()
    );

    transaction
}

/// Look up an account's current balance through the API.
pub(crate) async fn get_account_balance(
    server: &TestServer,
    token: &str,
    account_id: DatabaseId,
) -> f64 {
    let response = server
        .get(endpoints::ACCOUNTS)
        .authorization_bearer(token)
        .await;

    response.json::<Value>()["accounts"]
        .as_array()
        .expect("account list response should carry accounts")
        .iter()
        .find(|account| account["id"].as_i64() == Some(account_id))
        .expect("account should exist")["balance"]
        .as_f64()
        .expect("account balance should be a number")
}
