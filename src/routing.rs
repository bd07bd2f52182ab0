//! Application router configuration with public, protected and admin route
//! groups.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    account::{
        create_account_endpoint, delete_account_endpoint, list_accounts_endpoint,
        update_account_endpoint,
    },
    admin,
    auth::{admin_guard, auth_guard, log_in_endpoint, register_endpoint},
    category::{
        create_category_endpoint, delete_category_endpoint, list_categories_endpoint,
        update_category_endpoint,
    },
    endpoints,
    logging::logging_middleware,
    transaction::{
        analytics_endpoint, create_transaction_endpoint, delete_transaction_endpoint,
        get_transaction_endpoint, list_transactions_endpoint, update_transaction_endpoint,
    },
    user::{change_password_endpoint, get_me_endpoint, update_me_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER, post(register_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint));

    let protected_routes = Router::new()
        .route(endpoints::ME, get(get_me_endpoint).put(update_me_endpoint))
        .route(endpoints::CHANGE_PASSWORD, put(change_password_endpoint))
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            put(update_account_endpoint).delete(delete_account_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(endpoints::TRANSACTION_ANALYTICS, get(analytics_endpoint))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // The admin guard must run after the auth guard, which means it is the
    // inner of the two layers.
    let admin_routes = Router::new()
        .route(endpoints::USERS, get(admin::list_users_endpoint))
        .route(
            endpoints::ADMIN_USERS,
            get(admin::list_users_endpoint).post(admin::create_user_endpoint),
        )
        .route(
            endpoints::ADMIN_USER,
            put(admin::update_user_endpoint).delete(admin::delete_user_endpoint),
        )
        .route(
            endpoints::ADMIN_USER_PASSWORD,
            put(admin::reset_password_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), admin_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    public_routes
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(logging_middleware))
        .fallback(get_not_found)
        .with_state(state)
}

/// The health check: reports that the server is up.
async fn get_health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// The fallback for paths that match no route.
async fn get_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
