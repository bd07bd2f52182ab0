//! The API endpoint URIs.
//!
//! For endpoints that take a path parameter, e.g., `/api/accounts/{id}`,
//! use [format_endpoint].

use crate::database_id::DatabaseId;

/// The health check route.
pub const HEALTH: &str = "/health";
/// The route for registering new users.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in a user and issuing an auth token.
pub const LOG_IN: &str = "/api/auth/login";
/// The route for the authenticated user's own profile.
pub const ME: &str = "/api/users/me";
/// The route for the authenticated user to change their password.
pub const CHANGE_PASSWORD: &str = "/api/users/change-password";
/// The route for listing all users (admin only).
pub const USERS: &str = "/api/users";
/// The route for administrative user management.
pub const ADMIN_USERS: &str = "/api/admin/users";
/// The route to a single user under administrative management.
pub const ADMIN_USER: &str = "/api/admin/users/{id}";
/// The route for an administrative password reset.
pub const ADMIN_USER_PASSWORD: &str = "/api/admin/users/{id}/password";
/// The route to access the authenticated user's accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to access a single account.
pub const ACCOUNT: &str = "/api/accounts/{id}";
/// The route to access the authenticated user's categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to access a single category.
pub const CATEGORY: &str = "/api/categories/{id}";
/// The route to access the authenticated user's transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{id}";
/// The route for the income/expense summary across all transactions.
pub const TRANSACTION_ANALYTICS: &str = "/api/transactions/analytics";

/// Replace the path parameter in `endpoint_path` with `id`.
///
/// This function assumes that an endpoint path will only have a single
/// parameter, and will only replace the first one.
pub fn format_endpoint(endpoint_path: &str, id: DatabaseId) -> String {
    match (endpoint_path.find('{'), endpoint_path.find('}')) {
        (Some(start), Some(end)) if start < end => format!(
            "{}{}{}",
            &endpoint_path[..start],
            id,
            &endpoint_path[end + 1..]
        ),
        _ => endpoint_path.to_owned(),
    }
}
