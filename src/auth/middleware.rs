//! Middleware that authenticates requests from their bearer token.

use axum::{
    RequestPartsExt,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, Error, database_id::UserId, user};

use super::{AuthError, decode_token};

/// The authenticated user, placed into the request extensions by
/// [auth_guard].
///
/// Route handlers receive it with `Extension(user): Extension<AuthUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AuthUser {
    /// The ID of the authenticated user.
    pub id: UserId,
}

/// Middleware function that checks for a valid bearer token.
///
/// The user ID from the token is placed into the request and the request
/// executed normally if the token is valid, otherwise a 401 response is
/// returned.
pub(crate) async fn auth_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let bearer = match parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
    {
        Ok(TypedHeader(Authorization(bearer))) => bearer,
        Err(_) => return AuthError::MissingToken.into_response(),
    };

    match decode_token(bearer.token(), state.decoding_key()) {
        Ok(claims) => {
            parts.extensions.insert(AuthUser { id: claims.sub });
            let request = Request::from_parts(parts, body);

            next.run(request).await
        }
        Err(error) => error.into_response(),
    }
}

/// Middleware function that restricts a route to administrators.
///
/// Must run after [auth_guard]; reads the authenticated user from the
/// request extensions and checks their stored role.
pub(crate) async fn admin_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth_user) = request.extensions().get::<AuthUser>().copied() else {
        return AuthError::MissingToken.into_response();
    };

    let is_admin = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLock.into_response(),
        };

        match user::get_user(&connection, auth_user.id) {
            Ok(record) => record.role == user::Role::Admin,
            Err(_) => false,
        }
    };

    if is_admin {
        next.run(request).await
    } else {
        AuthError::Forbidden.into_response()
    }
}
