//! Issuing and decoding the JSON Web Tokens used for bearer auth.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::database_id::UserId;

/// How long an issued auth token stays valid.
pub(crate) const DEFAULT_TOKEN_DURATION: Duration = Duration::hours(1);

/// The contents of a JSON Web Token.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// The ID of the authenticated user.
    pub sub: UserId,
    /// The time the token was issued, as a unix timestamp.
    pub iat: i64,
    /// The expiry time of the token, as a unix timestamp.
    pub exp: i64,
}

/// Create a signed token for `user_id` that expires after `duration`.
pub(crate) fn issue_token(
    user_id: UserId,
    duration: Duration,
    encoding_key: &EncodingKey,
) -> Result<String, super::AuthError> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id,
        iat: now.unix_timestamp(),
        exp: (now + duration).unix_timestamp(),
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|error| {
        tracing::error!("Could not create auth token: {}", error);
        super::AuthError::TokenCreation
    })
}

/// Decode and verify a bearer token, returning its claims.
///
/// Fails if the signature does not match or the token has expired.
pub(crate) fn decode_token(
    token: &str,
    decoding_key: &DecodingKey,
) -> Result<Claims, super::AuthError> {
    decode::<Claims>(token, decoding_key, &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(|_| super::AuthError::InvalidToken)
}
