//! Bearer authentication for the child-facing endpoints.

use axum::http::HeaderMap;
use sqlx::PgPool;
use uuid::Uuid;

use super::account::Account;
use super::error::AuthError;
use super::state::AuthState;
use super::storage;
use super::utils::extract_bearer_token;

/// Resolve the `Authorization` header into an account.
///
/// Accepts either the opaque bearer token handed out at login or a signed
/// access token; both resolve to the same account record.
///
/// # Errors
/// Returns [`AuthError::Unauthorized`] when the header is missing or no
/// account matches the presented token.
pub(super) async fn require_account(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Account, AuthError> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(AuthError::Unauthorized);
    };

    if let Some(account) = storage::lookup_by_bearer_token(pool, &token).await? {
        return Ok(account);
    }

    // Not an opaque token; it may be a signed access token.
    let Ok(claims) = state.tokens().verify_access(&token) else {
        return Err(AuthError::Unauthorized);
    };
    let Ok(account_id) = Uuid::parse_str(&claims.sub) else {
        return Err(AuthError::Unauthorized);
    };

    match storage::lookup_by_id(pool, account_id).await? {
        Some(account) => Ok(account),
        None => Err(AuthError::Unauthorized),
    }
}
