//! Login: credential check gated on the derived activation state.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::account::AccountState;
use super::error::AuthError;
use super::password::verify_password;
use super::state::AuthState;
use super::storage;
use super::tokens::credentials_response;
use super::types::{CredentialsResponse, LoginRequest};
use super::utils::normalize_email;

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = CredentialsResponse),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 403, description = "Email unverified or parent approval pending", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match handle_login(&pool, &auth_state, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_login(
    pool: &PgPool,
    state: &AuthState,
    request: LoginRequest,
) -> Result<CredentialsResponse, AuthError> {
    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::BadRequest("email and password required"));
    }

    // Unknown email and wrong password take the same exit so the response
    // never reveals which half was wrong.
    let Some(account) = storage::lookup_by_email(pool, &normalize_email(email)).await? else {
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(&account.password_hash, password) {
        return Err(AuthError::InvalidCredentials);
    }

    match account.state() {
        AccountState::Unverified => Err(AuthError::EmailNotVerified),
        AccountState::VerifiedUnapproved => Err(AuthError::ParentApprovalRequired),
        AccountState::Active => {
            info!(account_id = %account.id, "login");
            Ok(credentials_response(pool, state, &account).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::test_support::auth_state;
    use super::super::types::LoginRequest;
    use super::login;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn login_missing_fields() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = LoginRequest {
            email: Some("kid@x.com".to_string()),
            password: None,
        };
        let response = login(Extension(pool), Extension(auth_state()), Some(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
