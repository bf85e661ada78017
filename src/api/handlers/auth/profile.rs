//! Authenticated self-service profile endpoint.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::session::require_account;
use super::state::AuthState;
use super::types::ProfileResponse;

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The authenticated account's profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid bearer token", body = String)
    ),
    tag = "auth"
)]
pub async fn profile(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let account = match require_account(&headers, &pool, &auth_state).await {
        Ok(account) => account,
        Err(err) => return err.into_response(),
    };

    let response = ProfileResponse {
        id: account.id.to_string(),
        username: account.username,
        email: account.email,
        chef_star_name: account.chef_star_name,
        age_group: account
            .age_group
            .map(|group| group.as_str().to_string()),
        parent_email: account.parent_email,
        is_email_verified: account.is_email_verified,
        is_parent_approved: account.is_parent_approved,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::super::state::test_support::auth_state;
    use super::profile;
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn profile_requires_bearer() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = profile(HeaderMap::new(), Extension(pool), Extension(auth_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
