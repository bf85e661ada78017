//! Account registration: validate, persist, issue the first code.

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::account::AgeGroup;
use super::error::AuthError;
use super::password::hash_password;
use super::state::AuthState;
use super::storage::{self, InsertOutcome, NewAccount};
use super::types::{RegisterRequest, RegisterResponse};
use super::utils::{normalize_email, username_candidate, valid_email};
use super::verification::issue_and_send_code;

const EMAIL_REQUIRED: &str = "This field is required.";
const EMAIL_INVALID: &str = "Enter a valid email address.";
const EMAIL_TAKEN: &str = "A user with that email already exists";
const USERNAME_TAKEN: &str = "A user with that username already exists.";
const PASSWORD_REQUIRED: &str = "This field is required.";
const PASSWORD_MISMATCH: &str = "Passwords do not match.";

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and verification code sent", body = RegisterResponse),
        (status = 400, description = "Field-level validation errors", body = String),
        (status = 500, description = "Verification email could not be delivered", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match handle_register(&pool, &auth_state, request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_register(
    pool: &PgPool,
    state: &AuthState,
    request: RegisterRequest,
) -> Result<RegisterResponse, AuthError> {
    let email = normalize_email(request.email.as_deref().unwrap_or_default());
    let password = request.password.unwrap_or_default();
    let password_confirm = request.password_confirm.unwrap_or_default();
    let username = request
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let mut errors: Vec<(&'static str, String)> = Vec::new();

    let email_ok = if email.is_empty() {
        errors.push(("email", EMAIL_REQUIRED.to_string()));
        false
    } else if !valid_email(&email) {
        errors.push(("email", EMAIL_INVALID.to_string()));
        false
    } else {
        true
    };

    if password.is_empty() {
        errors.push(("password", PASSWORD_REQUIRED.to_string()));
    }
    if password_confirm.is_empty() {
        errors.push(("password_confirm", PASSWORD_REQUIRED.to_string()));
    } else if password != password_confirm {
        errors.push(("password_confirm", PASSWORD_MISMATCH.to_string()));
    }

    // Existence checks run before any persistence; the unique constraints
    // below remain the backstop for concurrent registrations.
    if email_ok && storage::email_exists(pool, &email).await? {
        errors.push(("email", EMAIL_TAKEN.to_string()));
    }
    if let Some(name) = username {
        if storage::username_exists(pool, name).await? {
            errors.push(("username", USERNAME_TAKEN.to_string()));
        }
    }

    if !errors.is_empty() {
        return Err(AuthError::Validation(errors));
    }

    let username = match username {
        Some(name) => name.to_string(),
        None => derive_username(pool, &email).await?,
    };

    let new_account = NewAccount {
        username: username.clone(),
        email: email.clone(),
        password_hash: hash_password(&password)?,
        chef_star_name: request
            .chef_star_name
            .filter(|name| !name.trim().is_empty()),
        age_group: request
            .age_group
            .as_deref()
            .and_then(AgeGroup::from_submission),
        parent_email: request
            .parent_email
            .map(|parent| normalize_email(&parent))
            .filter(|parent| !parent.is_empty()),
    };

    let account_id = match storage::insert_account(pool, &new_account).await? {
        InsertOutcome::Created(id) => id,
        InsertOutcome::EmailTaken => {
            return Err(AuthError::Validation(vec![(
                "email",
                EMAIL_TAKEN.to_string(),
            )]));
        }
        InsertOutcome::UsernameTaken => {
            return Err(AuthError::Validation(vec![(
                "username",
                USERNAME_TAKEN.to_string(),
            )]));
        }
    };

    // The account now exists; a failed send surfaces as a 500 so the client
    // knows no usable code is on its way.
    issue_and_send_code(pool, state, account_id, &username, &email, false).await?;

    info!(account_id = %account_id, "account registered");

    Ok(RegisterResponse {
        id: account_id.to_string(),
        username,
        message: "successfully sent a verification mail".to_string(),
    })
}

/// Derive a unique username from the email local-part, appending an
/// increasing numeric suffix (1, 2, 3, ...) on collision.
async fn derive_username(pool: &PgPool, email: &str) -> Result<String, AuthError> {
    let base = username_candidate(email).to_string();
    let mut candidate = base.clone();
    let mut suffix = 1u32;
    while storage::username_exists(pool, &candidate).await? {
        candidate = format!("{base}{suffix}");
        suffix += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::super::state::test_support::auth_state;
    use super::super::types::RegisterRequest;
    use super::register;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn register_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = register(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_empty_fields_are_reported() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = RegisterRequest {
            username: None,
            email: None,
            password: None,
            password_confirm: None,
            chef_star_name: None,
            age_group: None,
            parent_email: None,
        };
        let response = register(Extension(pool), Extension(auth_state()), Some(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_password_mismatch_rejected_before_persistence() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let request = RegisterRequest {
            username: None,
            // Invalid format keeps the lazy pool untouched; the handler must
            // reject on validation alone.
            email: Some("not-an-email".to_string()),
            password: Some("p1".to_string()),
            password_confirm: Some("p2".to_string()),
            chef_star_name: None,
            age_group: None,
            parent_email: None,
        };
        let response = register(Extension(pool), Extension(auth_state()), Some(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
