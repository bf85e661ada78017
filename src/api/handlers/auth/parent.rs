//! Parental consent: the child's submission and the parent's approval link.
//!
//! Submission is an authenticated, email-verified child posting a parent
//! contact. Approval is a public browser endpoint reached from the emailed
//! link, so it renders HTML fragments rather than JSON.

use anyhow::Context;
use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use crate::api::email::EmailMessage;

use super::account::AgeGroup;
use super::error::AuthError;
use super::session::require_account;
use super::state::{AuthConfig, AuthState};
use super::storage;
use super::types::{ApproveParentQuery, ConsentResponse, EmailPreview, SubmitParentRequest};
use super::utils::{normalize_email, valid_email};

/// Base URL for the approval link: scheme/host of the incoming request when
/// available (the usual case behind a proxy), otherwise the configured
/// public base URL.
fn approval_base(headers: &HeaderMap, config: &AuthConfig) -> String {
    let host = headers
        .get("host")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty());

    match host {
        Some(host) => {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|scheme| !scheme.is_empty())
                .unwrap_or("http");
            format!("{scheme}://{host}")
        }
        None => config.public_base_url().trim_end_matches('/').to_string(),
    }
}

/// Build the approval link with the token as a path segment and the parent
/// email URL-encoded in the query.
fn build_approve_link(base: &str, token: Uuid, parent_email: &str) -> anyhow::Result<String> {
    let base = base.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/approve-parent/{token}"))
        .with_context(|| format!("invalid approval link base: {base}"))?;
    url.query_pairs_mut().append_pair("email", parent_email);
    Ok(url.to_string())
}

fn approval_email(username: &str, parent_email: &str, link: &str, from: &str) -> EmailMessage {
    EmailMessage {
        to: parent_email.to_string(),
        from: from.to_string(),
        subject: format!("Please approve {username}'s account"),
        text: format!("Please approve your child's account by visiting: {link}"),
        html: Some(format!(
            concat!(
                "<html><body>",
                "<p>Hello,</p>",
                "<p>Please approve <strong>{username}</strong>'s account by clicking the button below:</p>",
                "<p style=\"text-align:center;\">",
                "<a href=\"{link}\" style=\"padding:12px 20px;background:#6f42c1;color:#fff;",
                "border-radius:6px;text-decoration:none;\">Approve account</a>",
                "</p></body></html>"
            ),
            username = username,
            link = link,
        )),
    }
}

fn approval_confirmation_email(username: &str, email: &str, from: &str) -> EmailMessage {
    EmailMessage {
        to: email.to_string(),
        from: from.to_string(),
        subject: "Your parent approved your account".to_string(),
        text: format!(
            "Hi {username},\n\nYour parent has approved your account. You can now log in."
        ),
        html: None,
    }
}

#[utoipa::path(
    post,
    path = "/submit-parent",
    request_body = SubmitParentRequest,
    responses(
        (status = 200, description = "Consent recorded and approval email sent", body = ConsentResponse),
        (status = 400, description = "Missing or invalid parent email", body = String),
        (status = 401, description = "Missing or invalid bearer token", body = String),
        (status = 403, description = "Child's email is not verified yet", body = String),
        (status = 500, description = "Approval email could not be delivered", body = String)
    ),
    tag = "consent"
)]
pub async fn submit_parent(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SubmitParentRequest>>,
) -> impl IntoResponse {
    let request: SubmitParentRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match handle_submit(&headers, &pool, &auth_state, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle_submit(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
    request: SubmitParentRequest,
) -> Result<ConsentResponse, AuthError> {
    let account = require_account(headers, pool, state).await?;
    if !account.is_email_verified {
        return Err(AuthError::EmailNotVerified);
    }

    let parent_email = normalize_email(request.parent_email.as_deref().unwrap_or_default());
    if parent_email.is_empty() {
        return Err(AuthError::BadRequest("parent_email required"));
    }
    if !valid_email(&parent_email) {
        return Err(AuthError::BadRequest("invalid parent_email"));
    }

    let chef_star_name = request
        .star_name
        .or(request.chef_star_name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let age_group = request
        .age_group
        .as_deref()
        .and_then(AgeGroup::from_submission);

    storage::record_consent(
        pool,
        account.id,
        &parent_email,
        chef_star_name.as_deref(),
        age_group,
    )
    .await?;
    let token = storage::ensure_verification_token(pool, account.id).await?;

    let base = approval_base(headers, state.config());
    let link = build_approve_link(&base, token, &parent_email).map_err(AuthError::Internal)?;
    let message = approval_email(&account.username, &parent_email, &link, state.config().mail_from());

    state.mailer().send(&message).map_err(AuthError::Delivery)?;
    info!(account_id = %account.id, "parent approval email sent");

    Ok(ConsentResponse {
        id: account.id.to_string(),
        username: account.username.clone(),
        chef_star_name: chef_star_name.or(account.chef_star_name),
        age_group: age_group
            .or(account.age_group)
            .map(|group| group.as_str().to_string()),
        parent_email: parent_email.clone(),
        email_preview: EmailPreview {
            to: vec![parent_email],
            from: message.from,
            subject: message.subject,
            text: message.text,
            html: message.html.unwrap_or_default(),
        },
        send_status: "sent".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/approve-parent/{token}",
    params(
        ("token" = Uuid, Path, description = "Approval token from the emailed link"),
        ("email" = Option<String>, Query, description = "Parent email to cross-check")
    ),
    responses(
        (status = 200, description = "Approval recorded (or already approved)", content_type = "text/html"),
        (status = 400, description = "Parent email mismatch", content_type = "text/html"),
        (status = 404, description = "Unknown token", content_type = "text/html")
    ),
    tag = "consent"
)]
pub async fn approve_parent(
    Path(token): Path<Uuid>,
    Query(query): Query<ApproveParentQuery>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let account = match storage::lookup_by_verification_token(&pool, token).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Html("<h2>Not found</h2><p>No account matches this approval link.</p>"),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to lookup approval token: {err:#}");
            return server_error_page();
        }
    };

    if let Some(supplied) = query.email.as_deref() {
        if account.parent_email.as_deref() != Some(supplied) {
            return (StatusCode::BAD_REQUEST, Html("<h2>Parent email mismatch</h2>"))
                .into_response();
        }
    }

    if account.is_parent_approved {
        // Idempotent: no state change and no second notification.
        return Html(
            "<h2>Already approved</h2><p>This account is already approved by the parent.</p>",
        )
        .into_response();
    }

    if let Err(err) = storage::mark_parent_approved(&pool, account.id).await {
        error!("Failed to record parent approval: {err:#}");
        return server_error_page();
    }
    info!(account_id = %account.id, "parent approval recorded");

    let confirmation = approval_confirmation_email(
        &account.username,
        &account.email,
        auth_state.config().mail_from(),
    );
    if let Err(err) = auth_state.mailer().send(&confirmation) {
        // Approval is already persisted; surface the delivery failure.
        error!("Failed to send approval confirmation: {err:#}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h2>Approval recorded</h2><p>We could not notify the child by email.</p>"),
        )
            .into_response();
    }

    Html(
        "<h2>Thank you</h2><p>Parent approval recorded. The account is now unlocked and the child can log in.</p>",
    )
    .into_response()
}

fn server_error_page() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html("<h2>Something went wrong</h2><p>Please try the link again later.</p>"),
    )
        .into_response()
}
