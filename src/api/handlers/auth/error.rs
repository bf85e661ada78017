//! Error taxonomy for the auth endpoints.
//!
//! Every JSON endpoint returns a structured body: validation failures map
//! fields to message lists (the shape clients already parse from form
//! errors), everything else carries a top-level `error` message. The two
//! browser-facing approval pages render HTML instead and do not go through
//! this type.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::error;

#[derive(Debug)]
pub enum AuthError {
    /// Field-level validation failures; 400 with a `{field: [messages]}` body.
    Validation(Vec<(&'static str, String)>),
    /// Malformed request shape; 400 with a top-level message.
    BadRequest(&'static str),
    /// No account matches the request; 404.
    NotFound,
    /// Wrong email or wrong password; deliberately indistinguishable; 401.
    InvalidCredentials,
    /// Bearer/session authentication missing or invalid; 401.
    Unauthorized,
    /// Login or consent attempted before email verification; 403.
    EmailNotVerified,
    /// Login attempted from a restricted age band without approval; 403.
    ParentApprovalRequired,
    /// Submitted code does not match the stored one; 400.
    InvalidCode,
    /// Code missing or past its 15 minute window; 400.
    CodeExpired,
    /// Notification gateway failure; 500 with the send error detail.
    Delivery(anyhow::Error),
    /// Anything else; 500 with a generic body, detail only in the logs.
    Internal(anyhow::Error),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) | Self::InvalidCode | Self::CodeExpired => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified | Self::ParentApprovalRequired => StatusCode::FORBIDDEN,
            Self::Delivery(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            Self::Validation(errors) => {
                let mut map = serde_json::Map::new();
                for (field, message) in errors {
                    if let Some(messages) = map
                        .entry((*field).to_string())
                        .or_insert_with(|| Value::Array(Vec::new()))
                        .as_array_mut()
                    {
                        messages.push(Value::String(message.clone()));
                    }
                }
                Value::Object(map)
            }
            Self::BadRequest(message) => json!({ "error": message }),
            Self::NotFound => json!({ "error": "user not found" }),
            Self::InvalidCredentials => json!({ "error": "invalid credentials" }),
            Self::Unauthorized => json!({ "error": "authentication required" }),
            Self::EmailNotVerified => json!({ "error": "email not verified" }),
            Self::ParentApprovalRequired => json!({ "error": "parent approval required" }),
            Self::InvalidCode => json!({ "error": "invalid code" }),
            Self::CodeExpired => json!({ "error": "code expired" }),
            Self::Delivery(err) => {
                json!({ "error": "failed to send email", "details": err.to_string() })
            }
            Self::Internal(_) => json!({ "error": "internal server error" }),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::Delivery(err) => error!("Email delivery failed: {err:#}"),
            Self::Internal(err) => error!("Internal error: {err:#}"),
            _ => {}
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;
    use anyhow::anyhow;
    use axum::{http::StatusCode, response::IntoResponse};

    fn status_of(err: AuthError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            status_of(AuthError::Validation(vec![("email", "bad".to_string())])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AuthError::BadRequest("email and code are required")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AuthError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AuthError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(AuthError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AuthError::EmailNotVerified),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AuthError::ParentApprovalRequired),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(AuthError::InvalidCode), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::CodeExpired), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AuthError::Delivery(anyhow!("smtp down"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AuthError::Internal(anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_body_groups_messages_by_field() {
        let err = AuthError::Validation(vec![
            ("email", "A user with that email already exists".to_string()),
            ("password_confirm", "Passwords do not match.".to_string()),
        ]);
        let body = err.body();
        assert_eq!(
            body["email"][0],
            "A user with that email already exists".to_string()
        );
        assert_eq!(body["password_confirm"][0], "Passwords do not match.");
    }

    #[test]
    fn delivery_body_carries_detail() {
        let err = AuthError::Delivery(anyhow!("connection refused"));
        let body = err.body();
        assert_eq!(body["error"], "failed to send email");
        assert_eq!(body["details"], "connection refused");
    }

    #[test]
    fn forbidden_variants_stay_distinguishable() {
        let unverified = AuthError::EmailNotVerified.body();
        let unapproved = AuthError::ParentApprovalRequired.body();
        assert_ne!(unverified["error"], unapproved["error"]);
    }
}
