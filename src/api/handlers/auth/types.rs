//! Request/response types for the registration and consent endpoints.
//!
//! Request fields are optional at the serde layer so handlers can answer
//! missing fields with the structured 400 bodies clients expect, instead of
//! a deserialization rejection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub chef_star_name: Option<String>,
    pub age_group: Option<String>,
    pub parent_email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendCodeRequest {
    pub email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendCodeResponse {
    pub id: String,
    pub username: String,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// Account identity plus whatever credentials could be minted.
///
/// Token fields are best-effort: a minting failure omits the field rather
/// than failing the request.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CredentialsResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SubmitParentRequest {
    pub parent_email: Option<String>,
    // Both spellings are accepted; `star_name` wins when both are present.
    pub star_name: Option<String>,
    pub chef_star_name: Option<String>,
    pub age_group: Option<String>,
}

/// Copy of the composed approval email, returned for operability/debugging.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EmailPreview {
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConsentResponse {
    pub id: String,
    pub username: String,
    pub chef_star_name: Option<String>,
    pub age_group: Option<String>,
    pub parent_email: String,
    pub email_preview: EmailPreview,
    pub send_status: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ApproveParentQuery {
    pub email: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub chef_star_name: Option<String>,
    pub age_group: Option<String>,
    pub parent_email: Option<String>,
    pub is_email_verified: bool,
    pub is_parent_approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn register_request_tolerates_missing_fields() -> Result<()> {
        let request: RegisterRequest = serde_json::from_str(r#"{"email":"kid@x.com"}"#)?;
        assert_eq!(request.email.as_deref(), Some("kid@x.com"));
        assert_eq!(request.username, None);
        assert_eq!(request.password, None);
        Ok(())
    }

    #[test]
    fn credentials_response_omits_missing_tokens() -> Result<()> {
        let response = CredentialsResponse {
            id: "1".to_string(),
            username: "kid".to_string(),
            email: "kid@x.com".to_string(),
            token: None,
            access: None,
            refresh: None,
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("token").is_none());
        assert!(value.get("access").is_none());
        assert!(value.get("refresh").is_none());
        Ok(())
    }

    #[test]
    fn credentials_response_keeps_present_tokens() -> Result<()> {
        let response = CredentialsResponse {
            id: "1".to_string(),
            username: "kid".to_string(),
            email: "kid@x.com".to_string(),
            token: Some("bearer".to_string()),
            access: Some("jwt".to_string()),
            refresh: Some("jwt2".to_string()),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(value["token"], "bearer");
        assert_eq!(value["access"], "jwt");
        assert_eq!(value["refresh"], "jwt2");
        Ok(())
    }

    #[test]
    fn submit_parent_accepts_both_star_name_keys() -> Result<()> {
        let request: SubmitParentRequest =
            serde_json::from_str(r#"{"parent_email":"p@x.com","chef_star_name":"Chef Max"}"#)?;
        assert_eq!(request.chef_star_name.as_deref(), Some("Chef Max"));
        assert_eq!(request.star_name, None);
        Ok(())
    }
}
