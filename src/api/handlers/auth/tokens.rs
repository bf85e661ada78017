//! Signed access/refresh tokens and opaque bearer tokens.
//!
//! Access and refresh tokens are HS256 JWTs carrying the account's
//! `token_version` at mint time. Resending a verification code bumps the
//! stored counter, which marks every previously minted token as stale for
//! consumers that compare versions.
//!
//! Bearer tokens are opaque random strings looked up against the store; one
//! per account, reused across logins.

use anyhow::{Context, Result, bail};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::account::Account;
use super::state::AuthState;
use super::storage;

const TYP_ACCESS: &str = "access";
const TYP_REFRESH: &str = "refresh";

/// Claims embedded in minted access/refresh tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub token_version: i32,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Mints and verifies the signed token pair.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl_seconds: i64, refresh_ttl_seconds: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    /// Mint an access/refresh pair stamped with the account's token version.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint_pair(
        &self,
        account_id: Uuid,
        token_version: i32,
        now: DateTime<Utc>,
    ) -> Result<TokenPair> {
        let access = self.mint(
            account_id,
            token_version,
            now,
            self.access_ttl_seconds,
            TYP_ACCESS,
        )?;
        let refresh = self.mint(
            account_id,
            token_version,
            now,
            self.refresh_ttl_seconds,
            TYP_REFRESH,
        )?;
        Ok(TokenPair { access, refresh })
    }

    fn mint(
        &self,
        account_id: Uuid,
        token_version: i32,
        now: DateTime<Utc>,
        ttl_seconds: i64,
        typ: &str,
    ) -> Result<String> {
        let expires_at = now + Duration::seconds(ttl_seconds);
        let claims = Claims {
            sub: account_id.to_string(),
            token_version,
            typ: typ.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).context("failed to sign token")
    }

    /// Verify an access token and return its claims.
    ///
    /// # Errors
    /// Returns an error for bad signatures, expired tokens, or refresh
    /// tokens presented where an access token is expected.
    pub fn verify_access(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .context("invalid access token")?;
        if data.claims.typ != TYP_ACCESS {
            bail!("token is not an access token");
        }
        Ok(data.claims)
    }
}

/// Generate a new opaque bearer token (raw value; the store keeps it as-is
/// so repeated logins can return the same token).
///
/// # Errors
/// Returns an error if the system RNG fails.
pub(super) fn generate_bearer_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate bearer token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Credentials attached to a successful login/verification response.
pub(super) struct IssuedCredentials {
    pub(super) token: Option<String>,
    pub(super) access: Option<String>,
    pub(super) refresh: Option<String>,
}

/// Best-effort credential issuance: a failure to mint or store any token is
/// logged and the corresponding field omitted, never failing the request.
pub(super) async fn issue_credentials(
    pool: &PgPool,
    state: &AuthState,
    account: &Account,
) -> IssuedCredentials {
    let token = match generate_bearer_token() {
        Ok(candidate) => {
            match storage::get_or_create_bearer_token(pool, account.id, &candidate).await {
                Ok(token) => Some(token),
                Err(err) => {
                    error!("Failed to store bearer token: {err:#}");
                    None
                }
            }
        }
        Err(err) => {
            error!("Failed to generate bearer token: {err:#}");
            None
        }
    };

    let (access, refresh) =
        match state
            .tokens()
            .mint_pair(account.id, account.token_version, state.clock().now())
        {
            Ok(pair) => (Some(pair.access), Some(pair.refresh)),
            Err(err) => {
                error!("Failed to mint token pair: {err:#}");
                (None, None)
            }
        };

    IssuedCredentials {
        token,
        access,
        refresh,
    }
}

/// Identity + best-effort credentials, the body shared by login and the
/// verification success paths.
pub(super) async fn credentials_response(
    pool: &PgPool,
    state: &AuthState,
    account: &Account,
) -> super::types::CredentialsResponse {
    let issued = issue_credentials(pool, state, account).await;
    super::types::CredentialsResponse {
        id: account.id.to_string(),
        username: account.username.clone(),
        email: account.email.clone(),
        token: issued.token,
        access: issued.access,
        refresh: issued.refresh,
    }
}
