//! Database helpers for account lifecycle state.
//!
//! Uniqueness of email and username is enforced by the `accounts` table
//! constraints, not by the pre-insert existence checks alone; two concurrent
//! registrations with the same email cannot both succeed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::account::{Account, AgeGroup};
use super::utils::{is_unique_violation, violated_constraint};

const ACCOUNT_COLUMNS: &str = r"
    id, username, email, password_hash,
    is_email_verified, email_verification_code, code_issued_at,
    parent_email, chef_star_name, age_group,
    is_parent_approved, verification_token, token_version
";

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(super) enum InsertOutcome {
    Created(Uuid),
    EmailTaken,
    UsernameTaken,
}

/// Fields persisted at registration time.
pub(super) struct NewAccount {
    pub(super) username: String,
    pub(super) email: String,
    pub(super) password_hash: String,
    pub(super) chef_star_name: Option<String>,
    pub(super) age_group: Option<AgeGroup>,
    pub(super) parent_email: Option<String>,
}

fn account_from_row(row: &PgRow) -> Account {
    let age_group: Option<String> = row.get("age_group");
    Account {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_email_verified: row.get("is_email_verified"),
        email_verification_code: row.get("email_verification_code"),
        code_issued_at: row.get("code_issued_at"),
        parent_email: row.get("parent_email"),
        chef_star_name: row.get("chef_star_name"),
        age_group: age_group.as_deref().and_then(AgeGroup::from_canonical),
        is_parent_approved: row.get("is_parent_approved"),
        verification_token: row.get("verification_token"),
        token_version: row.get("token_version"),
    }
}

pub(super) async fn email_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let query = "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1) AS taken";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to check email existence")?;
    Ok(row.get("taken"))
}

pub(super) async fn username_exists(pool: &PgPool, username: &str) -> Result<bool> {
    let query = "SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1) AS taken";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to check username existence")?;
    Ok(row.get("taken"))
}

/// Insert a fresh account (unverified, unapproved, no code outstanding).
///
/// Unique violations are mapped to [`InsertOutcome`] so the handler can
/// answer with a field-level error even when a concurrent registration won
/// the race after the pre-insert checks passed.
pub(super) async fn insert_account(pool: &PgPool, new: &NewAccount) -> Result<InsertOutcome> {
    let query = r"
        INSERT INTO accounts
            (username, email, password_hash, chef_star_name, age_group, parent_email)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.chef_star_name.as_deref())
        .bind(new.age_group.map(AgeGroup::as_str))
        .bind(new.parent_email.as_deref())
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => {
            match violated_constraint(&err).as_deref() {
                Some("accounts_username_key") => Ok(InsertOutcome::UsernameTaken),
                // Email is the only other unique column on the table.
                _ => Ok(InsertOutcome::EmailTaken),
            }
        }
        Err(err) => Err(err).context("failed to insert account"),
    }
}

pub(super) async fn lookup_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>> {
    let query = &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by email")?;
    Ok(row.as_ref().map(account_from_row))
}

pub(super) async fn lookup_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Account>> {
    let query = &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by id")?;
    Ok(row.as_ref().map(account_from_row))
}

pub(super) async fn lookup_by_verification_token(
    pool: &PgPool,
    token: Uuid,
) -> Result<Option<Account>> {
    let query = &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE verification_token = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by verification token")?;
    Ok(row.as_ref().map(account_from_row))
}

pub(super) async fn lookup_by_bearer_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<Account>> {
    let query = &format!(
        r"
        SELECT {ACCOUNT_COLUMNS}
        FROM accounts
        JOIN bearer_tokens ON bearer_tokens.account_id = accounts.id
        WHERE bearer_tokens.token = $1
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account by bearer token")?;
    Ok(row.as_ref().map(account_from_row))
}

/// Store a freshly issued verification code and its issuance timestamp.
pub(super) async fn store_verification_code(
    pool: &PgPool,
    account_id: Uuid,
    code: &str,
    issued_at: DateTime<Utc>,
) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET email_verification_code = $2,
            code_issued_at = $3,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(code)
        .bind(issued_at)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store verification code")?;
    Ok(())
}

/// Store a resent code and bump `token_version`, invalidating the claim in
/// previously minted tokens. Last-write-wins on concurrent resends.
pub(super) async fn store_resend_code(
    pool: &PgPool,
    account_id: Uuid,
    code: &str,
    issued_at: DateTime<Utc>,
) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET email_verification_code = $2,
            code_issued_at = $3,
            token_version = token_version + 1,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(code)
        .bind(issued_at)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store resent verification code")?;
    Ok(())
}

/// Flip the verified flag and clear the outstanding code.
pub(super) async fn mark_email_verified(pool: &PgPool, account_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET is_email_verified = TRUE,
            email_verification_code = NULL,
            code_issued_at = NULL,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to mark email verified")?;
    Ok(())
}

/// Persist the consent submission: parent email always, star name and age
/// group only when provided.
pub(super) async fn record_consent(
    pool: &PgPool,
    account_id: Uuid,
    parent_email: &str,
    chef_star_name: Option<&str>,
    age_group: Option<AgeGroup>,
) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET parent_email = $2,
            chef_star_name = COALESCE($3, chef_star_name),
            age_group = COALESCE($4, age_group),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(parent_email)
        .bind(chef_star_name)
        .bind(age_group.map(AgeGroup::as_str))
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record consent submission")?;
    Ok(())
}

/// Return the account's approval-link token, generating it on first use.
///
/// `COALESCE` keeps an existing token, so once set it is permanent for the
/// life of the account even under concurrent submissions.
pub(super) async fn ensure_verification_token(pool: &PgPool, account_id: Uuid) -> Result<Uuid> {
    let query = r"
        UPDATE accounts
        SET verification_token = COALESCE(verification_token, $2),
            updated_at = NOW()
        WHERE id = $1
        RETURNING verification_token
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(Uuid::new_v4())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to ensure verification token")?;
    Ok(row.get("verification_token"))
}

pub(super) async fn mark_parent_approved(pool: &PgPool, account_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE accounts
        SET is_parent_approved = TRUE,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to mark parent approved")?;
    Ok(())
}

/// Return the account's bearer token, storing the candidate on first login.
///
/// The no-op `DO UPDATE` makes the insert return the existing row's token on
/// conflict, so repeated logins hand back the same opaque value.
pub(super) async fn get_or_create_bearer_token(
    pool: &PgPool,
    account_id: Uuid,
    candidate: &str,
) -> Result<String> {
    let query = r"
        INSERT INTO bearer_tokens (account_id, token)
        VALUES ($1, $2)
        ON CONFLICT (account_id) DO UPDATE SET token = bearer_tokens.token
        RETURNING token
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(candidate)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to get or create bearer token")?;
    Ok(row.get("token"))
}
