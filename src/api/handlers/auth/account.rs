//! Account row type and the derived activation state machine.
//!
//! The lifecycle state is never stored. It is recomputed from the attribute
//! combination every time it is needed, so the flags in the database remain
//! the single source of truth:
//!
//! - `Unverified` — email not yet verified.
//! - `VerifiedUnapproved` — verified, but the account sits in a restricted
//!   age band and no parent has approved it yet.
//! - `Active` — verified, and either outside the restricted bands or
//!   parent-approved. Only `Active` accounts may log in.
//!
//! `is_email_verified` and `is_parent_approved` flip to true exactly once
//! and are never reset by any operation here.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Minutes a verification code stays valid after issuance.
pub const CODE_TTL_MINUTES: i64 = 15;

/// Restricted age bands that require parental approval before login.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeGroup {
    FiveToTen,
    TenToFifteen,
    FifteenToSeventeen,
}

impl AgeGroup {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FiveToTen => "5-10",
            Self::TenToFifteen => "10-15",
            Self::FifteenToSeventeen => "15-17",
        }
    }

    /// Parse the canonical form stored in the database.
    #[must_use]
    pub fn from_canonical(value: &str) -> Option<Self> {
        match value {
            "5-10" => Some(Self::FiveToTen),
            "10-15" => Some(Self::TenToFifteen),
            "15-17" => Some(Self::FifteenToSeventeen),
            _ => None,
        }
    }

    /// Normalize free-text input from the consent form.
    ///
    /// Lowercase + trim, then a fixed synonym table ("10-15 years" and
    /// "10-15 yrs" mean "10-15"); as a fallback everything except digits and
    /// hyphens is stripped and the result is checked against the canonical
    /// set. Unmatched input returns `None` and the caller leaves the stored
    /// value untouched.
    #[must_use]
    pub fn from_submission(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        let canonical = match normalized.as_str() {
            "5-10" | "5-10 yrs" | "5-10 years" => Some("5-10"),
            "10-15" | "10-15 yrs" | "10-15 years" => Some("10-15"),
            "15-17" | "15-17 yrs" | "15-17 years" => Some("15-17"),
            _ => None,
        };
        if let Some(canonical) = canonical {
            return Self::from_canonical(canonical);
        }

        let cleaned: String = normalized
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        Self::from_canonical(&cleaned)
    }
}

/// Derived lifecycle state, computed from the account's attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountState {
    Unverified,
    VerifiedUnapproved,
    Active,
}

/// One row of the `accounts` table.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_email_verified: bool,
    pub email_verification_code: Option<String>,
    pub code_issued_at: Option<DateTime<Utc>>,
    pub parent_email: Option<String>,
    pub chef_star_name: Option<String>,
    pub age_group: Option<AgeGroup>,
    pub is_parent_approved: bool,
    pub verification_token: Option<Uuid>,
    pub token_version: i32,
}

impl Account {
    /// Compute the current activation state.
    #[must_use]
    pub fn state(&self) -> AccountState {
        if !self.is_email_verified {
            AccountState::Unverified
        } else if self.requires_parent_approval() {
            AccountState::VerifiedUnapproved
        } else {
            AccountState::Active
        }
    }

    /// True when the account sits in a restricted band without approval.
    #[must_use]
    pub fn requires_parent_approval(&self) -> bool {
        self.age_group.is_some() && !self.is_parent_approved
    }

    /// True when no outstanding code exists or the code is past its window.
    #[must_use]
    pub fn code_expired(&self, now: DateTime<Utc>) -> bool {
        match self.code_issued_at {
            None => true,
            Some(issued_at) => now > issued_at + Duration::minutes(CODE_TTL_MINUTES),
        }
    }
}
