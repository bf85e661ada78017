//! # ChefStar ID (registration & parental consent)
//!
//! `chefstar-id` owns the account lifecycle for ChefStar, a social cooking
//! app aimed at minors. Every account moves through a guarded sequence of
//! states before it may log in:
//!
//! 1. **Registered** — email unverified, a 6-digit one-time code is mailed out.
//! 2. **Email verified** — the code was submitted within its 15 minute window.
//! 3. **Parent approved** — required for the restricted age bands (`5-10`,
//!    `10-15`, `15-17`); a parent follows an emailed approval link.
//! 4. **Login eligible** — credentials are accepted and tokens are issued.
//!
//! The current state is never stored; it is derived from the account's
//! attributes so there is a single source of truth (see
//! [`api::auth::account`]).
//!
//! ## Tokens
//!
//! Logins hand out an opaque bearer token (reused across logins) plus a
//! signed access/refresh pair carrying a `token_version` claim. Resending a
//! verification code bumps `token_version`, which lets downstream consumers
//! treat tokens minted before the resend as stale.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
