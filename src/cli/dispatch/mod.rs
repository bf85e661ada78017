//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth::ARG_JWT_SECRET;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    let jwt_secret = matches
        .get_one::<String>(ARG_JWT_SECRET)
        .cloned()
        .context("missing required argument: --jwt-secret")?;

    let access_token_ttl_seconds = matches
        .get_one::<i64>("access-token-ttl-seconds")
        .copied()
        .unwrap_or(900);
    let refresh_token_ttl_seconds = matches
        .get_one::<i64>("refresh-token-ttl-seconds")
        .copied()
        .unwrap_or(86400);
    let public_base_url = matches
        .get_one::<String>("public-base-url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let frontend_origin = matches
        .get_one::<String>("frontend-origin")
        .cloned()
        .unwrap_or_else(|| "https://chefstar.app".to_string());
    let mail_from = matches
        .get_one::<String>("mail-from")
        .cloned()
        .unwrap_or_else(|| "no-reply@chefstar.app".to_string());

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: SecretString::from(jwt_secret),
        access_token_ttl_seconds,
        refresh_token_ttl_seconds,
        public_base_url,
        frontend_origin,
        mail_from,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;
    use secrecy::ExposeSecret;

    #[test]
    fn builds_server_action_from_args() -> Result<()> {
        temp_env::with_vars(
            [
                ("CHEFSTAR_DSN", None::<&str>),
                ("CHEFSTAR_JWT_SECRET", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "chefstar-id",
                    "--dsn",
                    "postgres://user@localhost:5432/chefstar",
                    "--jwt-secret",
                    "super-secret",
                    "--mail-from",
                    "hello@chefstar.app",
                ]);
                let Action::Server(args) = handler(&matches)?;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/chefstar");
                assert_eq!(args.jwt_secret.expose_secret(), "super-secret");
                assert_eq!(args.access_token_ttl_seconds, 900);
                assert_eq!(args.refresh_token_ttl_seconds, 86400);
                assert_eq!(args.mail_from, "hello@chefstar.app");
                Ok(())
            },
        )
    }
}
