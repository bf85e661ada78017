//! Auth configuration and shared request state.

use std::sync::Arc;

use crate::api::email::EmailSender;

use super::clock::Clock;
use super::otp::CodeGenerator;
use super::tokens::TokenIssuer;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_MAIL_FROM: &str = "no-reply@chefstar.app";
const DEFAULT_FRONTEND_ORIGIN: &str = "https://chefstar.app";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    public_base_url: String,
    frontend_origin: String,
    mail_from: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(public_base_url: String) -> Self {
        Self {
            public_base_url,
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            mail_from: DEFAULT_MAIL_FROM.to_string(),
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_frontend_origin(mut self, frontend_origin: String) -> Self {
        self.frontend_origin = frontend_origin;
        self
    }

    #[must_use]
    pub fn with_mail_from(mut self, mail_from: String) -> Self {
        self.mail_from = mail_from;
        self
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    /// Fallback base for approval links when the request has no Host header.
    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    #[must_use]
    pub fn frontend_origin(&self) -> &str {
        &self.frontend_origin
    }

    #[must_use]
    pub fn mail_from(&self) -> &str {
        &self.mail_from
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }
}

/// Shared state for the auth handlers: configuration plus the injected
/// capabilities (clock, code generator, mailer, token issuer).
pub struct AuthState {
    config: AuthConfig,
    tokens: TokenIssuer,
    mailer: Arc<dyn EmailSender>,
    clock: Arc<dyn Clock>,
    codes: Arc<dyn CodeGenerator>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        tokens: TokenIssuer,
        mailer: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
        codes: Arc<dyn CodeGenerator>,
    ) -> Self {
        Self {
            config,
            tokens,
            mailer,
            clock,
            codes,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub(super) fn mailer(&self) -> &dyn EmailSender {
        self.mailer.as_ref()
    }

    pub(super) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(super) fn codes(&self) -> &dyn CodeGenerator {
        self.codes.as_ref()
    }
}

#[cfg(test)]
pub(super) mod test_support {
    use super::super::clock::FixedClock;
    use super::super::otp::FixedCodeGenerator;
    use super::super::tokens::TokenIssuer;
    use super::{AuthConfig, AuthState};
    use crate::api::email::{EmailMessage, EmailSender};
    use anyhow::{Result, anyhow};
    use chrono::{DateTime, Utc};
    use secrecy::SecretString;
    use std::sync::{Arc, Mutex};

    /// Records sent messages; optionally fails every send.
    pub(crate) struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            })
        }
    }

    impl EmailSender for RecordingMailer {
        fn send(&self, message: &EmailMessage) -> Result<()> {
            if self.fail {
                return Err(anyhow!("smtp connection refused"));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(message.clone());
            }
            Ok(())
        }
    }

    pub(crate) fn auth_state_at(
        now: DateTime<Utc>,
        code: &'static str,
        mailer: Arc<RecordingMailer>,
    ) -> Arc<AuthState> {
        let config = AuthConfig::new("http://localhost:8080".to_string());
        let tokens = TokenIssuer::new(&SecretString::from("test-secret"), 900, 86400);
        Arc::new(AuthState::new(
            config,
            tokens,
            mailer,
            Arc::new(FixedClock(now)),
            Arc::new(FixedCodeGenerator(code)),
        ))
    }

    pub(crate) fn auth_state() -> Arc<AuthState> {
        auth_state_at(Utc::now(), "000123", RecordingMailer::new())
    }
}

#[cfg(test)]
mod tests {
    use super::super::clock::SystemClock;
    use super::super::otp::RandomCodeGenerator;
    use super::super::tokens::TokenIssuer;
    use super::{AuthConfig, AuthState};
    use crate::api::email::LogEmailSender;
    use secrecy::SecretString;
    use std::sync::Arc;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("http://localhost:8080".to_string());

        assert_eq!(config.public_base_url(), "http://localhost:8080");
        assert_eq!(config.mail_from(), super::DEFAULT_MAIL_FROM);
        assert_eq!(config.frontend_origin(), super::DEFAULT_FRONTEND_ORIGIN);
        assert_eq!(
            config.access_token_ttl_seconds(),
            super::DEFAULT_ACCESS_TOKEN_TTL_SECONDS
        );
        assert_eq!(
            config.refresh_token_ttl_seconds(),
            super::DEFAULT_REFRESH_TOKEN_TTL_SECONDS
        );

        let config = config
            .with_mail_from("hello@chefstar.app".to_string())
            .with_frontend_origin("https://app.chefstar.app".to_string())
            .with_access_token_ttl_seconds(60)
            .with_refresh_token_ttl_seconds(120);

        assert_eq!(config.mail_from(), "hello@chefstar.app");
        assert_eq!(config.frontend_origin(), "https://app.chefstar.app");
        assert_eq!(config.access_token_ttl_seconds(), 60);
        assert_eq!(config.refresh_token_ttl_seconds(), 120);
    }

    #[test]
    fn recording_mailer_records_and_fails_on_demand() {
        use super::test_support::RecordingMailer;
        use crate::api::email::{EmailMessage, EmailSender};

        let message = EmailMessage {
            to: "kid@example.com".to_string(),
            from: "no-reply@chefstar.app".to_string(),
            subject: "Your verification code".to_string(),
            text: "code".to_string(),
            html: None,
        };

        let mailer = RecordingMailer::new();
        assert!(mailer.send(&message).is_ok());
        assert_eq!(mailer.sent.lock().map(|sent| sent.len()).ok(), Some(1));

        let failing = RecordingMailer::failing();
        assert!(failing.send(&message).is_err());
        assert_eq!(failing.sent.lock().map(|sent| sent.len()).ok(), Some(0));
    }

    #[test]
    fn auth_state_exposes_capabilities() {
        let config = AuthConfig::new("http://localhost:8080".to_string());
        let tokens = TokenIssuer::new(&SecretString::from("secret"), 900, 86400);
        let state = AuthState::new(
            config,
            tokens,
            Arc::new(LogEmailSender),
            Arc::new(SystemClock),
            Arc::new(RandomCodeGenerator),
        );
        assert_eq!(state.config().public_base_url(), "http://localhost:8080");
        assert_eq!(state.codes().six_digit_code().len(), 6);
    }
}
