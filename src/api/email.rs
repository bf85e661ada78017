//! Outbound email delivery seam.
//!
//! Verification codes, parent approval links and approval confirmations are
//! delivered synchronously on the request path: the handler composes an
//! [`EmailMessage`] and hands it to the configured [`EmailSender`]. A failed
//! send fails the request, so an account is never left silently without its
//! code or approval link.
//!
//! The default sender for local dev is [`LogEmailSender`], which logs and
//! returns `Ok(())`. Production deployments implement [`EmailSender`] for
//! their transport (SMTP, provider API) and wire it in at startup.

use anyhow::Result;
use tracing::info;

/// A composed message ready for delivery.
#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Email delivery abstraction used by the auth handlers.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error that the caller surfaces.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            body = %message.text,
            "email send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EmailMessage, EmailSender, LogEmailSender};

    #[test]
    fn log_sender_always_succeeds() {
        let message = EmailMessage {
            to: "kid@example.com".to_string(),
            from: "no-reply@chefstar.app".to_string(),
            subject: "Your verification code".to_string(),
            text: "code: 000123".to_string(),
            html: None,
        };
        assert!(LogEmailSender.send(&message).is_ok());
    }
}
