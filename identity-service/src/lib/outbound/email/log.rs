use async_trait::async_trait;

use crate::identity::ports::Mailer;
use crate::identity::ports::MailerError;

/// Tracing-backed mail transport.
///
/// Outbound delivery is an external collaborator; this adapter records what
/// would have been sent so local and test deployments run without an SMTP
/// relay.
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        tracing::info!(to, subject, "Outbound mail (log transport)");
        tracing::debug!(body, "Outbound mail body");
        Ok(())
    }
}
