use async_trait::async_trait;
use tracing::{debug, info};

use crate::{entities::mail::OutboundEmail, errors::MailError, repositories::mailer::Mailer};

/// Development transport: writes the message to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        info!(
            to = %email.to,
            reply_to = %email.reply_to,
            subject = %email.subject,
            "Mail not sent (log transport)"
        );
        debug!("Mail body:\n{}", email.text_body);
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "log"
    }
}
