use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::{
    entities::mail::{MailAddress, OutboundEmail},
    errors::MailError,
    repositories::mailer::Mailer,
    settings::MailSettings,
};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn from_settings(settings: &MailSettings) -> Result<Self, MailError> {
        let host = settings
            .smtp_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| MailError::Build("smtp_host is not configured".to_string()))?;

        let mut builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        builder = builder
            .port(settings.smtp_port)
            .timeout(Some(settings.timeout()));

        if let (Some(username), Some(password)) = (&settings.smtp_username, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.as_str().to_owned()));
        }

        Ok(SmtpMailer {
            transport: builder.build(),
            timeout: settings.timeout(),
        })
    }
}

fn mailbox(address: &MailAddress) -> Result<Mailbox, MailError> {
    let email: Address = address
        .email
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("{}: {}", address.email, e)))?;
    Ok(Mailbox::new(address.name.clone(), email))
}

/// Turns a composed email into a `multipart/alternative` MIME message.
pub fn build_message(email: &OutboundEmail) -> Result<Message, MailError> {
    Message::builder()
        .from(mailbox(&email.from)?)
        .reply_to(mailbox(&email.reply_to)?)
        .to(mailbox(&email.to)?)
        .subject(email.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            email.html_body.clone(),
        ))
        .map_err(|e| MailError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        let message = build_message(&email)?;

        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(Ok(response)) => {
                debug!("SMTP accepted message with code {}", response.code());
                Ok(())
            }
            Ok(Err(e)) => Err(MailError::Transport(e.to_string())),
            Err(_) => Err(MailError::Timeout(self.timeout.as_secs())),
        }
    }

    fn transport(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_email() -> OutboundEmail {
        OutboundEmail {
            from: MailAddress::named("Website", "website@club.test"),
            to: MailAddress::new("info@club.test"),
            reply_to: MailAddress::named("Jan de Vries", "jan@voorbeeld.nl"),
            subject: "Contactformulier: bericht van Jan de Vries".to_string(),
            text_body: "Hallo".to_string(),
            html_body: "<p>Hallo</p>".to_string(),
        }
    }

    fn header_line<'a>(formatted: &'a str, name: &str) -> &'a str {
        formatted
            .lines()
            .find(|line| line.starts_with(name))
            .unwrap_or_else(|| panic!("missing {name} header"))
    }

    #[test]
    fn builds_headers_from_the_composed_email() {
        let message = build_message(&sample_email()).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(header_line(&formatted, "To:").contains("info@club.test"));
        assert!(header_line(&formatted, "Reply-To:").contains("jan@voorbeeld.nl"));
        assert!(header_line(&formatted, "From:").contains("website@club.test"));
        assert!(formatted.contains("multipart/alternative"));
    }

    #[test]
    fn rejects_unparsable_addresses() {
        let mut email = sample_email();
        email.reply_to = MailAddress::new("not an address");

        assert!(matches!(build_message(&email), Err(MailError::InvalidAddress(_))));
    }

    #[test]
    fn smtp_requires_a_host() {
        let settings = MailSettings::default();
        assert!(matches!(SmtpMailer::from_settings(&settings), Err(MailError::Build(_))));
    }
}
