use ammonia::clean_text;

use crate::{
    entities::{
        contact::ContactSubmission,
        mail::{MailAddress, OutboundEmail},
    },
    settings::AppConfig,
};

/// Composes the email the club receives for each accepted submission.
#[derive(Debug, Clone)]
pub struct ContactNotifier {
    recipient: MailAddress,
    sender: MailAddress,
    site_name: String,
}

impl ContactNotifier {
    pub fn new(recipient: MailAddress, sender: MailAddress, site_name: impl Into<String>) -> Self {
        ContactNotifier {
            recipient,
            sender,
            site_name: site_name.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        ContactNotifier::new(
            MailAddress::new(config.contact.recipient.clone()),
            MailAddress::named(config.mail.from_name.clone(), config.sender_address()),
            config.name.clone(),
        )
    }

    pub fn compose(&self, submission: &ContactSubmission) -> OutboundEmail {
        let display_name = single_line(submission.name());

        OutboundEmail {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            reply_to: MailAddress::named(display_name.clone(), submission.email()),
            subject: format!("Contactformulier: bericht van {}", display_name),
            text_body: self.text_body(submission, &display_name),
            html_body: self.html_body(submission, &display_name),
        }
    }

    fn text_body(&self, submission: &ContactSubmission, display_name: &str) -> String {
        format!(
            "Nieuw bericht via contactformulier\n\
             \n\
             Er is een nieuw bericht binnengekomen via het contactformulier op de website.\n\
             \n\
             Naam: {name}\n\
             E-mailadres: {email}\n\
             \n\
             Bericht:\n\
             {message}\n\
             \n\
             Reageer op {name}: mailto:{email}\n\
             \n\
             Met vriendelijke groet,\n\
             {site}\n",
            name = display_name,
            email = submission.email(),
            message = submission.message(),
            site = self.site_name,
        )
    }

    /// Every user-supplied value goes through `clean_text`, which escapes all markup.
    fn html_body(&self, submission: &ContactSubmission, display_name: &str) -> String {
        let name = clean_text(display_name);
        let email = clean_text(submission.email());
        let message = clean_text(submission.message());
        let site = clean_text(&self.site_name);

        format!(
            r##"<!DOCTYPE html>
<html lang="nl">
<body style="font-family: sans-serif; color: #0a1628;">
<h1>Nieuw bericht via contactformulier</h1>
<p>Er is een nieuw bericht binnengekomen via het contactformulier op de website.</p>
<p><strong>Naam:</strong> {name}</p>
<p><strong>E-mailadres:</strong> {email}</p>
<p><strong>Bericht:</strong></p>
<p style="white-space: pre-wrap;">{message}</p>
<p><a href="mailto:{email}" style="display: inline-block; padding: 10px 18px; background: #1a4fd4; color: #ffffff; text-decoration: none; border-radius: 6px;">Reageer op {name}</a></p>
<p>Met vriendelijke groet,<br>{site}</p>
</body>
</html>
"##
        )
    }
}

/// Collapses every run of whitespace, newlines included, to one space.
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
