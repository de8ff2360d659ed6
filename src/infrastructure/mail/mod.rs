use std::sync::Arc;

use crate::{
    errors::MailError,
    repositories::mailer::Mailer,
    settings::{MailSettings, MailTransportKind},
};

pub mod log_mailer;
pub mod queue;
pub mod smtp;

pub use log_mailer::LogMailer;
pub use queue::{mail_queue, MailQueueWorker, QueuedMailer};
pub use smtp::SmtpMailer;

/// Builds the transport selected in the settings, without any queueing.
pub fn build_transport(settings: &MailSettings) -> Result<Arc<dyn Mailer>, MailError> {
    match settings.transport {
        MailTransportKind::Smtp => Ok(Arc::new(SmtpMailer::from_settings(settings)?)),
        MailTransportKind::Log => Ok(Arc::new(LogMailer)),
    }
}
