use std::sync::Arc;

use async_trait::async_trait;

use crate::{entities::mail::OutboundEmail, errors::MailError};

/// Narrow hand-off point between composition and delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hands one composed message to the transport.
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError>;

    /// Short name of the transport, reported by the health endpoint.
    fn transport(&self) -> &'static str;
}

#[async_trait]
impl<T> Mailer for Arc<T>
where
    T: Mailer + ?Sized,
{
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        (**self).send(email).await
    }

    fn transport(&self) -> &'static str {
        (**self).transport()
    }
}
