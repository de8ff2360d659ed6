use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use crate::{entities::mail::OutboundEmail, errors::MailError, repositories::mailer::Mailer};

const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Accepts messages into a bounded queue and returns immediately. The request
/// only fails when the queue cannot take the message.
#[derive(Clone)]
pub struct QueuedMailer {
    sender: mpsc::Sender<OutboundEmail>,
}

/// Drains the queue into the real transport, retrying failed sends.
pub struct MailQueueWorker<M: Mailer> {
    receiver: mpsc::Receiver<OutboundEmail>,
    mailer: M,
    max_retries: u32,
    backoff: Duration,
}

pub fn mail_queue<M: Mailer>(mailer: M, capacity: usize, max_retries: u32) -> (QueuedMailer, MailQueueWorker<M>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        QueuedMailer { sender },
        MailQueueWorker {
            receiver,
            mailer,
            max_retries,
            backoff: DEFAULT_BACKOFF,
        },
    )
}

#[async_trait]
impl Mailer for QueuedMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        self.sender.try_send(email).map_err(|e| match e {
            TrySendError::Full(_) => MailError::QueueFull,
            TrySendError::Closed(_) => MailError::QueueClosed,
        })
    }

    fn transport(&self) -> &'static str {
        "queued"
    }
}

impl<M: Mailer> MailQueueWorker<M> {
    /// Base delay before the first retry; doubles on every further attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Runs until every `QueuedMailer` is dropped and the queue is empty.
    pub async fn run(mut self) {
        info!("Mail queue worker started ({} transport)", self.mailer.transport());

        while let Some(email) = self.receiver.recv().await {
            self.deliver(email).await;
        }

        info!("Mail queue drained, worker stopped");
    }

    async fn deliver(&self, email: OutboundEmail) -> bool {
        let mut attempt = 0;

        loop {
            match self.mailer.send(email.clone()).await {
                Ok(()) => return true,
                Err(e) if !e.is_transient() => {
                    error!(
                        subject = %email.subject,
                        "Dropping undeliverable mail: {}", e
                    );
                    return false;
                }
                Err(e) if attempt < self.max_retries => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    warn!(
                        "Mail delivery attempt {} failed: {}. Retrying in {:?}",
                        attempt + 1, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        subject = %email.subject,
                        "Giving up on mail delivery after {} attempts: {}",
                        attempt + 1, e
                    );
                    return false;
                }
            }
        }
    }
}
