use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    entities::contact::{ContactForm, ContactResponse, ContactSubmission},
    errors::AppError,
    repositories::{mailer::Mailer, rate_limit::RateLimitStore},
    use_cases::notification::ContactNotifier,
};

/// Runs one contact submission through rate limiting, validation and dispatch,
/// stopping at the first step that fails.
pub struct ContactHandler<L, M>
where
    L: RateLimitStore,
    M: Mailer,
{
    pub rate_limiter: L,
    pub mailer: M,
    pub notifier: ContactNotifier,
}

impl<L, M> ContactHandler<L, M>
where
    L: RateLimitStore,
    M: Mailer,
{
    pub fn new(rate_limiter: L, mailer: M, notifier: ContactNotifier) -> Self {
        ContactHandler {
            rate_limiter,
            mailer,
            notifier,
        }
    }

    /// Handles a contact form posted by the client identified by `client_key`.
    #[tracing::instrument(
        name = "contact_submission",
        skip(self, client_key, form),
        fields(client = %client_key, submission_id = %Uuid::new_v4())
    )]
    pub async fn submit(
        &self,
        client_key: &str,
        form: ContactForm,
    ) -> Result<ContactResponse, AppError> {
        let decision = self.rate_limiter.hit(client_key).await.map_err(|e| {
            error!("Rate limit store unavailable: {}", e);
            AppError::from(e)
        })?;

        if !decision.allowed {
            warn!(
                attempts = decision.attempts,
                limit = decision.limit,
                "Contact submission rate limited"
            );
            return Err(AppError::RateLimited {
                retry_after_secs: decision.retry_after_secs(),
            });
        }

        let submission = ContactSubmission::try_from(form).map_err(|e| {
            info!("Contact submission rejected: {}", e);
            AppError::from(e)
        })?;

        let email = self.notifier.compose(&submission);

        self.mailer.send(email).await.map_err(|e| {
            error!(transport = self.mailer.transport(), "Contact mail dispatch failed: {}", e);
            AppError::DispatchError(e)
        })?;

        info!(remaining = decision.remaining(), "Contact submission dispatched");
        Ok(ContactResponse::sent())
    }
}
