use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;

pub use domain::{entities, use_cases, validation};
pub use interfaces::{handlers, repositories, routes};
pub use infrastructure::{limiter, mail, utils};

use repositories::{mailer::Mailer, rate_limit::RateLimitStore};
use use_cases::{contact::ContactHandler, notification::ContactNotifier};

pub struct AppState {
    pub contact_handler: AppContactHandler,
    pub site_name: String,
    pub trust_x_forwarded_for: bool,
}

pub type AppContactHandler = ContactHandler<Arc<dyn RateLimitStore>, Arc<dyn Mailer>>;

impl AppState {
    pub fn new(
        config: &settings::AppConfig,
        rate_limiter: Arc<dyn RateLimitStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let notifier = ContactNotifier::from_config(config);
        let contact_handler = ContactHandler::new(rate_limiter, mailer, notifier);

        AppState {
            contact_handler,
            site_name: config.name.clone(),
            trust_x_forwarded_for: config.trust_x_forwarded_for,
        }
    }
}
