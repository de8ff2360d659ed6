use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

pub const NAME_MAX_LEN: u64 = 255;
pub const EMAIL_MAX_LEN: u64 = 255;
pub const MESSAGE_MAX_LEN: u64 = 5000;

/// Largest accepted request body for the contact endpoint, in bytes.
pub const CONTACT_PAYLOAD_LIMIT: usize = 32 * 1024;

pub const CONTACT_SUCCESS_MESSAGE: &str = "Je bericht is verstuurd!";
pub const RATE_LIMITED_MESSAGE: &str = "Te veel berichten verstuurd. Probeer het later opnieuw.";
pub const DISPATCH_FAILED_MESSAGE: &str = "Je bericht kon niet worden verstuurd. Probeer het later opnieuw.";
pub const VALIDATION_FAILED_MESSAGE: &str = "De ingevulde gegevens zijn ongeldig.";
