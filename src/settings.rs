use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use std::{env, fmt, str::FromStr, time::Duration};
use validator::ValidateEmail;
use zeroize::Zeroizing;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

/// Which transport hands composed messages to the outside world.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportKind {
    Smtp,
    Log,
}

/// Whether the request waits for the transport or only for the queue.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailDelivery {
    Sync,
    Queued,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// When set, rate-limit counters live in Redis instead of process memory.
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,

    /// Only enable behind a reverse proxy that overwrites the header.
    #[serde(default)]
    pub trust_x_forwarded_for: bool,

    #[serde(default)]
    pub contact: ContactSettings,

    #[serde(default)]
    pub mail: MailSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContactSettings {
    #[serde(default)]
    pub recipient: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Deserialize, Clone)]
pub struct MailSettings {
    #[serde(default = "default_transport")]
    pub transport: MailTransportKind,

    #[serde(default = "default_delivery")]
    pub delivery: MailDelivery,

    /// Falls back to the contact recipient when empty.
    #[serde(default)]
    pub from_address: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<Zeroizing<String>>,

    #[serde(default = "default_true")]
    pub starttls: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Club-Website".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_max_attempts() -> u32 {
    5
}
fn default_window_secs() -> u64 {
    60
}
fn default_key_prefix() -> String {
    "rl:contact".to_string()
}
fn default_transport() -> MailTransportKind {
    MailTransportKind::Log
}
fn default_delivery() -> MailDelivery {
    MailDelivery::Sync
}
fn default_from_name() -> String {
    "Website".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_queue_capacity() -> usize {
    100
}
fn default_max_retries() -> u32 {
    3
}

impl Default for ContactSettings {
    fn default() -> Self {
        ContactSettings {
            recipient: String::new(),
            max_attempts: default_max_attempts(),
            window_secs: default_window_secs(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl ContactSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        MailSettings {
            transport: default_transport(),
            delivery: default_delivery(),
            from_address: String::new(),
            from_name: default_from_name(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            starttls: default_true(),
            timeout_secs: default_timeout_secs(),
            queue_capacity: default_queue_capacity(),
            max_retries: default_max_retries(),
        }
    }
}

impl MailSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .ignore_empty(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;
        config.contact.recipient = fill_or_env(config.contact.recipient, "APP_CONTACT_RECIPIENT")?;

        if config.redis_url.is_none() {
            config.redis_url = env::var("APP_REDIS_URL").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !self.contact.recipient.validate_email() {
            errors.push("CONTACT recipient must be a valid email address");
        }
        if !self.mail.from_address.is_empty() && !self.mail.from_address.validate_email() {
            errors.push("MAIL from_address must be a valid email address");
        }
        if self.contact.max_attempts == 0 {
            errors.push("CONTACT max_attempts must be greater than zero");
        }
        if self.contact.window_secs == 0 {
            errors.push("CONTACT window_secs must be greater than zero");
        }
        if self.mail.timeout_secs == 0 {
            errors.push("MAIL timeout_secs must be greater than zero");
        }
        if self.mail.transport == MailTransportKind::Smtp
            && self.mail.smtp_host.as_deref().map_or(true, |h| h.trim().is_empty())
        {
            errors.push("MAIL smtp_host is required for the smtp transport");
        }
        if self.mail.smtp_username.is_some() != self.mail.smtp_password.is_some() {
            errors.push("MAIL smtp_username and smtp_password must be set together");
        }
        if self.mail.delivery == MailDelivery::Queued && self.mail.queue_capacity == 0 {
            errors.push("MAIL queue_capacity must be greater than zero for queued delivery");
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Address used in the `From` header of outbound mail.
    pub fn sender_address(&self) -> &str {
        if self.mail.from_address.trim().is_empty() {
            &self.contact.recipient
        } else {
            &self.mail.from_address
        }
    }
}

fn fill_or_env(current: String, env_key: &str) -> Result<String, ConfigError> {
    if current.trim().is_empty() {
        env::var(env_key).map_err(|_| ConfigError::Message(format!("{env_key} must be set")))
    } else {
        Ok(current)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for Option<String> {
    fn redact(&self) -> &str {
        match self.as_deref() {
            None => "[NOT SET]",
            Some("") => "[EMPTY]",
            Some(_) => "[REDACTED]",
        }
    }
}

impl Redact for Option<Zeroizing<String>> {
    fn redact(&self) -> &str {
        match self.as_deref().map(String::as_str) {
            None => "[NOT SET]",
            Some("") => "[EMPTY]",
            Some(_) => "[REDACTED]",
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("redis_url", &self.redis_url.redact())
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("trust_x_forwarded_for", &self.trust_x_forwarded_for)
            .field("contact", &self.contact)
            .field("mail", &self.mail)
            .finish()
    }
}

impl fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailSettings")
            .field("transport", &self.transport)
            .field("delivery", &self.delivery)
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.redact())
            .field("starttls", &self.starttls)
            .field("timeout_secs", &self.timeout_secs)
            .field("queue_capacity", &self.queue_capacity)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            env: AppEnvironment::Testing,
            name: "Club".to_string(),
            port: 0,
            host: "127.0.0.1".to_string(),
            worker_count: 1,
            redis_url: None,
            cors_allowed_origins: vec!["*".to_string()],
            trust_x_forwarded_for: false,
            contact: ContactSettings {
                recipient: "info@club.test".to_string(),
                ..Default::default()
            },
            mail: MailSettings::default(),
        }
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn rejects_invalid_recipient() {
        let mut config = valid_config();
        config.contact.recipient = "not-an-email".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("recipient"));
    }

    #[test]
    fn smtp_transport_requires_host() {
        let mut config = valid_config();
        config.mail.transport = MailTransportKind::Smtp;
        assert!(config.validate().is_err());

        config.mail.smtp_host = Some("smtp.club.test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn wildcard_cors_rejected_in_production() {
        let mut config = valid_config();
        config.env = AppEnvironment::Production;
        assert!(config.validate().is_err());

        config.cors_allowed_origins = vec!["https://club.test, https://www.club.test".to_string()];
        assert!(config.validate().is_ok());
        assert_eq!(config.cors_origins(), vec!["https://club.test", "https://www.club.test"]);
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = valid_config();
        config.contact.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sender_falls_back_to_recipient() {
        let mut config = valid_config();
        assert_eq!(config.sender_address(), "info@club.test");

        config.mail.from_address = "noreply@club.test".to_string();
        assert_eq!(config.sender_address(), "noreply@club.test");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = valid_config();
        config.mail.smtp_password = Some(Zeroizing::new("hunter2".to_string()));
        config.redis_url = Some("redis://:secret@localhost".to_string());
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("secret@"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn smtp_password_deserializes_into_zeroizing_storage() {
        let mail: MailSettings = serde_json::from_value(serde_json::json!({
            "smtp_username": "website@club.test",
            "smtp_password": "hunter2"
        }))
        .unwrap();

        let password: &Zeroizing<String> = mail.smtp_password.as_ref().unwrap();
        assert_eq!(password.as_str(), "hunter2");
        assert!(!format!("{:?}", mail).contains("hunter2"));
    }
}
