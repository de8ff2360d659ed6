use actix_web::{middleware::NormalizePath, web, App, HttpServer};
use async_trait::async_trait;
use club_backend::{
    entities::mail::OutboundEmail,
    errors::MailError,
    limiter::{InMemoryRateLimitStore, ManualClock},
    repositories::mailer::Mailer,
    routes::configure_routes,
    settings::{AppConfig, AppEnvironment, ContactSettings, MailSettings},
    AppState,
};
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::Value;
use std::{net::TcpListener, sync::Arc, time::Duration};

pub const CLUB_ADDRESS: &str = "info@club.test";

/// Keeps every message it is handed; optionally rejects them all.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        RecordingMailer {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("535 authentication failed".into()));
        }
        self.sent.lock().push(email);
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "recording"
    }
}

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub clock: Arc<ManualClock>,
    pub mailer: RecordingMailer,
    pub config: AppConfig,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(RecordingMailer::default()).await
    }

    pub async fn spawn_with(mailer: RecordingMailer) -> Self {
        let config = test_config();
        let clock = Arc::new(ManualClock::new());

        let rate_limiter = InMemoryRateLimitStore::with_clock(
            config.contact.max_attempts,
            config.contact.window(),
            clock.clone(),
        );

        let state = Arc::new(AppState::new(
            &config,
            Arc::new(rate_limiter),
            Arc::new(mailer.clone()),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let state_clone = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::from(state_clone.clone()))
                .wrap(NormalizePath::trim())
                .configure(configure_routes)
        })
        .listen(listener)
        .expect("Failed to bind server")
        .workers(config.worker_count)
        .run();

        tokio::spawn(server);

        let client = Client::new();
        while client.get(format!("{}/health", address)).send().await.is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Self {
            address,
            client,
            clock,
            mailer,
            config,
        }
    }

    /// Posts JSON as the client at `ip`.
    pub async fn post_contact(&self, ip: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/contact", self.address))
            .header("X-Forwarded-For", ip)
            .json(body)
            .send()
            .await
            .expect("Failed to post contact form")
    }

    pub async fn post_contact_form(&self, ip: &str, fields: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(format!("{}/contact", self.address))
            .header("X-Forwarded-For", ip)
            .form(fields)
            .send()
            .await
            .expect("Failed to post contact form")
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        env: AppEnvironment::Testing,
        name: "TTV Club".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        worker_count: 1,
        redis_url: None,
        cors_allowed_origins: vec!["*".to_string()],
        trust_x_forwarded_for: true,
        contact: ContactSettings {
            recipient: CLUB_ADDRESS.to_string(),
            ..Default::default()
        },
        mail: MailSettings {
            from_address: "website@club.test".to_string(),
            ..Default::default()
        },
    }
}

pub fn valid_contact() -> Value {
    serde_json::json!({
        "name": "Jan de Vries",
        "email": "jan@voorbeeld.nl",
        "message": "Ik wil graag lid worden van de vereniging."
    })
}
