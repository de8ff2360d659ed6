use actix_web::{get, web, HttpResponse, Responder};
use humantime::format_duration;
use chrono::Utc;
use std::time::Duration;
use serde::Serialize;

use crate::{
    constants::START_TIME,
    repositories::{mailer::Mailer, rate_limit::RateLimitStore},
    AppState,
};

#[derive(Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    uptime: String,
    timestamp: String,
    start_at: String,
    version: &'static str,
    rate_limit_backend: &'static str,
    rate_limit_status: &'static str,
    mail_transport: &'static str,
}

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let now_utc = Utc::now();
    let uptime = now_utc.signed_duration_since(*START_TIME).num_seconds().max(0) as u64;

    let handler = &state.contact_handler;
    let store_healthy = handler.rate_limiter.is_healthy().await;

    let response = HealthCheckResponse {
        status: if store_healthy { "healthy" } else { "degraded" },
        uptime: format_duration(Duration::from_secs(uptime)).to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        rate_limit_backend: handler.rate_limiter.backend(),
        rate_limit_status: if store_healthy { "OK" } else { "Unavailable" },
        mail_transport: handler.mailer.transport(),
    };

    if store_healthy {
        HttpResponse::Ok().json(response)
    } else {
        tracing::warn!("Health check degraded: rate limit store unavailable");
        HttpResponse::ServiceUnavailable().json(response)
    }
}
