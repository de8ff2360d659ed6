use std::{sync::Arc, time::Duration};

use actix_cors::Cors;
use anyhow::Context;
use actix_web::{http::header, middleware::NormalizePath, web, App, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use club_backend::{
    background_task::start_eviction_task,
    graceful_shutdown::shutdown_signal,
    limiter::{InMemoryRateLimitStore, RedisRateLimitStore},
    mail::{build_transport, mail_queue},
    repositories::{mailer::Mailer, rate_limit::RateLimitStore},
    routes::configure_routes,
    settings::{AppConfig, MailDelivery},
    AppState,
};

const QUEUE_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }

    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn build_rate_limiter(config: &AppConfig) -> anyhow::Result<Arc<dyn RateLimitStore>> {
    let contact = &config.contact;

    match &config.redis_url {
        Some(url) => {
            let store = RedisRateLimitStore::new(url, contact.key_prefix.clone(), contact.max_attempts, contact.window())
                .context("Failed to create Redis rate limit store")?;
            tracing::info!("Rate limiting contact submissions through Redis");
            Ok(Arc::new(store))
        }
        None => {
            let store = InMemoryRateLimitStore::new(contact.max_attempts, contact.window());
            tokio::spawn(start_eviction_task(store.clone(), contact.window()));
            tracing::info!("Rate limiting contact submissions in memory");
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(false);
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.is_production());
    tracing::info!("Loaded configuration: {:?}", config);

    let rate_limiter = build_rate_limiter(&config)?;

    let transport = build_transport(&config.mail).context("Failed to build mail transport")?;

    let (mailer, queue_worker): (Arc<dyn Mailer>, _) = match config.mail.delivery {
        MailDelivery::Sync => (transport, None),
        MailDelivery::Queued => {
            let (queued, worker) = mail_queue(transport, config.mail.queue_capacity, config.mail.max_retries);
            (Arc::new(queued), Some(tokio::spawn(worker.run())))
        }
    };

    let app_state = web::Data::new(AppState::new(&config, rate_limiter, mailer));

    let server_addr = format!("{}:{}", config.host, config.port);
    let cors_origins = config.cors_origins();

    tracing::info!(
        "🚀 Starting {} contact API v{} on {}",
        config.name,
        env!("CARGO_PKG_VERSION"),
        server_addr
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(NormalizePath::trim())
            .wrap(build_cors(&cors_origins))
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .workers(config.worker_count)
    .disable_signals()
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run();

    let server_handle = server.handle();

    tokio::select! {
        res = server => res?,
        _ = shutdown_signal() => {
            server_handle.stop(true).await;
        }
    }

    if let Some(worker) = queue_worker {
        tracing::info!("Draining mail queue...");
        match tokio::time::timeout(QUEUE_DRAIN_TIMEOUT, worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Mail queue worker failed: {}", e),
            Err(_) => tracing::warn!("Mail queue not drained within {:?}, pending mail dropped", QUEUE_DRAIN_TIMEOUT),
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
