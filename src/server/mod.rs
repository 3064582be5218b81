pub mod api;
pub mod dtos;
pub mod error;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::Extension;
use axum::http::HeaderValue;
use once_cell::sync::Lazy;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::server::services::app_services::AppServices;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn get_uptime_seconds() -> u64 {
    START_TIME.elapsed().as_secs()
}

pub struct ApplicationServer;

impl ApplicationServer {
    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        // touch the start instant before anything else so uptime is honest
        Lazy::force(&START_TIME);

        let services = AppServices::new(config.clone())?;

        // initial load plus the periodic refresh loop, failures in here only
        // ever log, the previous snapshot stays live
        services::channel_services::spawn_refresh_loop(services.channels.clone());

        let cors = match config.cors_origin.as_str() {
            "*" => CorsLayer::new().allow_origin(Any).allow_methods(Any),
            origins => {
                let parsed: Vec<HeaderValue> = origins
                    .split(',')
                    .filter_map(|origin| origin.trim().parse().ok())
                    .collect();
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(parsed))
                    .allow_methods(Any)
            }
        };

        let router = api::app()
            .layer(Extension(services))
            .layer(cors)
            .layer(TraceLayer::new_for_http());

        let addr = format!("0.0.0.0:{}", config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .context("failed to bind server port")?;

        info!("server listening on {}", addr);

        axum::serve(listener, router)
            .await
            .context("server stopped unexpectedly")?;

        Ok(())
    }
}
