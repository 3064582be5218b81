use axum::{
    Extension, Json, Router,
    extract::Path,
    routing::{get, post},
};
use serde_json::{Value, json};
use tracing::info;

use crate::server::{
    dtos::channel_dto::Channel,
    error::{AppResult, Error},
    services::app_services::AppServices,
    services::schedule_services::filter_schedule,
};

pub struct ChannelController;

impl ChannelController {
    pub fn app() -> Router {
        Router::new()
            .route("/channels", get(Self::channels))
            .route("/channels/{channel_id}", get(Self::channel))
            .route("/schedule", get(Self::schedule))
            .route("/refresh", post(Self::refresh))
    }

    async fn channels(Extension(services): Extension<AppServices>) -> Json<Vec<Channel>> {
        Json(services.channels.snapshot().to_vec())
    }

    async fn channel(
        Extension(services): Extension<AppServices>,
        Path(channel_id): Path<String>,
    ) -> AppResult<Json<Channel>> {
        services
            .channels
            .channel(&channel_id)
            .map(Json)
            .ok_or_else(|| Error::NotFound(format!("channel {} not found", channel_id)))
    }

    /// the upstream schedule cross-referenced against the directory and cut
    /// down to enabled channels, this is what guide generation consumes
    async fn schedule(Extension(services): Extension<AppServices>) -> AppResult<Json<Value>> {
        let raw = services.schedule.fetch_raw().await?;
        let channels = services.channels.snapshot();

        let enabled = match services.selection.enabled_ids().await {
            Some(ids) => ids,
            None => channels.iter().map(|ch| ch.id.clone()).collect(),
        };

        Ok(Json(filter_schedule(&raw, &channels, &enabled)))
    }

    async fn refresh(Extension(services): Extension<AppServices>) -> AppResult<Json<Value>> {
        info!("manual refresh requested");
        services.channels.refresh().await?;
        info!("manual refresh complete");
        Ok(Json(json!({ "status": "ok" })))
    }
}
