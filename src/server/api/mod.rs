mod channel_controller;
mod health_controller;
mod stream_controller;

use axum::Router;
use axum::routing::get;

pub fn app() -> Router {
    Router::new()
        .merge(stream_controller::StreamController::app())
        .merge(channel_controller::ChannelController::app())
        .route("/health", get(health_controller::health_endpoint))
}
