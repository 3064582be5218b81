use axum::{
    Extension, Router,
    body::Body,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{error, warn};

use crate::server::{
    error::{AppResult, Error},
    services::app_services::AppServices,
    services::playlist_services,
    services::resolver_services::ResolveError,
};

#[derive(Deserialize)]
struct PlaylistQuery {
    download: Option<String>,
    view: Option<String>,
}

pub struct StreamController;

impl StreamController {
    pub fn app() -> Router {
        Router::new()
            .route("/stream/{channel_id}", get(Self::stream))
            .route("/key/{url}/{host}", get(Self::key))
            .route("/content/{path}", get(Self::content))
            .route("/playlist.m3u8", get(Self::playlist))
            .route("/logo/{logo}", get(Self::logo))
    }

    async fn stream(
        Extension(services): Extension<AppServices>,
        Path(channel_id): Path<String>,
    ) -> AppResult<Response> {
        // requests come in as /stream/{id}.m3u8
        let channel_id = channel_id.trim_end_matches(".m3u8").to_string();
        if channel_id.is_empty() {
            return Err(Error::BadRequest("channel id is required".to_string()));
        }

        let resolved = services
            .resolver
            .resolve(&channel_id)
            .await
            .map_err(|e| match e {
                ResolveError::InvalidInput => Error::BadRequest(e.to_string()),
                ResolveError::SourceNotFound => {
                    warn!("stream not available for {}: {}", channel_id, e);
                    Error::NotFound("stream not found".to_string())
                }
                other => {
                    error!("stream resolution failed for {}: {}", channel_id, other);
                    Error::InternalServerErrorWithContext(other.to_string())
                }
            })?;

        let body = playlist_services::rewrite_manifest(
            &resolved.manifest,
            &resolved.source_url,
            &services.codec,
            &services.config.api_url,
            services.config.proxy_content,
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/vnd.apple.mpegurl"
                .parse()
                .expect("Static header value should parse"),
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}.m3u8", channel_id)
                .parse()
                .map_err(|_| Error::BadRequest("invalid channel id".to_string()))?,
        );

        Ok((StatusCode::OK, headers, body).into_response())
    }

    async fn key(
        Extension(services): Extension<AppServices>,
        Path((url, host)): Path<(String, String)>,
    ) -> AppResult<Response> {
        let bytes = services.proxy.fetch_key(&url, &host).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/octet-stream"
                .parse()
                .expect("Static header value should parse"),
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            "attachment; filename=key"
                .parse()
                .expect("Static header value should parse"),
        );

        Ok((StatusCode::OK, headers, bytes).into_response())
    }

    async fn content(
        Extension(services): Extension<AppServices>,
        Path(path): Path<String>,
    ) -> AppResult<Response> {
        let origin = services.proxy.open_content(&path).await?;

        // hand the origin body straight through without buffering it
        let stream = origin.bytes_stream();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/octet-stream"
                .parse()
                .expect("Static header value should parse"),
        );

        Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
    }

    async fn playlist(
        Extension(services): Extension<AppServices>,
        Query(params): Query<PlaylistQuery>,
    ) -> AppResult<Response> {
        let channels = services.channels.snapshot();
        let enabled = services.selection.enabled_ids().await;

        let filtered: Vec<_> = match &enabled {
            Some(ids) => channels
                .iter()
                .filter(|ch| ids.contains(&ch.id))
                .cloned()
                .collect(),
            None => channels.to_vec(),
        };

        let body = playlist_services::build_playlist(&filtered, &services.config.api_url);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CACHE_CONTROL,
            "no-store".parse().expect("Static header value should parse"),
        );

        let content_type = if params.view.is_some() {
            // render as text in the browser instead of triggering a player
            "text/plain; charset=utf-8"
        } else {
            "application/vnd.apple.mpegurl"
        };
        headers.insert(
            header::CONTENT_TYPE,
            content_type
                .parse()
                .expect("Static header value should parse"),
        );

        if params.download.is_some() {
            headers.insert(
                header::CONTENT_DISPOSITION,
                "attachment; filename=playlist.m3u8"
                    .parse()
                    .expect("Static header value should parse"),
            );
        }

        Ok((StatusCode::OK, headers, body).into_response())
    }

    async fn logo(
        Extension(services): Extension<AppServices>,
        Path(logo): Path<String>,
    ) -> AppResult<Response> {
        let origin = services.proxy.open_logo(&logo).await?;

        let content_type = origin
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            content_type.parse().unwrap_or_else(|_| {
                "image/png".parse().expect("Static header value should parse")
            }),
        );

        Ok((
            StatusCode::OK,
            headers,
            Body::from_stream(origin.bytes_stream()),
        )
            .into_response())
    }
}
