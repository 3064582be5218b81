use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tvedge::server::services::resolver_services::{
    ResolveError, StreamResolver, StreamResolverTrait, manifest_referer,
};
use tvedge::store::SettingsStore;

fn resolver_against(base_url: &str) -> StreamResolver {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    // nonexistent settings file, the store falls back to the given base url
    let settings = Arc::new(SettingsStore::new(
        "does-not-exist.json".to_string(),
        base_url.to_string(),
    ));
    StreamResolver::new(http, settings)
}

/// answers 404 to everything and counts how many requests arrive
async fn spawn_not_found_server(hits: Arc<AtomicUsize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let hits = hits.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                hits.fetch_add(1, Ordering::SeqCst);
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 404 Not Found\r\nconnection: close\r\ncontent-length: 0\r\n\r\n",
                    )
                    .await;
            });
        }
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_empty_channel_id_is_rejected() {
    let resolver = resolver_against("http://127.0.0.1:1");
    assert!(matches!(
        resolver.resolve("").await,
        Err(ResolveError::InvalidInput)
    ));
}

#[tokio::test]
async fn test_unreachable_upstream_yields_source_not_found() {
    // connections to a closed local port are refused immediately, so every
    // prefix burns through its transport retries and the whole loop has to
    // come back as a clean error
    let resolver = resolver_against("http://127.0.0.1:1");

    assert!(matches!(
        resolver.resolve("123").await,
        Err(ResolveError::SourceNotFound)
    ));
}

#[tokio::test]
async fn test_missing_pages_fail_fast_to_the_next_prefix() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base_url = spawn_not_found_server(hits.clone()).await;
    let resolver = resolver_against(&base_url);

    assert!(matches!(
        resolver.resolve("12").await,
        Err(ResolveError::SourceNotFound)
    ));

    // a definite 404 is not a transport error, so each of the five fallback
    // prefixes gets exactly one page request and no retries
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

#[test]
fn test_manifest_referer_keeps_slashes_literal() {
    assert_eq!(
        manifest_referer("https://player.example.net/premiumtv/daddyhd.php?id=325"),
        "https%3A//player.example.net/premiumtv/daddyhd.php%3Fid%3D325"
    );
}
