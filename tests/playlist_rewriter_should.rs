use tvedge::server::dtos::channel_dto::Channel;
use tvedge::server::services::playlist_services::{build_playlist, rewrite_manifest};
use tvedge::server::services::token_services::TokenCodec;

const SOURCE_URL: &str = "https://player.example.net:8443/premiumtv/daddyhd.php?id=325";

const MANIFEST: &str = "#EXTM3U\n\
#EXT-X-VERSION:6\n\
#EXT-X-TARGETDURATION:6\n\
#EXT-X-MAP:URI=\"https://cdn.example/init.mp4\"\n\
#EXT-X-KEY:METHOD=AES-128,URI=\"https://keys.example/enc.key\",IV=0xabcdef\n\
#EXTINF:6.0,\n\
https://cdn.example/seg1.ts\n\
#EXTINF:6.0,\n\
https://cdn.example/seg2.ts\n";

#[test]
fn test_rewrites_key_map_and_segments_when_proxying() {
    let codec = TokenCodec::new();
    let out = rewrite_manifest(MANIFEST, SOURCE_URL, &codec, "http://localhost:5000", true);

    // nothing points at the origin any more
    for line in out.lines() {
        if line.starts_with('#') {
            assert!(!line.contains("https://keys.example"), "line: {}", line);
            assert!(!line.contains("https://cdn.example"), "line: {}", line);
        } else if !line.is_empty() {
            assert!(line.starts_with("http://localhost:5000/content/"), "line: {}", line);
            assert!(line.ends_with(".ts"), "line: {}", line);
        }
    }

    let key_line = out
        .lines()
        .find(|l| l.starts_with("#EXT-X-KEY:"))
        .unwrap();
    assert!(key_line.contains("URI=\"http://localhost:5000/key/"));
    // everything around the URI survives untouched
    assert!(key_line.starts_with("#EXT-X-KEY:METHOD=AES-128,"));
    assert!(key_line.ends_with(",IV=0xabcdef"));

    let map_line = out
        .lines()
        .find(|l| l.starts_with("#EXT-X-MAP:"))
        .unwrap();
    assert!(map_line.contains("URI=\"http://localhost:5000/content/"));
    assert!(map_line.contains(".mp4\""));
}

#[test]
fn test_segment_tokens_decode_back_to_origin() {
    let codec = TokenCodec::new();
    let out = rewrite_manifest(MANIFEST, SOURCE_URL, &codec, "http://localhost:5000", true);

    let first_segment = out
        .lines()
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .unwrap();
    let token = first_segment
        .strip_prefix("http://localhost:5000/content/")
        .unwrap()
        .strip_suffix(".ts")
        .unwrap();

    assert_eq!(codec.decode(token).unwrap(), "https://cdn.example/seg1.ts");
}

#[test]
fn test_key_host_token_carries_source_netloc() {
    let codec = TokenCodec::new();
    let out = rewrite_manifest(MANIFEST, SOURCE_URL, &codec, "http://localhost:5000", true);

    let key_line = out
        .lines()
        .find(|l| l.starts_with("#EXT-X-KEY:"))
        .unwrap();
    let uri = key_line
        .split("URI=\"")
        .nth(1)
        .unwrap()
        .split('"')
        .next()
        .unwrap();
    let host_token = uri.rsplit('/').next().unwrap();

    assert_eq!(codec.decode(host_token).unwrap(), "player.example.net:8443");
}

#[test]
fn test_only_keys_are_rewritten_when_proxying_is_off() {
    let codec = TokenCodec::new();
    let out = rewrite_manifest(MANIFEST, SOURCE_URL, &codec, "http://localhost:5000", false);

    // keys still come through us, browsers refuse the cross-origin fetch
    let key_line = out
        .lines()
        .find(|l| l.starts_with("#EXT-X-KEY:"))
        .unwrap();
    assert!(key_line.contains("http://localhost:5000/key/"));

    // segments and the init map stay on the origin
    assert!(out.contains("#EXT-X-MAP:URI=\"https://cdn.example/init.mp4\""));
    assert!(out.contains("\nhttps://cdn.example/seg1.ts\n"));
    assert!(out.contains("\nhttps://cdn.example/seg2.ts\n"));
}

#[test]
fn test_output_ends_with_newline() {
    let codec = TokenCodec::new();
    let out = rewrite_manifest("#EXTM3U", SOURCE_URL, &codec, "http://localhost:5000", true);
    assert_eq!(out, "#EXTM3U\n");
}

#[test]
fn test_builds_aggregate_playlist() {
    let channels = vec![
        Channel {
            id: "325".to_string(),
            name: "ESPN USA".to_string(),
            tags: vec!["sports".to_string()],
            logo: "http://localhost:5000/logo/abc".to_string(),
        },
        Channel {
            id: "51".to_string(),
            name: "BBC One".to_string(),
            tags: Vec::new(),
            logo: String::new(),
        },
    ];

    let playlist = build_playlist(&channels, "http://localhost:5000");
    let lines: Vec<&str> = playlist.lines().collect();

    assert_eq!(lines[0], "#EXTM3U");
    assert_eq!(
        lines[1],
        "#EXTINF:-1 tvg-logo=\"http://localhost:5000/logo/abc\",ESPN USA"
    );
    assert_eq!(lines[2], "http://localhost:5000/stream/325.m3u8");
    // no logo, no tvg attribute
    assert_eq!(lines[3], "#EXTINF:-1,BBC One");
    assert_eq!(lines[4], "http://localhost:5000/stream/51.m3u8");
    assert!(playlist.ends_with('\n'));
}
