use once_cell::sync::Lazy;
use regex::Regex;

use crate::server::dtos::channel_dto::Channel;
use crate::server::services::token_services::TokenCodec;

static KEY_URI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"URI="(.*?)""#).expect("notrace - static regex"));

/// rewrite an origin HLS manifest so every key URI, and with content proxying
/// enabled every init/media segment URI, points back through this service.
/// Keys are always proxied, browsers block the cross-origin fetch otherwise.
/// The appended .mp4/.ts extensions exist purely so players infer the
/// container type, the content route strips them again
pub fn rewrite_manifest(
    manifest: &str,
    source_url: &str,
    codec: &TokenCodec,
    api_url: &str,
    proxy_content: bool,
) -> String {
    let source_netloc = url::Url::parse(source_url)
        .ok()
        .map(|u| {
            let host = u.host_str().unwrap_or_default().to_string();
            match u.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            }
        })
        .unwrap_or_default();

    let mut out: Vec<String> = Vec::new();
    for line in manifest.lines() {
        if line.starts_with("#EXT-X-KEY:") {
            if let Some(cap) = KEY_URI_RE.captures(line) {
                let original = &cap[1];
                let replacement = format!(
                    "{}/key/{}/{}",
                    api_url,
                    codec.encode(original),
                    codec.encode(&source_netloc)
                );
                out.push(line.replace(original, &replacement));
                continue;
            }
            out.push(line.to_string());
        } else if line.starts_with("#EXT-X-MAP:") {
            if proxy_content {
                if let Some(cap) = KEY_URI_RE.captures(line) {
                    let original = &cap[1];
                    let replacement =
                        format!("{}/content/{}.mp4", api_url, codec.encode(original));
                    out.push(line.replace(original, &replacement));
                    continue;
                }
            }
            out.push(line.to_string());
        } else if !line.is_empty() && !line.starts_with('#') && proxy_content {
            // media segments are the plain non-comment lines
            out.push(format!("{}/content/{}.ts", api_url, codec.encode(line)));
        } else {
            out.push(line.to_string());
        }
    }

    out.join("\n") + "\n"
}

/// aggregate M3U for the given channels, every entry tunes through our own
/// stream route
pub fn build_playlist(channels: &[Channel], api_url: &str) -> String {
    let mut lines = vec!["#EXTM3U".to_string()];
    for channel in channels {
        let entry = if channel.logo.is_empty() {
            format!(",{}", channel.name)
        } else {
            format!(" tvg-logo=\"{}\",{}", channel.logo, channel.name)
        };
        lines.push(format!("#EXTINF:-1{}", entry));
        lines.push(format!("{}/stream/{}.m3u8", api_url, channel.id));
    }
    lines.join("\n") + "\n"
}
