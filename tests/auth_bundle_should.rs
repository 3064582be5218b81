use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tvedge::server::services::resolver_services::{ResolveError, decode_bundle, manifest_url};

fn encode_bundle(fields: &[(&str, &str)]) -> String {
    let wrapped: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), json!(STANDARD.encode(v))))
        .collect();
    STANDARD.encode(serde_json::to_vec(&wrapped).unwrap())
}

#[test]
fn test_decodes_doubly_encoded_bundle() {
    let token = encode_bundle(&[
        ("b_ts", "1712345678"),
        ("b_sig", "deadbeef"),
        ("b_rnd", "k3j2h1"),
        ("b_host", "https://auth.example.net/"),
    ]);

    let bundle = decode_bundle(&token).unwrap();
    assert_eq!(bundle.ts, "1712345678");
    assert_eq!(bundle.sig, "deadbeef");
    assert_eq!(bundle.rnd, "k3j2h1");
    assert_eq!(bundle.host, "https://auth.example.net/");
}

#[test]
fn test_decodes_bundle_with_padding_stripped() {
    let token = encode_bundle(&[
        ("b_ts", "1712345678"),
        ("b_sig", "deadbeef"),
        ("b_rnd", "k3j2h1"),
        ("b_host", "https://auth.example.net/"),
    ]);
    let stripped = token.trim_end_matches('=');

    assert!(decode_bundle(stripped).is_ok());
}

#[test]
fn test_missing_field_is_rejected() {
    let token = encode_bundle(&[
        ("b_ts", "1712345678"),
        ("b_sig", "deadbeef"),
        ("b_rnd", "k3j2h1"),
    ]);

    assert!(matches!(
        decode_bundle(&token),
        Err(ResolveError::HandshakeIncomplete(_))
    ));
}

#[test]
fn test_empty_field_is_rejected() {
    let token = encode_bundle(&[
        ("b_ts", "1712345678"),
        ("b_sig", ""),
        ("b_rnd", "k3j2h1"),
        ("b_host", "https://auth.example.net/"),
    ]);

    assert!(decode_bundle(&token).is_err());
}

#[test]
fn test_garbage_is_rejected() {
    assert!(decode_bundle("not-base64-at-all!!!").is_err());
    // valid base64 but not JSON underneath
    assert!(decode_bundle(&STANDARD.encode("hello world")).is_err());
}

#[test]
fn test_manifest_url_follows_server_key() {
    assert_eq!(
        manifest_url("wind", "premium325"),
        "https://windnew.newkso.ru/wind/premium325/mono.m3u8"
    );
}

#[test]
fn test_manifest_url_legacy_special_case() {
    assert_eq!(
        manifest_url("top1/cdn", "premium325"),
        "https://top1.newkso.ru/top1/cdn/premium325/mono.m3u8"
    );
}
