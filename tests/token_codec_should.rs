use tvedge::server::services::token_services::{TokenCodec, urlsafe_unwrap, urlsafe_wrap};

#[test]
fn test_round_trip() {
    let codec = TokenCodec::new();
    let url = "https://cdn.example.com/segments/seg-001.ts?token=abc";

    let token = codec.encode(url);
    assert_eq!(codec.decode(&token).unwrap(), url);
}

#[test]
fn test_tokens_are_url_safe() {
    let codec = TokenCodec::new();
    // long enough to exercise plenty of base64 alphabet
    let url = "https://key-server.example.net:8443/keys/enc.key?id=1234567890&sig=zzzz";

    let token = codec.encode(url);
    assert!(
        token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        "token contains unsafe characters: {}",
        token
    );
}

#[test]
fn test_decode_rejects_foreign_tokens() {
    let codec = TokenCodec::new();

    // not base64 at all
    assert!(codec.decode("not/valid/base64!!").is_err());

    // a token minted by a different codec instance almost never survives the
    // utf8 check after xor with the wrong key
    let other = TokenCodec::new();
    let token = other.encode("https://cdn.example.com/a.ts");
    if let Ok(decoded) = codec.decode(&token) {
        assert_ne!(decoded, "https://cdn.example.com/a.ts");
    }
}

#[test]
fn test_decode_accepts_unpadded_tokens() {
    let codec = TokenCodec::new();
    // lengths that need 0, 1 and 2 padding characters after encoding
    for url in ["a", "ab", "abc", "abcd", "abcde"] {
        let token = codec.encode(url);
        assert!(!token.contains('='));
        assert_eq!(codec.decode(&token).unwrap(), url);
    }
}

#[test]
fn test_urlsafe_wrap_round_trip() {
    let logo = "https://img.example.com/logos/nick music.png";

    let wrapped = urlsafe_wrap(logo);
    assert!(!wrapped.contains('/'));
    assert_eq!(urlsafe_unwrap(&wrapped).unwrap(), logo);
}

#[test]
fn test_urlsafe_unwrap_rejects_garbage() {
    assert!(urlsafe_unwrap("%%%%").is_err());
}
