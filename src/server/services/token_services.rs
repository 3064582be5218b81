use base64::Engine as _;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use rand::RngCore;

const KEY_LEN: usize = 64;

/// a token that didn't come from this process instance, either forged or
/// issued before a restart
#[derive(thiserror::Error, Debug)]
#[error("invalid token")]
pub struct DecodeError;

/// reversible obfuscation of origin URLs so they can ride inside our own
/// path segments. XOR against process-lifetime key material then url-safe
/// base64 without padding. This is traversal/tamper resistance, not crypto,
/// and tokens die with the process since the key is regenerated on start
pub struct TokenCodec {
    key: [u8; KEY_LEN],
}

impl TokenCodec {
    pub fn new() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut key);
        Self { key }
    }

    pub fn encode(&self, plain: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.xor(plain.as_bytes()))
    }

    pub fn decode(&self, token: &str) -> Result<String, DecodeError> {
        let mut padded = token.to_string();
        while !padded.len().is_multiple_of(4) {
            padded.push('=');
        }

        let bytes = URL_SAFE.decode(&padded).map_err(|_| DecodeError)?;
        String::from_utf8(self.xor(&bytes)).map_err(|_| DecodeError)
    }

    // xor is its own inverse so encode and decode share this
    fn xor(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ self.key[i % KEY_LEN])
            .collect()
    }
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// plain reversible wrapping for logo references. Logos aren't replayed
/// against the handshake so they don't need the keyed codec
pub fn urlsafe_wrap(input: &str) -> String {
    URL_SAFE.encode(input.as_bytes())
}

pub fn urlsafe_unwrap(token: &str) -> Result<String, DecodeError> {
    let mut padded = token.to_string();
    while !padded.len().is_multiple_of(4) {
        padded.push('=');
    }

    let bytes = URL_SAFE.decode(&padded).map_err(|_| DecodeError)?;
    String::from_utf8(bytes).map_err(|_| DecodeError)
}
