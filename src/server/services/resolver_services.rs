use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::server::utils::retry_utils::with_retries;
use crate::store::SettingsStore;

// marker constant the handshake page defines, its presence is what proves we
// got a real player page and not an error shell
const CHANNEL_KEY_MARKER: &str = "CHANNEL_KEY";

// route namespaces the upstream has used historically, tried in order after
// the user-preferred one
const FALLBACK_PREFIXES: [&str; 5] = ["stream", "cast", "watch", "player", "casting"];

// ids longer than this are event-style ids served from a different path
const LONG_ID_THRESHOLD: usize = 3;

const MAX_RETRIES: usize = 3;

// successful resolutions are shared with concurrent callers for this long,
// just enough to absorb a thundering herd without serving a stale window
const RECENT_TTL: Duration = Duration::from_secs(5);

const INFLIGHT_WAIT: Duration = Duration::from_secs(45);

static IFRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"iframe src="(.*)" width"#).expect("notrace - static regex"));

static CHANNEL_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"const\s+CHANNEL_KEY\s*=\s*"(.*?)";"#).expect("notrace - static regex")
});

static BUNDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"const\s+XJZ\s*=\s*"(.*?)";"#).expect("notrace - static regex"));

/// resolution failures, the controller maps these onto HTTP statuses
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("channel id is required")]
    InvalidInput,

    #[error("failed to find source for channel")]
    SourceNotFound,

    #[error("handshake page missing {0}")]
    HandshakeIncomplete(&'static str),

    #[error("auth endpoint rejected the handshake ({0})")]
    AuthRejected(StatusCode),

    #[error("no server key found in response")]
    NoServerKey,

    #[error("failed to fetch manifest: {0}")]
    ManifestFetchFailed(String),
}

/// auth parameters embedded in the handshake page as an obfuscated bundle
#[derive(Debug, Clone, PartialEq)]
pub struct AuthBundle {
    pub ts: String,
    pub sig: String,
    pub rnd: String,
    pub host: String,
}

/// what a completed handshake yields: the raw origin manifest and the source
/// frame URL the rewriter needs for referer context
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    pub manifest: String,
    pub source_url: String,
}

/// the bundle is base64 of a JSON object whose values are base64 again. Not
/// the same scheme as our token codec, this one is the upstream's
pub fn decode_bundle(bundle: &str) -> Result<AuthBundle, ResolveError> {
    let mut padded = bundle.to_string();
    while !padded.len().is_multiple_of(4) {
        padded.push('=');
    }

    let raw = STANDARD
        .decode(&padded)
        .map_err(|_| ResolveError::HandshakeIncomplete("bundle encoding"))?;
    let fields: HashMap<String, String> = serde_json::from_slice(&raw)
        .map_err(|_| ResolveError::HandshakeIncomplete("bundle payload"))?;

    let field = |key: &str| -> Result<String, ResolveError> {
        let value = fields
            .get(key)
            .ok_or(ResolveError::HandshakeIncomplete("auth field"))?;
        let mut padded = value.clone();
        while !padded.len().is_multiple_of(4) {
            padded.push('=');
        }
        let bytes = STANDARD
            .decode(&padded)
            .map_err(|_| ResolveError::HandshakeIncomplete("auth field"))?;
        String::from_utf8(bytes).map_err(|_| ResolveError::HandshakeIncomplete("auth field"))
    };

    let bundle = AuthBundle {
        ts: field("b_ts")?,
        sig: field("b_sig")?,
        rnd: field("b_rnd")?,
        host: field("b_host")?,
    };

    if bundle.ts.is_empty() || bundle.sig.is_empty() || bundle.rnd.is_empty() || bundle.host.is_empty()
    {
        return Err(ResolveError::HandshakeIncomplete("auth field"));
    }

    Ok(bundle)
}

/// percent-encode the source frame URL for the manifest referer header the
/// way the origin validates it: everything escaped except slashes, which
/// stay literal
pub fn manifest_referer(source_url: &str) -> String {
    urlencoding::encode(source_url).replace("%2F", "/")
}

/// the origin names its hosts after the server key, with one legacy special
/// case that predates the naming convention
pub fn manifest_url(server_key: &str, channel_key: &str) -> String {
    if server_key == "top1/cdn" {
        format!("https://top1.newkso.ru/top1/cdn/{}/mono.m3u8", channel_key)
    } else {
        format!(
            "https://{}new.newkso.ru/{}/{}/mono.m3u8",
            server_key, server_key, channel_key
        )
    }
}

pub type DynStreamResolver = Arc<dyn StreamResolverTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait StreamResolverTrait {
    async fn resolve(&self, channel_id: &str) -> Result<ResolvedStream, ResolveError>;
}

pub struct StreamResolver {
    http: reqwest::Client,
    settings: Arc<SettingsStore>,
    inflight: Mutex<HashMap<String, Arc<Notify>>>,
    recent: Mutex<HashMap<String, (Instant, ResolvedStream)>>,
}

impl StreamResolver {
    pub fn new(http: reqwest::Client, settings: Arc<SettingsStore>) -> Self {
        Self {
            http,
            settings,
            inflight: Mutex::new(HashMap::new()),
            recent: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, channel_id: &str) -> Option<ResolvedStream> {
        let mut recent = self.recent.lock().expect("notrace - recent lock poisoned");
        recent.retain(|_, (at, _)| at.elapsed() < RECENT_TTL);
        recent.get(channel_id).map(|(_, resolved)| resolved.clone())
    }

    /// POST and read the body. Only transport errors burn the retry budget,
    /// a definite HTTP status means the prefix is wrong and the caller should
    /// move on immediately
    async fn post_text(&self, url: &str, referer: &str, what: &str) -> Result<String, reqwest::Error> {
        let response = with_retries(MAX_RETRIES, what, || {
            self.http
                .post(url)
                .header(reqwest::header::REFERER, referer)
                .send()
        })
        .await?;

        response.error_for_status()?.text().await
    }

    /// the full handshake: page discovery across prefixes, constant
    /// extraction, auth replay, server key lookup, manifest fetch
    async fn resolve_uncached(&self, channel_id: &str) -> Result<ResolvedStream, ResolveError> {
        let settings = self.settings.load().await;
        let base_url = settings.base_url;

        // preferred prefix first, then the fallbacks, deduped
        let preferred = settings.prefix.unwrap_or_default();
        let mut prefixes: Vec<&str> = Vec::new();
        for prefix in std::iter::once(preferred.trim()).chain(FALLBACK_PREFIXES) {
            if !prefix.is_empty() && !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }

        for prefix in prefixes {
            debug!("attempting to resolve {} with prefix {}", channel_id, prefix);

            let page_url = if channel_id.len() > LONG_ID_THRESHOLD {
                format!("{}/{}/bet.php?id=bet{}", base_url, prefix, channel_id)
            } else {
                format!("{}/{}/stream-{}.php", base_url, prefix, channel_id)
            };

            let page = match self.post_text(&page_url, &base_url, "channel page POST").await {
                Ok(page) => page,
                Err(e) => {
                    debug!("prefix {} page fetch failed for {}: {}", prefix, channel_id, e);
                    continue;
                }
            };

            let Some(captures) = IFRAME_RE.captures(&page) else {
                continue;
            };
            let source_url = captures[1].to_string();

            let body = match self.post_text(&source_url, &page_url, "source frame POST").await {
                Ok(body) => body,
                Err(e) => {
                    debug!("source frame fetch failed for {}: {}", channel_id, e);
                    continue;
                }
            };

            if !body.contains(CHANNEL_KEY_MARKER) {
                continue;
            }

            return self.finish_handshake(source_url, &body).await;
        }

        warn!("no prefix produced a handshake page for channel {}", channel_id);
        Err(ResolveError::SourceNotFound)
    }

    async fn finish_handshake(
        &self,
        source_url: String,
        body: &str,
    ) -> Result<ResolvedStream, ResolveError> {
        // the page redeclares these constants, the last declaration wins
        let channel_key = CHANNEL_KEY_RE
            .captures_iter(body)
            .last()
            .map(|cap| cap[1].to_string())
            .ok_or(ResolveError::HandshakeIncomplete("channel key"))?;
        let bundle = BUNDLE_RE
            .captures_iter(body)
            .last()
            .map(|cap| cap[1].to_string())
            .ok_or(ResolveError::HandshakeIncomplete("bundle"))?;

        let auth = decode_bundle(&bundle)?;

        let auth_url = format!(
            "{}auth.php?channel_id={}&ts={}&rnd={}&sig={}",
            auth.host, channel_key, auth.ts, auth.rnd, auth.sig
        );
        let auth_response = self
            .http
            .get(&auth_url)
            .header(reqwest::header::REFERER, &source_url)
            .send()
            .await
            .map_err(|_| ResolveError::AuthRejected(StatusCode::BAD_GATEWAY))?;
        if auth_response.status() != StatusCode::OK {
            return Err(ResolveError::AuthRejected(auth_response.status()));
        }

        let frame = url::Url::parse(&source_url)
            .map_err(|_| ResolveError::HandshakeIncomplete("source frame URL"))?;
        let mut netloc = frame.host_str().unwrap_or_default().to_string();
        if let Some(port) = frame.port() {
            netloc = format!("{}:{}", netloc, port);
        }

        let lookup_url = format!(
            "{}://{}/server_lookup.php?channel_id={}",
            frame.scheme(),
            netloc,
            channel_key
        );
        let lookup: serde_json::Value = self
            .http
            .get(&lookup_url)
            .header(reqwest::header::REFERER, &source_url)
            .send()
            .await
            .map_err(|_| ResolveError::NoServerKey)?
            .json()
            .await
            .map_err(|_| ResolveError::NoServerKey)?;
        let server_key = lookup
            .get("server_key")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(ResolveError::NoServerKey)?;

        let server_url = manifest_url(server_key, &channel_key);

        let referer = manifest_referer(&source_url);
        let manifest_response = with_retries(MAX_RETRIES, "manifest GET", || {
            self.http
                .get(&server_url)
                .header(reqwest::header::REFERER, &referer)
                .send()
        })
        .await
        .map_err(|e| ResolveError::ManifestFetchFailed(e.to_string()))?;

        let manifest = manifest_response
            .error_for_status()
            .map_err(|e| ResolveError::ManifestFetchFailed(e.to_string()))?
            .text()
            .await
            .map_err(|e| ResolveError::ManifestFetchFailed(e.to_string()))?;

        info!("resolved manifest via {}", server_key);

        Ok(ResolvedStream {
            manifest,
            source_url,
        })
    }
}

#[async_trait]
impl StreamResolverTrait for StreamResolver {
    async fn resolve(&self, channel_id: &str) -> Result<ResolvedStream, ResolveError> {
        if channel_id.is_empty() {
            return Err(ResolveError::InvalidInput);
        }

        if let Some(hit) = self.cached(channel_id) {
            debug!("serving recent resolution for channel {}", channel_id);
            return Ok(hit);
        }

        // coalesce concurrent resolutions of the same channel so we don't
        // replay the handshake in parallel and trip upstream rate limits
        let waiter = {
            let mut inflight = self
                .inflight
                .lock()
                .expect("notrace - inflight lock poisoned");
            match inflight.get(channel_id) {
                Some(notify) => Some(notify.clone()),
                None => {
                    inflight.insert(channel_id.to_string(), Arc::new(Notify::new()));
                    None
                }
            }
        };

        if let Some(notify) = waiter {
            debug!("waiting on inflight resolution for channel {}", channel_id);
            let _ = tokio::time::timeout(INFLIGHT_WAIT, notify.notified()).await;
            if let Some(hit) = self.cached(channel_id) {
                return Ok(hit);
            }
            // the leader failed, take over as the new leader
            let mut inflight = self
                .inflight
                .lock()
                .expect("notrace - inflight lock poisoned");
            inflight.insert(channel_id.to_string(), Arc::new(Notify::new()));
        }

        let result = self.resolve_uncached(channel_id).await;

        if let Ok(resolved) = &result {
            self.recent
                .lock()
                .expect("notrace - recent lock poisoned")
                .insert(channel_id.to_string(), (Instant::now(), resolved.clone()));
        }

        let notify = {
            let mut inflight = self
                .inflight
                .lock()
                .expect("notrace - inflight lock poisoned");
            inflight.remove(channel_id)
        };
        if let Some(notify) = notify {
            notify.notify_waiters();
        }

        result
    }
}
