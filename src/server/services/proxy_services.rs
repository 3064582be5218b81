use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, error};

use crate::server::error::{AppResult, Error};
use crate::server::services::token_services::{TokenCodec, urlsafe_unwrap};

const KEY_TIMEOUT: Duration = Duration::from_secs(60);
const CONTENT_TIMEOUT: Duration = Duration::from_secs(60);

pub type DynProxyService = Arc<dyn ProxyServiceTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait ProxyServiceTrait {
    /// decode both tokens and fetch the encryption key from the origin,
    /// replaying the referer/origin context the CDN expects
    async fn fetch_key(&self, encoded_url: &str, encoded_host: &str) -> AppResult<Vec<u8>>;

    /// decode a content token (extension already appended by the rewriter)
    /// and open the origin response for streaming
    async fn open_content(&self, path: &str) -> AppResult<reqwest::Response>;

    /// plain base64 logo reference, passed through without caching
    async fn open_logo(&self, token: &str) -> AppResult<reqwest::Response>;
}

pub struct ProxyService {
    http: reqwest::Client,
    codec: Arc<TokenCodec>,
}

impl ProxyService {
    pub fn new(http: reqwest::Client, codec: Arc<TokenCodec>) -> Self {
        Self { http, codec }
    }
}

#[async_trait]
impl ProxyServiceTrait for ProxyService {
    async fn fetch_key(&self, encoded_url: &str, encoded_host: &str) -> AppResult<Vec<u8>> {
        // a decode failure means a forged token or one issued before the
        // last restart, either way it's the client's problem
        let url = self
            .codec
            .decode(encoded_url)
            .map_err(|_| Error::BadRequest("invalid key parameters".to_string()))?;
        let host = self
            .codec
            .decode(encoded_host)
            .map_err(|_| Error::BadRequest("invalid key parameters".to_string()))?;

        if url.is_empty() || host.is_empty() {
            return Err(Error::BadRequest("invalid key parameters".to_string()));
        }

        debug!("fetching key from {}", url);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::REFERER, format!("{}/", host))
            .header(reqwest::header::ORIGIN, &host)
            .timeout(KEY_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                error!("key fetch failed: {}", e);
                Error::InternalServerErrorWithContext(format!("key fetch failed: {}", e))
            })?;

        if response.status() != reqwest::StatusCode::OK {
            error!("key endpoint returned {}", response.status());
            return Err(Error::InternalServerErrorWithContext(
                "failed to get key".to_string(),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            Error::InternalServerErrorWithContext(format!("failed to read key bytes: {}", e))
        })?;

        Ok(bytes.to_vec())
    }

    async fn open_content(&self, path: &str) -> AppResult<reqwest::Response> {
        // strip the container extension the rewriter appended
        let core = path.rsplit_once('.').map(|(core, _)| core).unwrap_or(path);

        let url = self
            .codec
            .decode(core)
            .map_err(|_| Error::BadRequest("invalid content path".to_string()))?;

        debug!("proxying content from {}", url);

        let response = self
            .http
            .get(&url)
            .timeout(CONTENT_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                error!("content fetch failed: {}", e);
                Error::InternalServerErrorWithContext(format!("content fetch failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(Error::InternalServerErrorWithContext(format!(
                "origin returned {}",
                response.status()
            )));
        }

        Ok(response)
    }

    async fn open_logo(&self, token: &str) -> AppResult<reqwest::Response> {
        let url = urlsafe_unwrap(token)
            .map_err(|_| Error::BadRequest("invalid logo reference".to_string()))?;

        let response = self.http.get(&url).send().await.map_err(|e| {
            error!("logo fetch failed: {}", e);
            Error::InternalServerErrorWithContext(format!("logo fetch failed: {}", e))
        })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::NotFound("logo not found".to_string()));
        }

        Ok(response)
    }
}
