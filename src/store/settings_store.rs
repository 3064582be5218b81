use serde::Deserialize;
use tracing::{debug, warn};

/// where the upstream currently lives and which route namespace to try first
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    pub base_url: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// settings get re-read on every resolution so that a base-url or prefix edit
/// takes effect without restarting the process. The upstream moves domains
/// often enough that this matters
pub struct SettingsStore {
    path: String,
    default_base_url: String,
}

impl SettingsStore {
    pub fn new(path: String, default_base_url: String) -> Self {
        Self {
            path,
            default_base_url,
        }
    }

    pub async fn load(&self) -> UpstreamSettings {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str::<UpstreamSettings>(&raw) {
                Ok(mut settings) => {
                    // trailing slashes break the path joins later on
                    while settings.base_url.ends_with('/') {
                        settings.base_url.pop();
                    }
                    debug!("loaded upstream settings from {}", self.path);
                    settings
                }
                Err(e) => {
                    warn!("settings file {} is not valid JSON: {}", self.path, e);
                    self.fallback()
                }
            },
            Err(_) => self.fallback(),
        }
    }

    fn fallback(&self) -> UpstreamSettings {
        UpstreamSettings {
            base_url: self.default_base_url.clone(),
            prefix: None,
        }
    }
}
