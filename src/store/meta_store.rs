use std::collections::HashMap;

use serde::Deserialize;
use tracing::{info, warn};

/// display metadata attached to a channel, keyed by cleaned channel name
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChannelMeta {
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// static name -> metadata lookup plus the per-id/per-name correction table
/// for the names the upstream gets wrong. Both are plain JSON files so they
/// can be swapped without touching code
pub struct MetaStore {
    meta: HashMap<String, ChannelMeta>,
    id_overrides: HashMap<String, String>,
    name_overrides: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct NameOverridesFile {
    #[serde(default)]
    by_id: HashMap<String, String>,
    #[serde(default)]
    by_name: HashMap<String, String>,
}

impl MetaStore {
    pub fn load(meta_path: &str, overrides_path: Option<&str>) -> Self {
        let meta = match std::fs::read_to_string(meta_path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, ChannelMeta>>(&raw) {
                Ok(meta) => {
                    info!("loaded metadata for {} channel names", meta.len());
                    meta
                }
                Err(e) => {
                    warn!("metadata file {} is not valid JSON: {}", meta_path, e);
                    HashMap::new()
                }
            },
            Err(e) => {
                warn!("no channel metadata at {}: {}", meta_path, e);
                HashMap::new()
            }
        };

        // observed upstream inconsistencies, overridable from a file but these
        // defaults match what the site actually serves wrong today
        let mut id_overrides: HashMap<String, String> = HashMap::from([
            ("666".to_string(), "Nick Music".to_string()),
            ("609".to_string(), "Yas TV UAE".to_string()),
        ]);
        let mut name_overrides: HashMap<String, String> = HashMap::from([
            ("#0 Spain".to_string(), "Movistar Plus+".to_string()),
            ("#Vamos Spain".to_string(), "Vamos Spain".to_string()),
        ]);

        if let Some(path) = overrides_path {
            match std::fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|raw| {
                    serde_json::from_str::<NameOverridesFile>(&raw).map_err(|e| e.to_string())
                }) {
                Ok(file) => {
                    id_overrides.extend(file.by_id);
                    name_overrides.extend(file.by_name);
                }
                Err(e) => warn!("ignoring name overrides file {}: {}", path, e),
            }
        }

        Self {
            meta,
            id_overrides,
            name_overrides,
        }
    }

    /// no metadata file, built-in corrections only
    pub fn empty() -> Self {
        Self {
            meta: HashMap::new(),
            id_overrides: HashMap::from([
                ("666".to_string(), "Nick Music".to_string()),
                ("609".to_string(), "Yas TV UAE".to_string()),
            ]),
            name_overrides: HashMap::from([
                ("#0 Spain".to_string(), "Movistar Plus+".to_string()),
                ("#Vamos Spain".to_string(), "Vamos Spain".to_string()),
            ]),
        }
    }

    pub fn meta_for(&self, clean_name: &str) -> Option<&ChannelMeta> {
        self.meta.get(clean_name)
    }

    /// corrected display name, id overrides win over exact-name overrides
    pub fn corrected_name(&self, id: &str, raw_name: &str) -> String {
        if let Some(name) = self.id_overrides.get(id) {
            return name.clone();
        }
        if let Some(name) = self.name_overrides.get(raw_name) {
            return name.clone();
        }
        raw_name.to_string()
    }
}
