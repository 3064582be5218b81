use std::collections::HashSet;

use tracing::warn;

/// reads the set of enabled channel ids. The file is written by the settings
/// UI which is not our problem here, we only ever consume it
pub struct SelectionStore {
    path: String,
}

impl SelectionStore {
    pub fn new(path: String) -> Self {
        Self { path }
    }

    /// returns the enabled ids, or None when no valid selection exists which
    /// callers treat as "everything enabled"
    pub async fn enabled_ids(&self) -> Option<HashSet<String>> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Some(ids.into_iter().collect()),
            Err(e) => {
                warn!(
                    "channel selection file {} is not a JSON string array, using all channels: {}",
                    self.path, e
                );
                None
            }
        }
    }
}
