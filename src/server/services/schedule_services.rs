use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::error;

use crate::server::dtos::channel_dto::Channel;
use crate::server::error::{AppResult, Error};
use crate::store::SettingsStore;

pub type DynScheduleService = Arc<dyn ScheduleServiceTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait ScheduleServiceTrait {
    /// raw upstream schedule payload: day -> category -> [events]
    async fn fetch_raw(&self) -> AppResult<Value>;
}

pub struct ScheduleService {
    http: reqwest::Client,
    settings: Arc<SettingsStore>,
}

impl ScheduleService {
    pub fn new(http: reqwest::Client, settings: Arc<SettingsStore>) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl ScheduleServiceTrait for ScheduleService {
    async fn fetch_raw(&self) -> AppResult<Value> {
        let settings = self.settings.load().await;
        let url = format!("{}/schedule/schedule-generated.php", settings.base_url);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::REFERER, &settings.base_url)
            .send()
            .await
            .map_err(|e| {
                error!("failed to fetch upstream schedule: {}", e);
                Error::InternalServerErrorWithContext(format!("failed to fetch schedule: {}", e))
            })?;

        let data: Value = response.json().await.map_err(|e| {
            error!("schedule response is not valid JSON: {}", e);
            Error::InternalServerErrorWithContext("invalid schedule response".to_string())
        })?;

        if data.is_object() {
            Ok(data)
        } else {
            error!("unexpected schedule payload type");
            Ok(json!({}))
        }
    }
}

/// the upstream nests channel lists as either arrays or id-keyed maps
/// depending on the day, so walk both shapes
pub fn iter_channel_entries(value: Option<&Value>) -> Vec<&Map<String, Value>> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_object()).collect(),
        Some(Value::Object(map)) => map.values().filter_map(|v| v.as_object()).collect(),
        _ => Vec::new(),
    }
}

pub fn entry_id(entry: &Map<String, Value>) -> String {
    match entry.get("channel_id") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

pub fn entry_name(entry: &Map<String, Value>) -> String {
    match entry.get("channel_name") {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

// simplified channel name used to repair upstream id/name mismatches
fn norm(name: &str) -> String {
    static NON_WORD: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"\W+").expect("notrace - static regex"));
    NON_WORD.replace_all(name, "").to_lowercase()
}

/// filter the raw schedule down to enabled channels only. Events whose
/// channel lists empty out entirely are dropped, as are empty categories and
/// days, so the guide never shows an event nobody can tune to
pub fn filter_schedule(
    schedule: &Value,
    channels: &[Channel],
    enabled: &HashSet<String>,
) -> Value {
    let id_to_name: HashMap<&str, &str> = channels
        .iter()
        .map(|ch| (ch.id.as_str(), ch.name.as_str()))
        .collect();

    // prefer enabled channels when multiple share a normalized name
    let mut name_to_id: HashMap<String, &str> = HashMap::new();
    for ch in channels {
        let key = norm(&ch.name);
        if !name_to_id.contains_key(&key) || enabled.contains(&ch.id) {
            name_to_id.insert(key, ch.id.as_str());
        }
    }

    let resolve = |entry: &Map<String, Value>| -> Option<Value> {
        let mut cid = entry_id(entry);
        let name = entry_name(entry);
        let mapped = name_to_id.get(&norm(&name)).copied();

        // the schedule sometimes carries a stale id for a renamed channel,
        // trust the name lookup when id and name disagree
        if id_to_name.get(cid.as_str()).copied() != Some(name.as_str()) {
            match mapped {
                Some(id) => cid = id.to_string(),
                None => return None,
            }
        }

        if !enabled.contains(&cid) {
            return None;
        }

        let mut fixed = entry.clone();
        fixed.insert("channel_id".to_string(), Value::String(cid));
        Some(Value::Object(fixed))
    };

    let filter_list = |value: Option<&Value>| -> Vec<Value> {
        iter_channel_entries(value)
            .into_iter()
            .filter_map(|entry| resolve(entry))
            .collect()
    };

    let mut filtered = Map::new();
    let Some(days) = schedule.as_object() else {
        return Value::Object(filtered);
    };

    for (day, categories) in days {
        let Some(categories) = categories.as_object() else {
            continue;
        };
        let mut day_out = Map::new();
        for (category, events) in categories {
            let Some(events) = events.as_array() else {
                continue;
            };
            let mut events_out = Vec::new();
            for event in events {
                let Some(event) = event.as_object() else {
                    continue;
                };
                let ch1 = filter_list(event.get("channels"));
                let ch2 = filter_list(event.get("channels2"));
                if ch1.is_empty() && ch2.is_empty() {
                    continue;
                }
                let mut event_out = event.clone();
                if ch1.is_empty() {
                    event_out.remove("channels");
                } else {
                    event_out.insert("channels".to_string(), Value::Array(ch1));
                }
                if ch2.is_empty() {
                    event_out.remove("channels2");
                } else {
                    event_out.insert("channels2".to_string(), Value::Array(ch2));
                }
                events_out.push(Value::Object(event_out));
            }
            if !events_out.is_empty() {
                day_out.insert(category.clone(), Value::Array(events_out));
            }
        }
        if !day_out.is_empty() {
            filtered.insert(day.clone(), Value::Object(day_out));
        }
    }

    Value::Object(filtered)
}
