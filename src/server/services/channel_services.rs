use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mockall::automock;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use crate::server::dtos::channel_dto::Channel;
use crate::server::error::{AppResult, Error};
use crate::server::services::schedule_services::{
    DynScheduleService, entry_id, entry_name, iter_channel_entries,
};
use crate::server::services::token_services::urlsafe_wrap;
use crate::store::{MetaStore, SettingsStore};

const REFRESH_INTERVAL_SECS: u64 = 300;
const REFRESH_ERROR_BACKOFF_SECS: u64 = 60;

// channels whose name starts with this sort after everything else
const ADULT_PREFIX: &str = "18";

static CARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<a class="card"[^>]*href="/watch\.php\?id=(\d+)"[^>]*>.*?<div class="card__title">(.*?)</div>"#,
    )
    .expect("notrace - static regex")
});

static LEGACY_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<center><h1(.+?)tab-2").expect("notrace - static regex"));

static LEGACY_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(.*)" target(.*)<strong>(.*)</strong>"#).expect("notrace - static regex")
});

static PAREN_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*?\)").expect("notrace - static regex"));

/// one entry scraped from the channel listing page, tagged by which HTML
/// shape it matched so each shape has exactly one decoder
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedChannel {
    /// current card-style markup: numeric id straight from the href
    Card { id: String, name: String },
    /// old nav-style markup: id is embedded in the href slug
    Legacy { slug: String, name: String },
}

impl ParsedChannel {
    /// (id, raw name), or None when the entry is malformed
    pub fn into_id_name(self) -> Option<(String, String)> {
        match self {
            ParsedChannel::Card { id, name } => {
                Some((id, name.replace("&amp;", "&").trim().to_string()))
            }
            ParsedChannel::Legacy { slug, name } => {
                // slug looks like "/stream/stream-123.php"
                let id = slug.split('-').nth(1)?.replace(".php", "").trim().to_string();
                if id.is_empty() {
                    return None;
                }
                Some((id, name.trim().to_string()))
            }
        }
    }
}

/// parse the upstream listing page, trying the current card markup first and
/// falling back to the legacy nav markup when nothing matches
pub fn extract_channels(html: &str) -> Vec<ParsedChannel> {
    let cards: Vec<ParsedChannel> = CARD_RE
        .captures_iter(html)
        .map(|cap| ParsedChannel::Card {
            id: cap[1].to_string(),
            name: cap[2].to_string(),
        })
        .collect();

    if !cards.is_empty() {
        return cards;
    }

    let Some(block) = LEGACY_BLOCK_RE.captures(html) else {
        return Vec::new();
    };

    LEGACY_ENTRY_RE
        .captures_iter(&block[1])
        .map(|cap| ParsedChannel::Legacy {
            slug: cap[1].to_string(),
            name: cap[3].to_string(),
        })
        .collect()
}

/// attach the corrected name and display metadata to a scraped (id, name)
pub fn build_channel(id: &str, raw_name: &str, meta: &MetaStore, api_url: &str) -> Channel {
    let name = meta.corrected_name(id, raw_name);
    let clean_name = PAREN_SUFFIX_RE.replace_all(&name, "").to_string();

    let channel_meta = meta.meta_for(&clean_name);
    let tags = channel_meta.map(|m| m.tags.clone()).unwrap_or_default();
    let logo = channel_meta
        .and_then(|m| m.logo.clone())
        .unwrap_or_else(|| "/missing.png".to_string());

    // absolute logo URLs get routed through our own logo proxy
    let logo = if logo.starts_with("http") {
        format!("{}/logo/{}", api_url, urlsafe_wrap(&logo))
    } else {
        logo
    };

    Channel {
        id: id.to_string(),
        name,
        tags,
        logo,
    }
}

/// drop duplicate ids, first occurrence wins
pub fn dedup_channels(channels: Vec<Channel>) -> Vec<Channel> {
    let mut seen: HashSet<String> = HashSet::new();
    channels
        .into_iter()
        .filter(|ch| seen.insert(ch.id.clone()))
        .collect()
}

/// adult channels last, everything else ordinal by name
pub fn sort_channels(channels: &mut [Channel]) {
    channels.sort_by(|a, b| {
        (a.name.starts_with(ADULT_PREFIX), &a.name).cmp(&(b.name.starts_with(ADULT_PREFIX), &b.name))
    });
}

pub type DynChannelDirectory = Arc<dyn ChannelDirectoryTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait ChannelDirectoryTrait {
    /// scrape and rebuild the channel set, swapping the snapshot atomically.
    /// Failure leaves the previous snapshot in place
    async fn refresh(&self) -> AppResult<()>;

    fn snapshot(&self) -> Arc<Vec<Channel>>;

    fn channel(&self, id: &str) -> Option<Channel>;
}

pub struct ChannelDirectory {
    http: reqwest::Client,
    settings: Arc<SettingsStore>,
    schedule: DynScheduleService,
    meta: Arc<MetaStore>,
    api_url: String,
    snapshot: RwLock<Arc<Vec<Channel>>>,
}

impl ChannelDirectory {
    pub fn new(
        http: reqwest::Client,
        settings: Arc<SettingsStore>,
        schedule: DynScheduleService,
        meta: Arc<MetaStore>,
        api_url: String,
    ) -> Self {
        Self {
            http,
            settings,
            schedule,
            meta,
            api_url,
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    async fn fetch_listing(&self, base_url: &str) -> AppResult<String> {
        let response = self
            .http
            .get(format!("{}/24-7-channels.php", base_url))
            .header(reqwest::header::REFERER, base_url)
            .send()
            .await
            .map_err(|e| {
                Error::InternalServerErrorWithContext(format!(
                    "failed to fetch channel listing: {}",
                    e
                ))
            })?;

        if !response.status().is_success() {
            return Err(Error::InternalServerErrorWithContext(format!(
                "channel listing returned {}",
                response.status()
            )));
        }

        response.text().await.map_err(|e| {
            Error::InternalServerErrorWithContext(format!("failed to read channel listing: {}", e))
        })
    }
}

#[async_trait]
impl ChannelDirectoryTrait for ChannelDirectory {
    async fn refresh(&self) -> AppResult<()> {
        let settings = self.settings.load().await;

        let mut channels: Vec<Channel> = Vec::new();

        match self.fetch_listing(&settings.base_url).await {
            Ok(html) => {
                for parsed in extract_channels(&html) {
                    let Some((id, raw_name)) = parsed.into_id_name() else {
                        continue;
                    };
                    channels.push(build_channel(&id, &raw_name, &self.meta, &self.api_url));
                }
            }
            Err(e) => error!("channel listing fetch failed: {}", e),
        }

        // the schedule feed knows about event channels the listing page
        // doesn't carry, merge those in under their schedule name
        match self.schedule.fetch_raw().await {
            Ok(schedule) => {
                let empty = serde_json::Map::new();
                let days = schedule.as_object().unwrap_or(&empty);
                for categories in days.values() {
                    let Some(categories) = categories.as_object() else {
                        continue;
                    };
                    for events in categories.values() {
                        let Some(events) = events.as_array() else {
                            continue;
                        };
                        for event in events {
                            let mut entries = iter_channel_entries(event.get("channels"));
                            entries.extend(iter_channel_entries(event.get("channels2")));
                            for entry in entries {
                                let id = entry_id(entry);
                                if id.is_empty() {
                                    continue;
                                }
                                let name = entry_name(entry);
                                let name = if name.is_empty() { id.clone() } else { name };
                                channels.push(build_channel(
                                    &id,
                                    &name,
                                    &self.meta,
                                    &self.api_url,
                                ));
                            }
                        }
                    }
                }
            }
            Err(e) => error!("schedule fetch failed while loading channels: {}", e),
        }

        if channels.is_empty() {
            // keep whatever we had, an empty directory helps nobody
            warn!("channel refresh produced no channels, keeping previous snapshot");
            return Ok(());
        }

        let mut channels = dedup_channels(channels);
        sort_channels(&mut channels);

        let count = channels.len();
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| Error::InternalServerError)?;
        *guard = Arc::new(channels);
        drop(guard);

        info!("channel directory refreshed with {} channels", count);
        Ok(())
    }

    fn snapshot(&self) -> Arc<Vec<Channel>> {
        self.snapshot
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn channel(&self, id: &str) -> Option<Channel> {
        self.snapshot().iter().find(|ch| ch.id == id).cloned()
    }
}

/// periodic refresh, errors back off for a minute and the loop carries on.
/// The task ends with the runtime so there's nothing special to cancel
pub fn spawn_refresh_loop(directory: DynChannelDirectory) {
    tokio::spawn(async move {
        loop {
            match directory.refresh().await {
                Ok(()) => {
                    tokio::time::sleep(std::time::Duration::from_secs(REFRESH_INTERVAL_SECS)).await;
                }
                Err(e) => {
                    error!("failed to refresh channels: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(REFRESH_ERROR_BACKOFF_SECS))
                        .await;
                }
            }
        }
    });
}
