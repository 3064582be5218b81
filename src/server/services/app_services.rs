use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::config::AppConfig;
use crate::server::services::channel_services::{ChannelDirectory, DynChannelDirectory};
use crate::server::services::proxy_services::{DynProxyService, ProxyService};
use crate::server::services::resolver_services::{DynStreamResolver, StreamResolver};
use crate::server::services::schedule_services::{DynScheduleService, ScheduleService};
use crate::server::services::token_services::TokenCodec;
use crate::store::{MetaStore, SelectionStore, SettingsStore};

// the upstream is picky about this, it just needs to look like a browser
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0";

/// everything the request handlers need, injected via Extension
#[derive(Clone)]
pub struct AppServices {
    pub codec: Arc<TokenCodec>,
    pub channels: DynChannelDirectory,
    pub schedule: DynScheduleService,
    pub resolver: DynStreamResolver,
    pub proxy: DynProxyService,
    pub selection: Arc<SelectionStore>,
    pub http: reqwest::Client,
    pub config: Arc<AppConfig>,
}

impl AppServices {
    pub fn new(config: Arc<AppConfig>) -> anyhow::Result<Self> {
        info!("starting services...");

        // one long lived client, pooled connections, shared by everything
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30));

        if let Some(socks5) = &config.socks5 {
            info!("routing upstream traffic through socks5://{}", socks5);
            let proxy = reqwest::Proxy::all(format!("socks5://{}", socks5))
                .context("invalid socks5 proxy address")?;
            builder = builder.proxy(proxy);
        }

        let http = builder.build().context("failed to build http client")?;

        // key material lives and dies with the process, tokens issued before
        // a restart come back as decode errors and that's fine
        let codec = Arc::new(TokenCodec::new());

        let settings = Arc::new(SettingsStore::new(
            config.settings_file.clone(),
            config.upstream_base_url.clone(),
        ));
        let selection = Arc::new(SelectionStore::new(config.channels_file.clone()));
        let meta = Arc::new(MetaStore::load(
            &config.meta_file,
            config.name_overrides_file.as_deref(),
        ));

        let schedule = Arc::new(ScheduleService::new(http.clone(), settings.clone()))
            as DynScheduleService;

        let channels = Arc::new(ChannelDirectory::new(
            http.clone(),
            settings.clone(),
            schedule.clone(),
            meta,
            config.api_url.clone(),
        )) as DynChannelDirectory;

        let resolver =
            Arc::new(StreamResolver::new(http.clone(), settings.clone())) as DynStreamResolver;

        let proxy = Arc::new(ProxyService::new(http.clone(), codec.clone())) as DynProxyService;

        info!("services ready");

        Ok(Self {
            codec,
            channels,
            schedule,
            resolver,
            proxy,
            selection,
            http,
            config,
        })
    }
}
