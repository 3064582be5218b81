#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

#[derive(clap::Parser)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // public base URL of this service, used when rewriting manifests so that
    // key/segment URLs point back at us (e.g. https://tv.example.com)
    #[clap(long, env, default_value = "http://localhost:5000")]
    pub api_url: String,

    // whether media segments get tunneled through /content/. Key delivery is
    // always proxied regardless because browsers block cross-origin key fetches
    #[clap(long, env, default_value = "true")]
    pub proxy_content: bool,

    // optional socks5 proxy for all outbound upstream calls, host:port
    #[clap(long, env)]
    pub socks5: Option<String>,

    // upstream base URL used when the settings file is absent
    #[clap(long, env, default_value = "https://dlhd.dad")]
    pub upstream_base_url: String,

    // settings file holding the upstream base url and preferred route prefix,
    // re-read on every resolution so edits take effect without a restart
    #[clap(long, env, default_value = "settings.json")]
    pub settings_file: String,

    // JSON array of enabled channel ids; missing file means everything enabled
    #[clap(long, env, default_value = "channels.json")]
    pub channels_file: String,

    // channel name -> {logo, tags} metadata map
    #[clap(long, env, default_value = "meta.json")]
    pub meta_file: String,

    // optional overrides file for upstream channel-name corrections
    #[clap(long, env)]
    pub name_overrides_file: Option<String>,

    // this should be either * for allowing everything, or a comma seperated list of domains like
    // example.com,something.com
    #[clap(long, env, default_value = "*")]
    pub cors_origin: String,
}

impl Default for AppConfig {
    // defaults aren't really needed here but it's here as a bad fallback
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            api_url: "http://localhost:5000".to_string(),
            proxy_content: true,
            socks5: None,
            upstream_base_url: "https://dlhd.dad".to_string(),
            settings_file: "settings.json".to_string(),
            channels_file: "channels.json".to_string(),
            meta_file: "meta.json".to_string(),
            name_overrides_file: None,
            cors_origin: "*".to_string(),
        }
    }
}
