pub mod app_services;
pub mod channel_services;
pub mod playlist_services;
pub mod proxy_services;
pub mod resolver_services;
pub mod schedule_services;
pub mod token_services;

pub use channel_services::DynChannelDirectory;
pub use proxy_services::DynProxyService;
pub use resolver_services::DynStreamResolver;
pub use schedule_services::DynScheduleService;
