use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;

use tracing::info;

use tvedge::{AppConfig, ApplicationServer, Logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(AppConfig::parse());

    // init logger, guard is kept alive to flush logs on shutdown
    let _guards = Logger::init(config.cargo_env);

    info!("logger and env prepped, starting edge server...");

    // serve the routes, the channel refresh loop is spawned inside
    ApplicationServer::serve(config)
        .await
        .context("edge server failed to start")?;

    Ok(())
}
