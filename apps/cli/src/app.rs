//! Wires the clients and the engine together for one invocation.

use std::path::PathBuf;
use std::sync::Arc;

use cowput_client::{ClientConfig, ManagementClient, StorageClient};
use cowput_engine::{DownloadResolver, EngineConfig, Uploader};

use crate::args::{Args, Mode};
use crate::config::Config;
use crate::output::{self, LogProgress};

pub async fn run(args: Args) -> anyhow::Result<()> {
    let mode = args.mode()?;

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_args(&args);
    let client_config = config.client_config();
    let engine_config = config.engine_config();

    match mode {
        Mode::List(url) => list(&client_config, engine_config, &url).await,
        Mode::Upload(paths) => upload(&client_config, engine_config, &paths).await,
    }
}

async fn list(client: &ClientConfig, engine: EngineConfig, url: &str) -> anyhow::Result<()> {
    let management = Arc::new(ManagementClient::new(client)?);
    let resolver = DownloadResolver::new(
        management,
        engine.passcode().map(String::from),
        engine.parallelism,
    );

    let files = resolver.resolve(url).await?;
    output::write_listing(&mut std::io::stdout().lock(), &files)?;
    Ok(())
}

async fn upload(
    client: &ClientConfig,
    engine: EngineConfig,
    paths: &[PathBuf],
) -> anyhow::Result<()> {
    let management = Arc::new(ManagementClient::new(client)?);
    let storage = Arc::new(StorageClient::new(client)?);
    let uploader = Uploader::new(management, storage, Arc::new(LogProgress), engine)?;

    let cancel = uploader.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling upload");
            cancel.cancel();
        }
    });

    let outcome = uploader.upload(paths).await?;
    output::write_link(&mut std::io::stdout().lock(), outcome.link())?;
    Ok(())
}
