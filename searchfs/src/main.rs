use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use searchfs::backend::http::HttpSearchClient;
use searchfs::cli::Args;
use searchfs::config::Config;
use searchfs::fs::SearchFs;
use searchfs::fs::mount::mount_search_fs;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("searchfs=info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::try_from(&args).context("invalid configuration")?;
    let backend = HttpSearchClient::new(&config).context("building search client")?;
    info!("searching via {}", backend.search_url());
    let fs = SearchFs::new(Arc::new(backend));

    let mut mount_handle = mount_search_fs(fs, &config.mountpoint, config.privileged)
        .await
        .with_context(|| format!("mounting on {}", config.mountpoint.display()))?;
    info!(
        "mounted searchfs at {} (Ctrl+C to unmount)",
        config.mountpoint.display()
    );

    let handle = &mut mount_handle;
    tokio::select! {
        res = handle => res.context("fuse session ended")?,
        _ = signal::ctrl_c() => {
            info!("unmounting {}", config.mountpoint.display());
            mount_handle.unmount().await.context("unmount")?;
        }
    }
    Ok(())
}
