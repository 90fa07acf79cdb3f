mod api;
mod config;
mod fuse;
mod state;

use std::sync::Arc;

use clap::Parser;

use api::client::HdfsClient;
use config::{Args, Config};
use fuse::attr::{AttributeAdapter, SystemDirectory};
use fuse::cache::NegativeLookupCache;
use fuse::store::BlockingStore;
use state::FsState;

fn main() {
    // Flags may also come from HDFS_FUSE_* variables in a local .env
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    log::info!("hdfs-fuse starting...");

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), String> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("hdfs-io")
        .build()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;

    let client = Arc::new(HdfsClient::new(&config.hadoop, config.request_timeout));
    let store = BlockingStore::new(client, rt.handle().clone(), config.request_timeout);
    let state = Arc::new(FsState::new(
        Arc::new(store),
        AttributeAdapter::new(Box::new(SystemDirectory)),
        NegativeLookupCache::new(),
        config.negative_timeout,
    ));

    mount_and_wait(&rt, state, &config)
}

#[cfg(feature = "fuse")]
fn mount_and_wait(
    rt: &tokio::runtime::Runtime,
    state: Arc<FsState>,
    config: &Config,
) -> Result<(), String> {
    let session = fuse::mount_filesystem(state, config)?;
    log::info!(
        "Mounted at {}. Press Ctrl+C to unmount.",
        config.mountpoint.display()
    );

    rt.block_on(wait_for_shutdown());

    log::info!("Unmounting {}", config.mountpoint.display());
    drop(session);
    log::info!("Unmounted successfully.");
    Ok(())
}

#[cfg(not(feature = "fuse"))]
fn mount_and_wait(
    _rt: &tokio::runtime::Runtime,
    _state: Arc<FsState>,
    _config: &Config,
) -> Result<(), String> {
    Err("Built without the `fuse` feature; nothing to mount".to_string())
}

/// Resolve on SIGINT or SIGTERM.
#[cfg(feature = "fuse")]
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => log::info!("Received Ctrl+C"),
                    _ = term.recv() => log::info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => log::warn!("Failed to install SIGTERM handler: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to wait for Ctrl+C: {}", e);
    }
}
