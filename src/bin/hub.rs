#[cfg(feature = "api")]
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::future::try_join_all;
use probewatch::{
    actors::{SchedulerHandle, retention::spawn_retention},
    config::{Config, StorageConfig, read_config_file},
    device::Device,
    probes::ProbeExecutor,
    storage::{MemoryBackend, StorageBackend, StorageResult},
};
#[cfg(feature = "api")]
use probewatch::util::{get_addr, get_port};
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
struct Args {
    /// Config file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// API port, used when the config has no `api.bind` [env: PORT]
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = get_port())]
    port: u16,

    /// API address, used when the config has no `api.bind` [env: ADDR]
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = get_addr())]
    addr: Ipv4Addr,

    /// Log more (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("probewatch", level),
        ("probewatch_hub", level),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => {
            info!("no config file given, using defaults");
            Config::default()
        }
    };

    let store = open_storage(&config.storage).await?;
    seed_devices(Arc::clone(&store), &config.devices).await?;

    let executor = Arc::new(
        ProbeExecutor::new(config.scheduler.timeouts()).context("failed to build probe executor")?,
    );

    let (scheduler, mut scheduler_task) = SchedulerHandle::spawn(
        Arc::clone(&store),
        Arc::clone(&executor),
        config.scheduler.settings(),
    );

    let retention_task = config
        .storage
        .retention_policy()
        .map(|policy| spawn_retention(Arc::clone(&store), policy));

    #[cfg(feature = "api")]
    {
        use probewatch::api::{ApiConfig, ApiState, spawn_api_server};

        let bind_addr = config
            .api
            .bind
            .unwrap_or_else(|| SocketAddr::from((args.addr, args.port)));
        let api_config = ApiConfig {
            bind_addr,
            enable_cors: config.api.enable_cors,
        };
        spawn_api_server(api_config, ApiState::new(Arc::clone(&store), executor)).await?;
    }
    #[cfg(not(feature = "api"))]
    info!("built without the api feature, running the scheduler only");

    // The scheduler only finishes on its own if something went badly wrong
    let unexpected_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for the shutdown signal")?;
            None
        }
        joined = &mut scheduler_task => Some(joined),
    };

    if let Some(joined) = unexpected_exit {
        match joined {
            Ok(()) => error!("scheduler stopped without a shutdown request"),
            Err(e) => error!("scheduler task failed: {}", e),
        }
        if let Some(task) = retention_task {
            task.abort();
        }
        anyhow::bail!("scheduler stopped unexpectedly, monitoring halted");
    }

    info!("shutdown requested, waiting for in-flight probes");
    scheduler.shutdown().await;
    if let Err(e) = scheduler_task.await {
        error!("scheduler task failed during shutdown: {}", e);
    }
    if let Some(task) = retention_task {
        task.abort();
    }

    store.close().await?;
    info!("hub stopped");

    Ok(())
}

async fn open_storage(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            warn!("using in-memory storage, devices and logs are lost on restart");
            Ok(Arc::new(MemoryBackend::new()))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path, .. } => {
            let backend = probewatch::storage::sqlite::SqliteBackend::new(path)
                .await
                .with_context(|| format!("failed to open database {}", path.display()))?;
            Ok(Arc::new(backend))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("sqlite storage requested but the storage-sqlite feature is disabled")
        }
    }
}

/// Upsert the configured devices, keeping the status of ones already stored
async fn seed_devices(store: Arc<dyn StorageBackend>, devices: &[Device]) -> anyhow::Result<()> {
    if devices.is_empty() {
        return Ok(());
    }

    async fn seed(store: &dyn StorageBackend, mut device: Device) -> StorageResult<Device> {
        if let Some(existing) = store.get_device(&device.id).await? {
            device.last_checked_at = existing.last_checked_at;
            device.last_message = existing.last_message;
            device.last_color = existing.last_color;
        }
        store.upsert_device(device).await
    }

    let seeded = try_join_all(
        devices
            .iter()
            .cloned()
            .map(|device| seed(store.as_ref(), device)),
    )
    .await
    .context("failed to seed devices from config")?;

    info!("seeded {} devices from config", seeded.len());
    Ok(())
}
