//! CLI entry point for the kiosk.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use surtidor_config::{
    CliOverrides, LoggingConfig, SyncConfig, apply_overrides, load_config, validate_config,
};
use surtidor_core::{Clock, SystemClock};
use surtidor_directory::{Directory, Ledger};
use surtidor_session::{SessionController, Timeouts};
use surtidor_sync::{HttpRemote, SyncOptions, SyncService, VersionStore, swap_channel};

use crate::{input, peripherals, runtime};

/// Kiosk CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "surtidor-kiosk",
    version,
    about = "Access-controlled dispensing kiosk controller"
)]
pub struct KioskArgs {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the kiosk with the given arguments.
pub async fn run(args: KioskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);

    // The whole directory/ledger subsystem lives under the data dir; not
    // being able to create it is the one fatal storage failure.
    std::fs::create_dir_all(config.storage.data_dir())?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.clock.utc_offset_mins));

    let snapshot_path = config.storage.snapshot_path();
    let directory = match Directory::load_from_snapshot(&snapshot_path, config.storage.max_users)
    {
        Ok(directory) => directory,
        Err(e) => {
            warn!(error = %e, "no usable snapshot; starting with an empty directory");
            Directory::empty(config.storage.max_users)
        }
    };
    let ledger = Ledger::new(config.storage.ledger_path());

    // Graceful shutdown on SIGTERM/SIGINT.
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    let (swap_tx, swap_rx) = swap_channel();
    if let Some(sync_config) = &config.sync {
        let service = build_sync_service(
            sync_config,
            snapshot_path.clone(),
            config.storage.kv_path(),
            ledger.clone(),
            clock.clone(),
            swap_tx,
        )?;
        tokio::spawn(service.run(shutdown.clone()));
    }

    let session = &config.session;
    let timeouts = Timeouts {
        input: Duration::from_secs(session.input_timeout_secs),
        dispense_max: Duration::from_secs(session.dispense_max_secs),
        validating_max: Duration::from_secs(session.validating_max_secs),
        notice: Duration::from_millis(session.notice_ms),
        format_notice: Duration::from_millis(session.format_notice_ms),
    };

    info!(users = directory.len(), "kiosk ready");
    let controller = SessionController::new(
        directory,
        ledger,
        clock,
        peripherals::trace_peripherals(),
        timeouts,
        Instant::now(),
    );

    let (input_tx, input_rx) = mpsc::channel(64);
    input::spawn_stdin_input(input_tx);

    runtime::run_session_loop(
        controller,
        input_rx,
        swap_rx,
        snapshot_path,
        Duration::from_millis(session.tick_ms),
        shutdown,
    )
    .await;

    Ok(())
}

fn build_sync_service(
    sync_config: &SyncConfig,
    snapshot_path: PathBuf,
    kv_path: PathBuf,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    swap_tx: mpsc::Sender<surtidor_sync::SwapRequest>,
) -> Result<SyncService, Box<dyn std::error::Error>> {
    let remote = HttpRemote::new(
        &sync_config.version_url,
        &sync_config.snapshot_url,
        Duration::from_secs(sync_config.version_timeout_secs),
        Duration::from_secs(sync_config.snapshot_timeout_secs),
    )?;
    Ok(SyncService::new(
        Arc::new(remote),
        VersionStore::new(kv_path),
        ledger,
        clock,
        swap_tx,
        SyncOptions {
            snapshot_path,
            interval: Duration::from_secs(sync_config.interval_secs),
            startup_delay: Duration::from_secs(sync_config.startup_delay_secs),
        },
    ))
}

fn init_tracing(config: &LoggingConfig) {
    let base_level = config.level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_new(base_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
