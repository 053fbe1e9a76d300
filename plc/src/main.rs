//! # Factory Soft-PLC
//!
//! Modbus-TCP slave plus the 50 ms scan engine for the assembly, sorting
//! and palletizing line.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:502, scan starts immediately
//! plc
//!
//! # Config file, unprivileged port, verbose
//! plc --config config/plc.toml --port 5020 -v
//!
//! # Wait for an explicit start, answer every inspection as normal
//! plc --no-autostart --pass-inspection
//! ```

use std::path::PathBuf;

use clap::Parser;
use plc::vision::{self, PassAll};
use plc_common::config::{LogLevel, PlcConfig};
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Factory Soft-PLC - Modbus-TCP slave and scan engine
#[derive(Parser, Debug)]
#[command(name = "plc")]
#[command(version)]
#[command(about = "Software PLC for the simulated assembly and palletizing line")]
#[command(long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used without one.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the Modbus listening port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the Modbus bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Do not start scanning at boot.
    #[arg(long)]
    no_autostart: bool,

    /// Answer every inspection request as normal (no vision collaborator).
    #[arg(long)]
    pass_inspection: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = PlcConfig::load_or_default(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Factory PLC v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match config {
        Ok(config) => run(&args, config),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("FATAL: {e}");
        std::process::exit(1);
    }

    info!("Factory PLC shutdown complete");
}

fn run(args: &Args, mut config: PlcConfig) -> Result<(), Box<dyn std::error::Error>> {
    match args.config {
        Some(ref path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file given, using defaults"),
    }
    if let Some(port) = args.port {
        config.modbus.port = port;
    }
    if let Some(ref bind) = args.bind {
        config.modbus.bind_address = bind.clone();
    }
    if args.no_autostart {
        config.scan.autostart = false;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let handle = plc::spawn(config).await?;
        info!("Listening for the plant on {}", handle.local_addr());

        let (bridge_stop, bridge_stop_rx) = watch::channel(false);
        let bridge = args.pass_inspection.then(|| {
            info!("Inspection bridge active: every product passes");
            vision::spawn_bridge(handle.control(), PassAll, vision::DEFAULT_POLL, bridge_stop_rx)
        });

        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal");

        let _ = bridge_stop.send(true);
        if let Some(bridge) = bridge {
            if let Err(e) = bridge.await? {
                warn!("Vision bridge ended with error: {e}");
            }
        }
        handle.shutdown().await?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn setup_tracing(args: &Args, configured: LogLevel) {
    // RUST_LOG wins over the configured level; -v forces DEBUG on top.
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured.as_filter()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
