//! envmon main entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  FileConfig    SimSensor     LogMailer   GpioRelay   LogCamera │
//! │  (ConfigPort)  (SensorPort)  (MailPort)  (RelayPort) (Camera)  │
//! │  SystemClock   LogEventSink                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            MonitorService (pure logic)                 │    │
//! │  │  Evaluator · Debounce · Dispatcher · Scheduler         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Runner (blocking poll loop) · tokio signal handler            │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use envmon::adapters::camera::LogCamera;
use envmon::adapters::file_config::FileConfig;
use envmon::adapters::hardware::ActionAdapter;
use envmon::adapters::log_sink::LogEventSink;
use envmon::adapters::mailer::LogMailer;
use envmon::adapters::relay::{GpioRelay, LogPin};
use envmon::adapters::time::SystemClock;
use envmon::app::ports::{ConfigPort, RelayPort};
use envmon::app::runner::{Runner, Shutdown};
use envmon::app::service::MonitorService;
use envmon::config::MonitorConfig;
use envmon::sensors::sim::SimSensor;
use envmon::sensors::{Metric, SensorHub, SensorModel};

#[derive(Parser, Debug)]
#[command(name = "envmon")]
#[command(about = "Environment monitor: threshold alerts, relay control and weekly jobs")]
struct Cli {
    /// Path to the configuration file (YAML, JSON or TOML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Start monitoring (default)
    Run,
    /// Switch the relay off and release it, then exit
    Cleanup,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --- Tracing (also receives `log` records from the library) ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "envmon=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut relay = GpioRelay::new(LogPin::new());

    if cli.command == Some(Command::Cleanup) {
        release_relay(&mut relay).context("relay cleanup")?;
        info!("Cleanup done");
        return Ok(());
    }

    // --- Configuration ---
    let config = load_config(&cli.config).with_context(|| format!("loading {}", cli.config.display()))?;

    // --- Adapters ---
    let hub = build_sensor_hub(&config);
    let hw = ActionAdapter::new(LogMailer::new(config.mail.clone()), relay, LogCamera::new());
    let service = MonitorService::new(config, hub);

    // --- Run loop on a blocking thread, signals on the runtime ---
    let shutdown = Shutdown::new();
    let worker = {
        let shutdown = shutdown.clone();
        tokio::task::spawn_blocking(move || {
            let mut hw = hw;
            let mut sink = LogEventSink::new();
            let mut runner = Runner::new(service);
            runner.run(&SystemClock::new(), &mut hw, &mut sink, &shutdown);
        })
    };

    shutdown_signal().await;
    shutdown.trigger();
    worker.await.context("run loop panicked")?;
    info!("envmon stopped");
    Ok(())
}

fn load_config(path: &Path) -> envmon::error::Result<MonitorConfig> {
    Ok(FileConfig::new(path).load()?)
}

fn release_relay(relay: &mut impl RelayPort) -> envmon::error::Result<()> {
    relay.deactivate()?;
    relay.cleanup();
    Ok(())
}

/// One simulated channel per metric, picked from the enabled sensor
/// models in priority order.
fn build_sensor_hub(config: &MonitorConfig) -> SensorHub {
    let mut hub = SensorHub::new();
    for (metric, model) in SensorModel::resolve_channels(&config.sensors) {
        info!("Sensor: {} from {}", metric, model.name());
        hub.attach(Box::new(SimSensor::new(metric, nominal(metric))));
    }
    if config.sensors.is_empty() {
        warn!("No sensor model enabled; only scheduled jobs will run");
    }
    hub
}

fn nominal(metric: Metric) -> f64 {
    match metric {
        Metric::Light => 300.0,
        Metric::Temperature => 22.0,
        Metric::Humidity => 45.0,
        Metric::Co2 => 600.0,
        Metric::Distance => 100.0,
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT (Ctrl-C), draining"),
        () = terminate => info!("Received SIGTERM, draining"),
    }
}
