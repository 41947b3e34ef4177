use axum::{response::IntoResponse, routing::get, Router};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use intel_dimm::common::pci::{self, PciAddress, PciHandle};
use intel_dimm::driver::{read_attributes, AttachState};
use intel_dimm::error::AttachFailure;
use intel_dimm::prom::dimm::read_chip;
use intel_dimm::{DimmMetricExporter, ExportConfig, MetricCollector, Result};

#[derive(Parser, Debug)]
#[command(name = "intel-dimm")]
#[command(about = "DIMM temperature sensors for Intel Xeon PCUs")]
struct Args {
    #[arg(
        long,
        default_value = intel_dimm::config::DEFAULT_LISTEN,
        help = "HTTP listen address for /metrics"
    )]
    listen: SocketAddr,

    #[arg(long, default_value_t = 1, help = "Collection interval in seconds")]
    interval: u64,

    #[arg(
        long = "device",
        help = "PCU functions to attach (can be specified multiple times or comma-separated: --device 0000:ff:1e.0,ff:1e.4)",
        action = clap::ArgAction::Append
    )]
    devices: Vec<String>,

    #[arg(long, help = "Print every exposed sensor once and exit")]
    once: bool,

    #[arg(
        long,
        requires = "once",
        help = "With --once, print hwmon attribute files (temp{N}_input, temp{N}_label) instead"
    )]
    raw: bool,

    #[arg(short, long, help = "Enable verbose logging (shows all PCI reads)")]
    verbose: bool,
}

struct AppState {
    dimm_exporter: Option<Arc<DimmMetricExporter>>,
}

async fn metrics_handler(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    intel_dimm::gather_metrics!(buffer, encoder, state.dimm_exporter, "DIMM");

    let content_type = encoder.format_type().to_string();
    (
        [("Content-Type", content_type)],
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

fn check_permissions(filter: &[PciAddress]) {
    let proc_pci = if std::env::var("DOCKER_RUNNING").is_ok() {
        "/pcm/proc/bus/pci"
    } else {
        "/proc/bus/pci"
    };
    if std::fs::metadata(proc_pci).is_err() {
        eprintln!("\n⚠️  ERROR: Cannot access {proc_pci}\n\nPCI configuration space is not available on this host.\n");
        std::process::exit(1);
    }

    // Enumeration errors are reported by the collector
    let Ok(devices) = pci::enumerate_devices() else {
        return;
    };
    let Some(first) = pci::select_pcu_devices(&devices, filter).into_iter().next() else {
        return;
    };

    let access = PciHandle::new(first.address).and_then(|handle| pci::check_config_access(&handle));
    if let Err(e) = access {
        eprintln!("\n⚠️  ERROR: Cannot read DIMM registers of {}\n\n{e}\nReading past the PCI header needs CAP_SYS_ADMIN, run as root.\n", first.address);
        std::process::exit(1);
    }
}

/// Print sensors the way `sensors` lays them out
fn print_sensors(collector: &MetricCollector, raw: bool) {
    for report in collector.reports() {
        if let AttachState::Failed(kind) = report.state {
            let reason = match kind {
                AttachFailure::NotSupportedDevice => "unsupported device",
                AttachFailure::NoChannelsFound => "no populated channel",
                AttachFailure::AllocationFailure => "allocation failure",
            };
            println!(
                "# {} (0x{:04x}) skipped: {}\n",
                report.address, report.device_id, reason
            );
        }
    }

    let exporter = collector.exporter();
    for chip in exporter.chips() {
        println!("{}", chip.name());
        println!("Adapter: PCI adapter");
        if raw {
            for (name, value) in read_attributes(chip.ops.as_ref()) {
                match value {
                    Ok(v) => println!("{name}: {v}"),
                    Err(e) => tracing::warn!("Failed to read {} {}: {}", chip.name(), name, e),
                }
            }
        } else {
            for reading in read_chip(chip) {
                match reading {
                    Ok(r) => println!("{:<14}+{:.1}°C", format!("{}:", r.label), r.celsius()),
                    Err(e) => tracing::warn!("Failed to read {}: {}", chip.name(), e),
                }
            }
        }
        println!();
    }
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    tracing::info!("Installing signal handlers...");

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Ctrl+C received!");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("SIGTERM received!");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Shutdown triggered by Ctrl+C");
        },
        _ = terminate => {
            tracing::warn!("Shutdown triggered by SIGTERM");
        },
    }

    cancel_token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let devices = ExportConfig::parse_device_list(&args.devices)?;
    if !devices.is_empty() {
        tracing::info!("Restricting to PCU functions: {:?}", devices);
    }

    check_permissions(&devices);
    let config = ExportConfig::new(args.listen, Duration::from_secs(args.interval), devices)?;

    let collector = MetricCollector::new(config.clone())?;

    if args.once {
        print_sensors(&collector, args.raw);
        return Ok(());
    }

    let cancel_token = CancellationToken::new();
    let app_state = Arc::new(AppState {
        dimm_exporter: Some(collector.exporter()),
    });
    let collection_handle = collector.start(cancel_token.clone());

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(app_state);

    tracing::warn!("Starting HTTP server on {}", config.listen);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    tracing::info!("Server shutdown complete, waiting for collection loop to finish...");

    if let Err(e) = collection_handle.await {
        tracing::error!("Collection loop failed: {}", e);
    }

    tracing::info!("All tasks completed, exiting");

    Ok(())
}
