//! Thermowatch CLI
//!
//! Command-line interface for the sensor fleet temperature service.

use std::path::PathBuf;

use clap::Parser;
use thermowatch::config::parse_sensor_list;
use thermowatch::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "thermowatch")]
#[command(about = "Sensor fleet temperature aggregation and readiness service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Comma separated sensor box ids (overrides config file)
    #[arg(long)]
    sensors: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, sensors={:?}, log_level={:?}",
        args.config,
        args.port,
        args.sensors,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(sensors) = &args.sensors {
        config.sensors = parse_sensor_list(sensors);
    }

    tracing::info!("Starting thermowatch service");
    tracing::debug!(
        "Sensors: {}, interval: {:?}, archive: {:?}",
        config.configured_sensors().len(),
        config.scheduler.interval,
        config.storage.archive
    );

    thermowatch::run(config).await?;

    Ok(())
}
