//! rainwx CLI
//!
//! Trailing 24-hour rainfall reporter for APRS weather stations.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rainwx::{
    config::{Config, UplinkConfig},
    core::DayBoundaryKind,
    server, uplink, VERSION,
};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rainwx")]
#[command(version = VERSION)]
#[command(about = "Trailing 24-hour rainfall reporter for APRS weather stations", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive readings and transmit weather reports
    Serve(Overrides),

    /// Print the validated configuration
    Config(Overrides),

    /// Print the APRS-IS passcode for a callsign
    Passcode {
        /// Callsign, with or without SSID
        callsign: String,
    },
}

/// Command-line values that take precedence over the configuration file.
#[derive(Args)]
struct Overrides {
    /// Station callsign
    #[arg(long)]
    callsign: Option<String>,

    /// Station SSID (0-15)
    #[arg(long)]
    ssid: Option<String>,

    /// Free-text comment appended to reports
    #[arg(long)]
    comment: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    latitude: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// IANA time zone that defines the station's day
    #[arg(long)]
    timezone: Option<String>,

    /// How a new day is detected (calendar-day or weekday)
    #[arg(long)]
    day_boundary: Option<DayBoundaryKind>,

    /// IP address to listen on
    #[arg(long)]
    address: Option<IpAddr>,

    /// TCP port to listen on (0 picks one automatically)
    #[arg(long)]
    port: Option<u16>,

    /// Seconds between weather reports
    #[arg(long)]
    interval: Option<u64>,

    /// Minutes past 24 hours a baseline reading may be and still count
    #[arg(long)]
    stale_threshold: Option<u32>,

    /// APRS-IS server as host:port
    #[arg(long)]
    aprs_server: Option<String>,

    /// APRS-IS passcode (computed from the callsign if omitted)
    #[arg(long)]
    passcode: Option<u16>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        let station = &mut config.station;
        if let Some(v) = self.callsign {
            station.callsign = v;
        }
        if let Some(v) = self.ssid {
            station.ssid = v;
        }
        if let Some(v) = self.comment {
            station.comment = v;
        }
        if let Some(v) = self.latitude {
            station.latitude = v;
        }
        if let Some(v) = self.longitude {
            station.longitude = v;
        }
        if let Some(v) = self.timezone {
            station.timezone = v;
        }
        if let Some(v) = self.day_boundary {
            station.day_boundary = v;
        }

        if let Some(v) = self.address {
            config.listen.address = v;
        }
        if let Some(v) = self.port {
            config.listen.port = v;
        }

        if let Some(v) = self.interval {
            config.report.interval = Duration::from_secs(v);
        }
        if let Some(v) = self.stale_threshold {
            config.report.stale_threshold_minutes = v;
        }

        if let Some(server) = self.aprs_server {
            config.uplink = Some(UplinkConfig {
                server,
                passcode: None,
            });
        }
        if let (Some(uplink), Some(passcode)) = (config.uplink.as_mut(), self.passcode) {
            uplink.passcode = Some(passcode);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(overrides) => cmd_serve(cli.config, overrides).await,
        Commands::Config(overrides) => cmd_config(cli.config, overrides),
        Commands::Passcode { callsign } => {
            println!("{}", uplink::passcode(&callsign));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Load the configuration file, apply command-line values and validate.
fn load_config(path: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<Config> {
    let path = path.unwrap_or_else(Config::config_path);
    let mut config =
        Config::load_from(&path).with_context(|| format!("loading {}", path.display()))?;
    overrides.apply(&mut config);
    Ok(config.validate()?)
}

async fn cmd_serve(path: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(path, overrides)?;

    println!("rainwx v{VERSION}");
    println!();
    println!("  Station: {}", config.station.source_address());
    println!(
        "  Position: {:.4}, {:.4}",
        config.station.latitude, config.station.longitude
    );
    println!(
        "  Day boundary: {:?} ({})",
        config.station.day_boundary, config.station.timezone
    );
    println!("  Report interval: {}s", config.report.interval.as_secs());
    println!(
        "  Stale threshold: {} minutes",
        config.report.stale_threshold_minutes
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let handle = server::run(config).await?;
    tracing::info!("Accepting readings at http://{}/readings", handle.addr);

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;

    println!();
    println!("Stopping...");
    let _ = handle.shutdown.send(());
    handle.task.await.context("waiting for the server to stop")?;

    Ok(())
}

fn cmd_config(path: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<()> {
    let config = load_config(path.clone(), overrides)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "Config file: {:?}",
        path.unwrap_or_else(Config::config_path)
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
