use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use vayura_service::alert::dispatch::{ConsoleNotifier, NotificationDispatcher};
use vayura_service::analysis::sampling::Sampler;
use vayura_service::config::{self, Config};
use vayura_service::ingest::geocode::NominatimClient;
use vayura_service::ingest::open_meteo::OpenMeteoClient;
use vayura_service::location::ConfiguredLocation;
use vayura_service::logging::{self, DataSource};
use vayura_service::model::Coordinate;
use vayura_service::monitor::{AirQualityMonitor, MonitorEvent};
use vayura_service::storage::FlagStore;
use vayura_service::verify;

#[derive(Debug, Parser)]
#[command(name = "vayura", about = "Breathe Smart. Live Clean. Air-quality monitor.")]
struct Cli {
    /// Config file (defaults to ./vayura.toml when present)
    #[arg(long, env = "VAYURA_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch and show the current air quality once
    Check(LocationArgs),
    /// Keep monitoring; stdin lines edit the address (":submit <text>", ":recheck", ":quit")
    Watch(LocationArgs),
    /// Complete the welcome step
    Start,
    /// Change persisted settings
    Settings {
        #[command(subcommand)]
        cmd: SettingsCommand,
    },
    /// Check that the configured data sources respond
    Verify {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Notifications { state: Toggle },
    /// Clear Data: forget the welcome step
    Clear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Debug, clap::Args)]
struct LocationArgs {
    /// Look up this address instead of using the device position
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    address: Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

type Monitor = AirQualityMonitor<OpenMeteoClient, NominatimClient, ConfiguredLocation, ConsoleNotifier>;

fn open_flags(config: &Config) -> FlagStore {
    match FlagStore::open(config.storage.flags_path.clone()) {
        Ok(store) => store,
        Err(e) => {
            logging::warn(DataSource::Storage, None, &format!("{}; starting with empty flags", e));
            FlagStore::empty(config.storage.flags_path.clone())
        }
    }
}

fn build_monitor(config: &Config, flags: &FlagStore, args: &LocationArgs) -> Result<Monitor, Box<dyn Error>> {
    let source = OpenMeteoClient::new(&config.api.air_quality_base_url, config.api.timeout())?;
    let geocoder = NominatimClient::new(
        &config.api.geocoding_base_url,
        &config.api.user_agent,
        config.api.timeout(),
    )?;

    let location = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => ConfiguredLocation::new(true, Some(Coordinate::new(lat, lon)?)),
        _ => ConfiguredLocation::new(config.location.permission_granted, config.location.coordinate()?),
    };

    let dispatcher = NotificationDispatcher::new(
        ConsoleNotifier::new(config.notifications.permission_granted),
        flags.notifications_enabled(),
    );

    Ok(AirQualityMonitor::new(
        source,
        geocoder,
        location,
        dispatcher,
        Sampler::new(config.schedule.change_threshold),
        config.schedule.debounce(),
        config.schedule.recheck_interval(),
    ))
}

fn print_screen(monitor: &Monitor) {
    for line in monitor.screen().render() {
        println!("{}", line);
    }
}

fn parse_input_line(line: &str) -> MonitorEvent {
    if let Some(rest) = line.strip_prefix(":submit ") {
        MonitorEvent::AddressSubmitted(rest.to_string())
    } else if line == ":recheck" {
        MonitorEvent::Recheck
    } else if line == ":quit" {
        MonitorEvent::Shutdown
    } else {
        MonitorEvent::AddressEdited(line.to_string())
    }
}

async fn check(config: &Config, flags: &FlagStore, args: &LocationArgs) -> Result<(), Box<dyn Error>> {
    let mut monitor = build_monitor(config, flags, args)?;
    match &args.address {
        Some(address) => monitor.submit_address(address).await,
        None => monitor.start().await,
    }
    monitor.settle().await;
    print_screen(&monitor);
    Ok(())
}

async fn watch(config: &Config, flags: &FlagStore, args: &LocationArgs) -> Result<(), Box<dyn Error>> {
    let mut monitor = build_monitor(config, flags, args)?;
    let (tx, rx) = mpsc::unbounded_channel();

    if let Some(address) = &args.address {
        let _ = tx.send(MonitorEvent::AddressSubmitted(address.clone()));
    }

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(parse_input_line(line.trim_end())).is_err() {
                break;
            }
        }
    });

    logging::info(
        DataSource::System,
        None,
        &format!(
            "Watching air quality (re-check every {} min)",
            config.schedule.recheck_interval_minutes
        ),
    );
    monitor.run(rx).await;
    print_screen(&monitor);
    logging::info(
        DataSource::System,
        None,
        &format!("Stopped; {} notification(s) sent", monitor.notifications_sent()),
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    logging::init_logger(
        config.logging.level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let mut flags = open_flags(&config);

    match cli.cmd {
        Command::Check(args) => {
            if flags.is_first_launch() {
                println!("Welcome to Vayura. Run `vayura start` to skip this message.");
            }
            check(&config, &flags, &args).await?;
        }
        Command::Watch(args) => watch(&config, &flags, &args).await?,
        Command::Start => {
            flags.mark_launched()?;
            println!("Welcome to Vayura. Breathe Smart. Live Clean.");
        }
        Command::Settings { cmd } => match cmd {
            SettingsCommand::Notifications { state } => {
                let enabled = matches!(state, Toggle::On);
                flags.set_notifications_enabled(enabled)?;
                println!("Notifications {}", if enabled { "enabled" } else { "disabled" });
            }
            SettingsCommand::Clear => {
                flags.clear_launch_marker()?;
                println!("Data cleared");
            }
        },
        Command::Verify { json } => {
            let report = verify::run_full_verification(&config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                verify::print_summary(&report);
            }
        }
    }

    Ok(())
}
