//! Operator CLI for the chronotag acquisition pipeline.
//!
//! This binary is the stand-in for the dashboard layer: it drives a
//! [`ReaderSession`] through the same operations the web collaborator
//! consumes, mapping `Result`s to exit codes and console messages.

use anyhow::Context;
use chronotag_core::Gate;
use chronotag_reader::{ReaderSession, SessionConfig, list_serial_ports};
use chronotag_storage::{RegionStore, merged_records};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chronotag", version, about = "UHF RFID race timing acquisition")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports and their availability.
    Ports,

    /// Connect to a reader and acquire tags.
    Run {
        /// Serial device, e.g. /dev/ttyUSB0 or COM3.
        #[arg(long)]
        port: String,

        /// Baud rate.
        #[arg(long, default_value_t = 57_600)]
        baud: u32,

        /// Gate to record detections against (start or finish).
        #[arg(long, default_value = "start")]
        gate: Gate,

        /// Append-only detection log.
        #[arg(long, default_value = "rfid_data.csv")]
        event_log: PathBuf,

        /// Structured store directory.
        #[arg(long, default_value = "race_store")]
        store: PathBuf,

        /// Seconds to acquire for; 0 runs until Enter is pressed.
        #[arg(long, default_value_t = 0)]
        duration: u64,
    },

    /// Import a participant roster (wholesale replace).
    Import {
        /// Structured store directory.
        #[arg(long, default_value = "race_store")]
        store: PathBuf,

        /// Roster CSV with the 7 standard columns.
        #[arg(long)]
        file: PathBuf,
    },

    /// Print merged start/finish results per participant.
    Merge {
        /// Structured store directory.
        #[arg(long, default_value = "race_store")]
        store: PathBuf,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Ports => ports(),
        Command::Run {
            port,
            baud,
            gate,
            event_log,
            store,
            duration,
        } => run(&port, baud, gate, event_log, store, duration),
        Command::Import { store, file } => import(&store, &file),
        Command::Merge { store, json } => merge(&store, json),
    }
}

fn ports() -> anyhow::Result<()> {
    let ports = list_serial_ports().context("serial port enumeration failed")?;
    if ports.is_empty() {
        println!("No serial ports detected.");
        return Ok(());
    }

    for port in ports {
        println!(
            "{:<24} {:<12} {}",
            port.device,
            port.status.to_string(),
            port.description
        );
    }
    Ok(())
}

fn run(
    port: &str,
    baud: u32,
    gate: Gate,
    event_log: PathBuf,
    store: PathBuf,
    duration: u64,
) -> anyhow::Result<()> {
    let mut session = ReaderSession::new(SessionConfig {
        event_log_path: event_log,
        store_dir: store,
        gate,
        ..SessionConfig::default()
    })?;

    let message = session
        .setup_connection(port, baud)
        .with_context(|| format!("cannot connect to {port}"))?;
    println!("{message}");

    println!("{}", session.start()?);

    if duration > 0 {
        let deadline = Instant::now() + Duration::from_secs(duration);
        while Instant::now() < deadline {
            std::thread::sleep(Duration::from_secs(1));
            print_stats(&session);
        }
    } else {
        println!("Acquiring; press Enter to stop.");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
    }

    println!("{}", session.stop()?);
    print_stats(&session);

    for record in session.get_data() {
        println!(
            "{}  {}  rssi={} antenna={}",
            record.timestamp_display(),
            record.epc,
            record.rssi,
            record.antenna
        );
    }
    Ok(())
}

fn print_stats(session: &ReaderSession) {
    let stats = session.get_stats();
    info!(
        total_reads = stats.total_reads,
        last_read = %stats.last_read_display(),
        "session stats"
    );
}

fn import(store: &Path, file: &Path) -> anyhow::Result<()> {
    let store = RegionStore::open(store)?;
    let count = store
        .import_participants(file)
        .with_context(|| format!("import from {} failed", file.display()))?;
    println!("Imported {count} participants.");
    Ok(())
}

fn merge(store: &Path, json: bool) -> anyhow::Result<()> {
    let store = RegionStore::open(store)?;
    let merged = merged_records(&store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
        return Ok(());
    }

    println!(
        "{:<6} {:<24} {:<20} {:<20} {:<10}",
        "Bib", "Name", "Start", "Finish", "Duration"
    );
    for record in merged {
        println!(
            "{:<6} {:<24} {:<20} {:<20} {:<10}",
            record.bib,
            record.name,
            record.start_display(),
            record.finish_display(),
            record.duration_display()
        );
    }
    Ok(())
}
