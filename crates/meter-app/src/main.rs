//! Meter command line shell.

use anyhow::Result;
use clap::{Parser, Subcommand};
use meter_app::{build_service, AppConfig, MeterService};
use meter_core::{Meter, Outpoint};
use tracing::info;

/// Ledger-backed counters.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via METER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List live meters reported by the overlay
    List,
    /// Create a new meter with value 1
    Create,
    /// Increment the meter at OUTPOINT (<txid>.<index>)
    Increment { outpoint: Outpoint },
    /// Decrement the meter at OUTPOINT (<txid>.<index>)
    Decrement { outpoint: Outpoint },
}

fn print_meter(service: &MeterService, meter: &Meter) {
    let stale = if service.is_stale(&meter.outpoint()) {
        " (stale)"
    } else {
        ""
    };
    println!(
        "{}\t{}\t{}{}",
        meter.outpoint(),
        meter.value(),
        meter.owner(),
        stale
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config)?;
    meter_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting meter v{}", env!("CARGO_PKG_VERSION"));

    let service = build_service(&config)?;

    match args.command {
        Command::List => {
            let report = service.refresh().await?;
            for meter in service.meters() {
                print_meter(&service, &meter);
            }
            if !report.diagnostics.is_empty() {
                eprintln!("{} candidate(s) skipped", report.diagnostics.len());
            }
        }
        Command::Create => {
            let meter = service.create().await?;
            print_meter(&service, &meter);
        }
        Command::Increment { outpoint } => {
            service.refresh().await?;
            let meter = service.increment(&outpoint).await?;
            print_meter(&service, &meter);
        }
        Command::Decrement { outpoint } => {
            service.refresh().await?;
            let meter = service.decrement(&outpoint).await?;
            print_meter(&service, &meter);
        }
    }

    Ok(())
}
