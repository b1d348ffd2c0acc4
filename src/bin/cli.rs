//! gatefind CLI - Debug tool for gate discovery
//!
//! Usage:
//!   gatefind-cli report <checkins.json> [--event <id>]
//!   gatefind-cli preview <checkins.json> [--event <id>]
//!   gatefind-cli run <checkins.json> [--event <id>]
//!
//! The input file is a JSON array of check-in events. The tool loads them
//! into an engine and prints the quality report, candidate preview, or full
//! pipeline summary per event, helping to understand how gates are being
//! inferred from a real check-in export.

use clap::{Parser, Subcommand};
use gatefind::{CheckinEvent, GateDiscoveryEngine};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gatefind-cli")]
#[command(about = "Debug tool for gate discovery from check-in exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the data-sufficiency quality report per event
    Report {
        /// JSON file containing an array of check-in events
        file: PathBuf,

        /// Restrict to a single event id
        #[arg(short, long)]
        event: Option<String>,
    },

    /// Compute gate candidates without persisting anything
    Preview {
        /// JSON file containing an array of check-in events
        file: PathBuf,

        /// Restrict to a single event id
        #[arg(short, long)]
        event: Option<String>,
    },

    /// Run the full pipeline and print the summary and resulting gates
    Run {
        /// JSON file containing an array of check-in events
        file: PathBuf,

        /// Restrict to a single event id
        #[arg(short, long)]
        event: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Commands::Report { file, event } => with_engine(&file, &event, |engine, event_id| {
            let report = engine.quality_report(event_id)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }),
        Commands::Preview { file, event } => with_engine(&file, &event, |engine, event_id| {
            let preview = engine.preview_discovery(event_id)?;
            println!(
                "event '{}': {:?} strategy, extent {:.1}m",
                event_id, preview.strategy, preview.sample_extent_meters
            );
            println!(
                "  physical candidates: {}",
                serde_json::to_string_pretty(&preview.physical)?
            );
            println!(
                "  virtual candidates: {}",
                serde_json::to_string_pretty(&preview.virtual_candidates)?
            );
            Ok(())
        }),
        Commands::Run { file, event } => with_engine(&file, &event, |engine, event_id| {
            let summary = engine.run_pipeline(event_id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            println!("{}", engine.gates_json(event_id));
            Ok(())
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load the check-in file, feed an engine, and apply `op` to each event.
fn with_engine(
    file: &PathBuf,
    only_event: &Option<String>,
    mut op: impl FnMut(&mut GateDiscoveryEngine, &str) -> Result<(), Box<dyn std::error::Error>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(file)?);
    let checkins: Vec<CheckinEvent> = serde_json::from_reader(reader)?;

    let mut events: BTreeSet<String> = checkins.iter().map(|c| c.event_id.clone()).collect();
    if let Some(event) = only_event {
        events.retain(|e| e == event);
        if events.is_empty() {
            return Err(format!("no check-ins for event '{event}' in the input").into());
        }
    }

    let mut engine = GateDiscoveryEngine::new();
    for checkin in checkins {
        engine.record_checkin(checkin)?;
    }

    for event_id in &events {
        op(&mut engine, event_id)?;
    }
    Ok(())
}
