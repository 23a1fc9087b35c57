// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use clap::{Parser, Subcommand};
use eventsync_cli::commands::{inspect, maintenance, pending};
use eventsync_cli::JournalLocation;

#[derive(Parser)]
#[command(name = "eventsync")]
#[command(about = "EventSync journal tool: inspect and maintain on-disk event journals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the status of a journal without modifying it.
    Inspect {
        #[command(flatten)]
        location: JournalLocation,
    },
    /// List queued events in delivery order.
    Pending {
        #[command(flatten)]
        location: JournalLocation,

        /// Maximum number of events to list
        #[arg(long, short, default_value_t = 50)]
        limit: usize,
    },
    /// Clear the deduplication ledger (account reset).
    ResetLedger {
        #[command(flatten)]
        location: JournalLocation,
    },
    /// Rewrite the journal to its minimal size.
    Compact {
        #[command(flatten)]
        location: JournalLocation,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { location } => inspect::run(&location),
        Commands::Pending { location, limit } => pending::run(&location, limit),
        Commands::ResetLedger { location } => maintenance::reset_ledger(&location).map(|_| ()),
        Commands::Compact { location } => maintenance::compact(&location).map(|_| ()),
    }
}
