//! DAF CLI
//!
//! Runs one command against a SQLite database through the execution facade
//! and prints the result as a JSON response envelope.

use clap::{Parser, Subcommand};
use commands::exec::{ExecArgs, Operation};
use daf_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "daf")]
#[command(about = "DAF - run database commands through the execution facade", long_about = None)]
struct Cli {
    /// Emit logs as JSON instead of human-readable text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Return the generated identity (first column of the first row)
    Identity(ExecArgs),
    /// Materialize the full result set
    Table(ExecArgs),
    /// Stream the result set through a forward-only reader
    Reader(ExecArgs),
    /// Materialize the result set as a sortable view
    View(ExecArgs),
    /// Return the first column of the first row as text
    Scalar(ExecArgs),
    /// Return the number of rows changed
    NonQuery(ExecArgs),
    /// Like non-query, but report backend failures as text
    TryNonQuery(ExecArgs),
}

fn main() {
    let cli = Cli::parse();
    init(if cli.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let (operation, args) = match cli.command {
        Commands::Identity(args) => (Operation::Identity, args),
        Commands::Table(args) => (Operation::Table, args),
        Commands::Reader(args) => (Operation::Reader, args),
        Commands::View(args) => (Operation::View, args),
        Commands::Scalar(args) => (Operation::Scalar, args),
        Commands::NonQuery(args) => (Operation::NonQuery, args),
        Commands::TryNonQuery(args) => (Operation::TryNonQuery, args),
    };

    if let Err(e) = commands::exec::execute(operation, args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
