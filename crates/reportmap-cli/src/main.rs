//! ReportMap CLI
//!
//! Command-line interface for the ReportMap store

use clap::{Parser, Subcommand};

mod commands;

use commands::GlobalArgs;

#[derive(Debug, Parser)]
#[command(name = "reportmap")]
#[command(about = "ReportMap - event reports over a mapped SQLite store", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the store and apply migrations
    Init,
    /// User operations
    User(commands::user::UserArgs),
    /// Event operations
    Event(commands::event::EventArgs),
    /// Report operations
    Report(commands::report::ReportArgs),
}

fn main() {
    reportmap_core::logging_facility::init_from_env();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli.global),
        Commands::User(args) => commands::user::execute(&cli.global, args),
        Commands::Event(args) => commands::event::execute(&cli.global, args),
        Commands::Report(args) => commands::report::execute(&cli.global, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
