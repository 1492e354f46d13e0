//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod append;
mod read;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use sheetappend::config::Config;

#[derive(Parser)]
#[command(name = "sheetappend")]
#[command(about = "Append structured rows to Google Sheets")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Append rows read from a JSON file (or stdin)
    Append {
        /// Spreadsheet key (the id in the spreadsheet URL)
        spreadsheet: String,
        /// Input file: a JSON array or JSON lines of {"sheet_id": .., "data": {..}}.
        /// Reads stdin when omitted or "-".
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Turn RFC 3339 and YYYY-MM-DD strings into date cells
        #[arg(long)]
        detect_dates: bool,
    },

    /// Print every record of a worksheet as JSON
    Read {
        /// Spreadsheet key, or title with --by-title
        spreadsheet: String,
        /// Zero-based worksheet index
        #[arg(short, long, default_value = "0")]
        worksheet: usize,
        /// Look the spreadsheet up by title instead of key
        #[arg(long)]
        by_title: bool,
    },

    /// Print the header row of a sheet
    Headers {
        /// Spreadsheet key
        spreadsheet: String,
        /// Numeric sheet id
        sheet_id: i64,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    match cli.command {
        Commands::Append {
            spreadsheet,
            input,
            detect_dates,
        } => append::cmd_append(&config, &spreadsheet, input.as_deref(), detect_dates).await,
        Commands::Read {
            spreadsheet,
            worksheet,
            by_title,
        } => read::cmd_read(&config, &spreadsheet, worksheet, by_title).await,
        Commands::Headers {
            spreadsheet,
            sheet_id,
        } => read::cmd_headers(&config, &spreadsheet, sheet_id).await,
    }
}
