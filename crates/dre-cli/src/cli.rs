//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dre_core::StoreKind;

/// DRE - Ledger import and project P&L reports
#[derive(Parser)]
#[command(name = "dre")]
#[command(about = "Import DRE ledger exports and report monthly P&L per project", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (sqlite store)
    #[arg(long, default_value = "dre.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set DRE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Record store: sqlite, rest or memory (default: DRE_STORE, then sqlite)
    ///
    /// The rest store reads DRE_DATABASE_URL and DRE_API_KEY.
    #[arg(long, global = true)]
    pub store: Option<StoreKind>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the local database
    Init,

    /// Replace all records with the actual lines of a spreadsheet export
    Import {
        /// Spreadsheet to import (.csv, .xlsx, .xlsm, .xls, .ods)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Monthly and cumulative revenue, cost and margin per project
    Report {
        /// Year to report (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Restrict to one project
        #[arg(short, long)]
        project: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List projects found in the records
    Projects,

    /// List years found in record periods
    Years,

    /// Show stored records
    Records {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show the selected store and its record count
    Status,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        #[arg(long)]
        no_auth: bool,
    },
}
