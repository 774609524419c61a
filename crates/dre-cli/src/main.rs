//! DRE CLI - Ledger import and P&L reports
//!
//! Usage:
//!   dre init                       Initialize the local database
//!   dre import --file dre.xlsx     Replace the ledger with a spreadsheet export
//!   dre report --year 2024         Monthly and cumulative figures per project
//!   dre serve --port 3000          Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    // Every command but init works on the store picked by --store or DRE_STORE
    let open_store = || {
        let kind = cli.store.unwrap_or_else(dre_core::StoreKind::from_env);
        commands::open_store(&cli.db, kind, cli.no_encrypt)
    };

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt).await,
        Commands::Status => commands::cmd_status(&open_store()?).await,
        Commands::Import { file } => commands::cmd_import(open_store()?, &file).await,
        Commands::Report {
            year,
            project,
            json,
        } => {
            let reports = commands::report_service(open_store()?);
            commands::cmd_report(&reports, year, project.as_deref(), json).await
        }
        Commands::Projects => commands::cmd_projects(&commands::report_service(open_store()?)).await,
        Commands::Years => commands::cmd_years(&commands::report_service(open_store()?)).await,
        Commands::Records { limit } => {
            commands::cmd_records(&commands::report_service(open_store()?), limit).await
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(open_store()?, &host, port, no_auth).await,
    }
}
