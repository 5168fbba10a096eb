//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::{FileConfigAdapter, ENV_PREFIX};
use crate::adapters::open_store;
use crate::domain::error::LedgerError;
use crate::domain::stock::to_stock_map;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Parser, Debug)]
#[command(name = "stockledger", about = "Inventory and sales ledger service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [web] listen
        #[arg(long)]
        listen: Option<String>,
    },
    /// Create the stocks and sales tables
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print every stock and its amount
    Stocks {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the total value of recorded sales
    TotalSales {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { config, listen } => run_serve(&config, listen.as_deref()),
        Command::InitDb { config } => run_init_db(&config),
        Command::Stocks { config } => run_stocks(&config),
        Command::TotalSales { config } => run_total_sales(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, LedgerError> {
    tracing::info!(path = %path.display(), "loading config");
    Ok(FileConfigAdapter::from_file(path)?.with_env_overrides(ENV_PREFIX))
}

pub fn listen_addr(
    config: &dyn ConfigPort,
    listen_override: Option<&str>,
) -> Result<SocketAddr, LedgerError> {
    let listen = listen_override
        .map(str::to_string)
        .or_else(|| config.get_string("web", "listen"))
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());

    listen.parse().map_err(|e: std::net::AddrParseError| LedgerError::ConfigInvalid {
        section: "web".into(),
        key: "listen".into(),
        reason: format!("{listen}: {e}"),
    })
}

fn run_init_db(config_path: &PathBuf) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    store.initialize_schema()?;
    eprintln!("Schema initialized");
    Ok(())
}

fn run_stocks(config_path: &PathBuf) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let stocks = store.list_stocks()?;

    if stocks.is_empty() {
        eprintln!("No stocks found");
        return Ok(());
    }
    let count = stocks.len();
    for (name, amount) in to_stock_map(stocks) {
        println!("{name}\t{amount}");
    }
    eprintln!("{count} stocks found");
    Ok(())
}

fn run_total_sales(config_path: &PathBuf) -> Result<(), LedgerError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    println!("{}", store.total_sales()?);
    Ok(())
}

fn run_serve(config_path: &PathBuf, listen_override: Option<&str>) -> Result<(), LedgerError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};

        let config = load_config(config_path)?;
        let addr = listen_addr(&config, listen_override)?;
        let store = open_store(&config)?;

        let router = build_router(AppState { store });

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
        })?;

        // The store (and its pool) drops with the router once serve returns.
        tracing::info!("server stopped");
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = (config_path, listen_override);
        Err(LedgerError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "web feature is required for serve".into(),
        })
    }
}

#[cfg(feature = "web")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
