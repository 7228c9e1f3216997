use anyhow::{Context, Result};
use barberpro_sync::application::ports::local_store::LocalStore;
use barberpro_sync::domain::value_objects::{Collection, SyncStatus};
use barberpro_sync::{init_logging, AppConfig, AppState};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Parser)]
#[command(name = "sync-agent")]
#[command(about = "BarberPro offline sync agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database URL (overrides BARBERPRO_DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch connectivity and drain the queue whenever the backend comes back
    Run,
    /// Deliver pending operations once
    Drain,
    /// Reconcile local records with the backend once
    Pull,
    /// Print connectivity, queue and record status as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    let state = AppState::initialize(config)
        .await
        .context("failed to initialize sync core")?;
    info!("sync-agent v{} ready", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Run => run(&state).await,
        Commands::Drain => drain(&state).await,
        Commands::Pull => pull(&state).await,
        Commands::Status => status(&state).await,
    };

    state.shutdown().await;
    result
}

async fn run(state: &AppState) -> Result<()> {
    state.start();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    Ok(())
}

async fn drain(state: &AppState) -> Result<()> {
    state.network_monitor.poll_once().await;
    let report = state.sync_coordinator.drain_pending_operations().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn pull(state: &AppState) -> Result<()> {
    state.network_monitor.poll_once().await;
    let report = state.reconcile_from_server().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn status(state: &AppState) -> Result<()> {
    state.network_monitor.poll_once().await;
    let pending = state.local_store.pending_operations().await?;

    let mut records = BTreeMap::new();
    for collection in Collection::ALL {
        let mut by_status: BTreeMap<&'static str, u32> = [
            SyncStatus::Synced,
            SyncStatus::Pending,
            SyncStatus::Conflict,
        ]
        .iter()
        .map(|status| (status.as_str(), 0))
        .collect();
        for record in state.records(collection).await? {
            *by_status.entry(record.sync_status().as_str()).or_insert(0) += 1;
        }
        records.insert(collection.table_name(), by_status);
    }

    let report = json!({
        "online": state.is_online().await,
        "reachability": state.network_monitor.reachability().await,
        "pending_operations": pending.len(),
        "records": records,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
