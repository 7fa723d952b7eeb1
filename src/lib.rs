// Client core for the FAQ assistant: gateway to the FAQ backend, local history and stats.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod monitor;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;

use crate::api::{FaqApi, HttpFaqClient};
use crate::commands::{execute, Command, HELP};
use crate::config::ClientConfig;
use crate::history::HistoryStore;
use crate::state::AppState;
use crate::storage::SqliteStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Opens the durable history store, falling back to a detached one when the
/// database cannot be opened.
async fn open_history(config: &ClientConfig) -> HistoryStore {
    match SqliteStore::open(&config.database_path()).await {
        Ok(store) => HistoryStore::new(Arc::new(store)),
        Err(e) => {
            log::warn!("Local history unavailable, continuing without it: {:?}", e);
            HistoryStore::detached()
        }
    }
}

pub async fn run() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    log::info!("Using FAQ backend at {}", config.base_url);

    let history = open_history(&config).await;
    let api: Arc<dyn FaqApi> = Arc::new(HttpFaqClient::new(config.clone())?);
    let state = AppState::new(config, api, history).await;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{}\n> ", HELP).as_bytes()).await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let output = match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => execute(&state, command).await.unwrap_or_else(|e| e),
            Err(e) => e,
        };
        stdout.write_all(format!("{}\n> ", output).as_bytes()).await?;
        stdout.flush().await?;
    }

    state.monitor.stop();
    log::info!("Exiting");
    Ok(())
}
