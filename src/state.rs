use crate::api::FaqApi;
use crate::config::ClientConfig;
use crate::history::HistoryStore;
use crate::monitor::HealthMonitor;
use crate::session::{ChatSession, SearchSession};
use std::sync::Arc;
use tokio::sync::Mutex;

// Core application state shared by the console commands
#[derive(Clone)]
pub struct AppState {
    pub config: ClientConfig,
    pub api: Arc<dyn FaqApi>,
    pub history: HistoryStore,
    pub monitor: Arc<HealthMonitor>,
    // Sessions are mutated by commands, so they sit behind async mutexes
    pub chat: Arc<Mutex<ChatSession>>,
    pub search: Arc<Mutex<SearchSession>>,
}

impl AppState {
    /// Restores both sessions from history and starts the health monitor.
    pub async fn new(config: ClientConfig, api: Arc<dyn FaqApi>, history: HistoryStore) -> Self {
        let chat = ChatSession::restore(
            api.clone(),
            history.clone(),
            config.default_system_prompt.clone(),
        )
        .await;
        let search = SearchSession::restore(api.clone(), history.clone()).await;
        let monitor = HealthMonitor::start(api.clone(), config.health_interval);
        Self {
            config,
            api,
            history,
            monitor: Arc::new(monitor),
            chat: Arc::new(Mutex::new(chat)),
            search: Arc::new(Mutex::new(search)),
        }
    }
}
