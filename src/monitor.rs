use crate::api::FaqApi;
use crate::models::{now, HealthStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Backend connectivity as last observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStatus {
    pub connected: bool,
    /// Last successful snapshot; kept when later checks fail.
    pub last_health: Option<HealthStatus>,
    pub last_error: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// Re-checks backend health on a fixed interval.
///
/// Every tick spawns an independent check, so a slow check can overlap the next one;
/// whichever resolves last determines the status. Checks already in flight finish
/// even after the monitor stops.
pub struct HealthMonitor {
    status: Arc<Mutex<ConnectionStatus>>,
    ticker: JoinHandle<()>,
}

impl HealthMonitor {
    /// Starts polling immediately. Must be called inside a tokio runtime.
    pub fn start(api: Arc<dyn FaqApi>, interval: Duration) -> Self {
        let status = Arc::new(Mutex::new(ConnectionStatus::default()));
        let interval = interval.max(MIN_INTERVAL);
        log::info!("Starting health monitor (every {:?})", interval);
        let ticker = tokio::spawn(run_ticker(api, interval, status.clone()));
        Self { status, ticker }
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.status.lock().await.clone()
    }

    pub fn stop(&self) {
        if !self.ticker.is_finished() {
            log::info!("Stopping health monitor");
        }
        self.ticker.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

async fn run_ticker(api: Arc<dyn FaqApi>, interval: Duration, status: Arc<Mutex<ConnectionStatus>>) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let api = api.clone();
        let status = status.clone();
        tokio::spawn(async move {
            check_once(api.as_ref(), &status).await;
        });
    }
}

/// Runs a single health check and records its outcome.
pub async fn check_once(api: &dyn FaqApi, status: &Mutex<ConnectionStatus>) {
    let result = api.check_health().await;
    let mut current = status.lock().await;
    current.checked_at = Some(now());
    match result {
        Ok(health) => {
            log::debug!(
                "Backend healthy: {} FAQ records, model {}",
                health.faq_records,
                health.model
            );
            current.connected = true;
            current.last_health = Some(health);
            current.last_error = None;
        }
        Err(e) => {
            log::warn!("Backend health check failed: {}", e);
            current.connected = false;
            current.last_error = Some(e.to_string());
        }
    }
}
