use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use sqlx::SqlitePool;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::AppError;
use crate::history::{HistoryAdapter, HistoryEngine};
use crate::market::chart::ChartStore;
use crate::market::feed::{spawn_feed, FeedHandle, SubscriptionSet};
use crate::market::tickers::TickerStore;
use crate::market::types::FeedArgs;
use crate::toast::ToastStore;

/// One container for everything the UI shell needs. Built once at startup
/// and shared by reference; no store in here is a global.
pub struct AppState {
    pub started_at: Instant,
    pub db_pool: SqlitePool,
    pub history: Mutex<HistoryEngine<Box<dyn HistoryAdapter + Send>>>,
    pub chart: Arc<Mutex<ChartStore>>,
    pub tickers: Arc<Mutex<TickerStore>>,
    pub toasts: ToastStore,
    pub subscriptions: SubscriptionSet,
    pub feed: AsyncMutex<Option<FeedHandle>>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, history_adapter: Box<dyn HistoryAdapter + Send>) -> Self {
        Self {
            started_at: Instant::now(),
            db_pool,
            history: Mutex::new(HistoryEngine::new(history_adapter)),
            chart: Arc::new(Mutex::new(ChartStore::default())),
            tickers: Arc::new(Mutex::new(TickerStore::default())),
            toasts: ToastStore::default(),
            subscriptions: SubscriptionSet::default(),
            feed: AsyncMutex::new(None),
            http_client: reqwest::Client::new(),
        }
    }

    /// Replaces any running feed session with a fresh one. The previous
    /// session is cancelled and awaited first, so two sessions never write
    /// to the stores at the same time.
    pub async fn start_feed(&self, args: FeedArgs) -> Result<(), AppError> {
        let config = args.normalize()?;

        let mut guard = self.feed.lock().await;
        if let Some(previous) = guard.take() {
            previous.shutdown().await;
        }
        *guard = Some(spawn_feed(
            config,
            self.subscriptions.clone(),
            Arc::clone(&self.chart),
            Arc::clone(&self.tickers),
        ));
        Ok(())
    }

    pub async fn stop_feed(&self) {
        let mut guard = self.feed.lock().await;
        if let Some(handle) = guard.take() {
            handle.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{initialize_pool_from_path, unique_db_path};
    use crate::history::NullAdapter;

    async fn test_state(label: &str) -> AppState {
        let pool = initialize_pool_from_path(&unique_db_path(label))
            .await
            .expect("pool initialization should succeed");
        AppState::new(pool, Box::new(NullAdapter))
    }

    #[tokio::test]
    async fn start_feed_rejects_invalid_args() {
        let state = test_state("state-badargs").await;
        let result = state.start_feed(FeedArgs::default()).await;
        assert!(result.is_err());
        assert!(state.feed.lock().await.is_none());
    }

    #[tokio::test]
    async fn stop_feed_without_a_session_is_a_no_op() {
        let state = test_state("state-stop").await;
        state.stop_feed().await;
        assert!(state.feed.lock().await.is_none());
    }

    #[tokio::test]
    async fn start_then_stop_clears_the_handle() {
        let state = test_state("state-cycle").await;
        let args = FeedArgs {
            socket_url: Some("ws://127.0.0.1:9".to_string()),
            announce_interval_ms: None,
        };

        state
            .start_feed(args)
            .await
            .expect("spawning the session should succeed");
        assert!(state.feed.lock().await.is_some());

        state.stop_feed().await;
        assert!(state.feed.lock().await.is_none());
    }
}
