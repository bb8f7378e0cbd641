use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::market::chart::ChartStore;
use crate::market::tickers::TickerStore;
use crate::market::types::{decode_tick_frame, FeedConfig, InterestFrame, TickerDelta};

pub type FeedWsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Default)]
struct SubscriptionInner {
    /// Interest refcounts per code: several screens may watch the same
    /// instrument, and it stays announced until the last one leaves.
    interest: BTreeMap<String, usize>,
    /// Instrument whose chart is on screen; only its ticks feed the
    /// candle aggregator.
    chart_focus: Option<String>,
}

/// Shared interest list read by the announcer and written by the UI shell.
/// Cheap to clone; all clones see the same set.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    inner: Arc<RwLock<SubscriptionInner>>,
}

impl SubscriptionSet {
    pub fn add_stock(&self, stock_code: &str) {
        let mut inner = self.inner.write();
        *inner.interest.entry(stock_code.to_string()).or_insert(0) += 1;
    }

    pub fn remove_stock(&self, stock_code: &str) {
        let mut inner = self.inner.write();
        if let Some(count) = inner.interest.get_mut(stock_code) {
            *count -= 1;
            if *count == 0 {
                inner.interest.remove(stock_code);
            }
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.interest.clear();
        inner.chart_focus = None;
    }

    /// Codes currently announced, in stable sorted order.
    pub fn codes(&self) -> Vec<String> {
        self.inner.read().interest.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().interest.is_empty()
    }

    pub fn set_chart_focus(&self, stock_code: Option<String>) {
        self.inner.write().chart_focus = stock_code;
    }

    pub fn chart_focus(&self) -> Option<String> {
        self.inner.read().chart_focus.clone()
    }
}

pub async fn connect_tick_stream(socket_url: &str) -> Result<FeedWsStream, AppError> {
    let ws_config = WebSocketConfig {
        max_message_size: Some(64 << 20),
        max_frame_size: Some(16 << 20),
        ..Default::default()
    };

    let (stream, _) = connect_async_with_config(socket_url, Some(ws_config), true).await?;
    Ok(stream)
}

enum FeedDirective {
    Continue,
    Closed,
}

/// Builds the interest announcement for one announcer tick, or `None` when
/// the interest list is empty (an empty list is never announced).
fn interest_announcement(subscriptions: &SubscriptionSet) -> Option<Message> {
    let codes = subscriptions.codes();
    if codes.is_empty() {
        return None;
    }

    let frame = InterestFrame::new(codes);
    match serde_json::to_string(&frame) {
        Ok(encoded) => Some(Message::Text(encoded)),
        Err(error) => {
            tracing::warn!(%error, "interest frame failed to encode");
            None
        }
    }
}

/// Routes one decoded tick into the projection stores. Every tick refreshes
/// the ticker projection; only ticks for the focused instrument reach the
/// candle aggregator.
fn apply_tick(
    delta: &TickerDelta,
    subscriptions: &SubscriptionSet,
    chart: &Arc<Mutex<ChartStore>>,
    tickers: &Arc<Mutex<TickerStore>>,
) {
    let Some(stock_code) = delta.stock_code.as_deref() else {
        tracing::trace!("tick frame without stock code dropped");
        return;
    };

    tickers.lock().update_from_socket(stock_code, delta);

    if subscriptions.chart_focus().as_deref() == Some(stock_code) {
        chart.lock().update_from_socket(stock_code, delta);
    }
}

fn handle_message(
    message: Message,
    subscriptions: &SubscriptionSet,
    chart: &Arc<Mutex<ChartStore>>,
    tickers: &Arc<Mutex<TickerStore>>,
) -> FeedDirective {
    let delta = match message {
        Message::Text(text_payload) => {
            let mut owned_payload = text_payload.into_bytes();
            match decode_tick_frame(owned_payload.as_mut_slice()) {
                Ok(decoded) => decoded,
                Err(error) => {
                    tracing::trace!(%error, "malformed tick frame dropped");
                    return FeedDirective::Continue;
                }
            }
        }
        Message::Binary(mut binary_payload) => {
            match decode_tick_frame(binary_payload.as_mut_slice()) {
                Ok(decoded) => decoded,
                Err(error) => {
                    tracing::trace!(%error, "malformed binary tick frame dropped");
                    return FeedDirective::Continue;
                }
            }
        }
        Message::Close(_) => return FeedDirective::Closed,
        _ => return FeedDirective::Continue,
    };

    apply_tick(&delta, subscriptions, chart, tickers);
    FeedDirective::Continue
}

/// Runs one push-feed session until the socket closes, errors, or the token
/// cancels. There is no automatic reconnect; the caller decides whether to
/// start a fresh session.
///
/// A periodic announcer task owns the write half and re-sends the full
/// interest list every interval. Sending the whole list each time means a
/// reconnected or lossy server converges without any diff protocol.
pub async fn run_feed(
    config: FeedConfig,
    subscriptions: SubscriptionSet,
    chart: Arc<Mutex<ChartStore>>,
    tickers: Arc<Mutex<TickerStore>>,
    cancel_token: CancellationToken,
) -> Result<(), AppError> {
    let stream = connect_tick_stream(&config.socket_url).await?;
    tracing::info!(socket_url = %config.socket_url, "push feed connected");
    let (mut sink, mut inbound) = stream.split();

    let announce_cancel = cancel_token.child_token();
    let announcer_cancel = announce_cancel.clone();
    let announcer_subscriptions = subscriptions.clone();
    let announce_interval_ms = config.announce_interval_ms;
    let announcer_handle: JoinHandle<()> = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(announce_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = announcer_cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(message) = interest_announcement(&announcer_subscriptions) else {
                        continue;
                    };
                    if let Err(error) = sink.send(message).await {
                        tracing::warn!(%error, "interest announcement failed, stopping announcer");
                        break;
                    }
                }
            }
        }
    });

    loop {
        let frame = tokio::select! {
            _ = cancel_token.cancelled() => break,
            next_message = inbound.next() => next_message,
        };

        let Some(frame_result) = frame else {
            tracing::info!("push feed closed by remote");
            break;
        };

        match frame_result {
            Ok(message) => {
                if let FeedDirective::Closed =
                    handle_message(message, &subscriptions, &chart, &tickers)
                {
                    tracing::info!("push feed sent close frame");
                    break;
                }
            }
            Err(error) => {
                tracing::warn!(%error, "push feed frame error, stopping session");
                break;
            }
        }
    }

    announce_cancel.cancel();
    let _ = announcer_handle.await;
    Ok(())
}

/// Owner of one live feed session. Dropping without [`FeedHandle::shutdown`]
/// detaches the task; shutdown is cancel-then-await so no frame is applied
/// after it returns.
#[derive(Debug)]
pub struct FeedHandle {
    cancel_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl FeedHandle {
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        let _ = self.join_handle.await;
    }
}

pub fn spawn_feed(
    config: FeedConfig,
    subscriptions: SubscriptionSet,
    chart: Arc<Mutex<ChartStore>>,
    tickers: Arc<Mutex<TickerStore>>,
) -> FeedHandle {
    let cancel_token = CancellationToken::new();
    let task_cancel = cancel_token.clone();
    let join_handle = tokio::spawn(async move {
        if let Err(error) = run_feed(config, subscriptions, chart, tickers, task_cancel).await {
            tracing::warn!(%error, "push feed session ended with error");
        }
    });

    FeedHandle {
        cancel_token,
        join_handle,
    }
}
