use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::BINANCE;
#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::domain::{OrderBookDelta, OrderBookSnapshot, RawPriceLevel};
use crate::models::PeakRange;
use crate::utils::time_utils::now_ms;

/// Raw `price → quantity` maps of both book sides, as the exchange reports them.
#[derive(Debug, Clone, Default)]
pub struct RawOrderBook {
    pub asks: HashMap<String, f64>,
    pub bids: HashMap<String, f64>,
    /// Sequence of the last accepted snapshot or delta
    pub last_update_id: u64,
    /// Deltas priced outside this window are ignored
    pub window: Option<PeakRange>,
}

fn apply_levels(side: &mut HashMap<String, f64>, levels: &[RawPriceLevel], window: Option<PeakRange>) {
    for level in levels {
        if let Some(window) = window
            && let Ok(price) = level.price.parse::<f64>()
            && !window.contains(price)
        {
            continue;
        }
        if level.quantity == 0.0 {
            side.remove(&level.price);
        } else {
            side.insert(level.price.clone(), level.quantity);
        }
    }
}

impl RawOrderBook {
    /// Replaces both sides wholesale.
    pub fn apply_snapshot(&mut self, snapshot: OrderBookSnapshot) {
        self.asks = to_map(snapshot.asks);
        self.bids = to_map(snapshot.bids);
        self.last_update_id = snapshot.last_update_id;
    }

    /// Applies a delta unless it is older than the last accepted sequence.
    /// Returns whether the delta was applied.
    pub fn apply_delta(&mut self, delta: &OrderBookDelta) -> bool {
        if delta.final_update_id < self.last_update_id {
            return false;
        }
        apply_levels(&mut self.asks, &delta.asks, self.window);
        apply_levels(&mut self.bids, &delta.bids, self.window);
        self.last_update_id = delta.final_update_id;
        true
    }
}

fn to_map(levels: Vec<RawPriceLevel>) -> HashMap<String, f64> {
    levels
        .into_iter()
        .filter(|l| l.quantity > 0.0)
        .map(|l| (l.price, l.quantity))
        .collect()
}

/// Binance diff-depth payload.
#[derive(Debug, Deserialize)]
struct DepthUpdateMessage {
    #[serde(rename = "E")]
    event_time: i64,
    #[serde(rename = "U")]
    first_update_id: u64,
    #[serde(rename = "u")]
    final_update_id: u64,
    #[serde(rename = "b")]
    bids: Vec<Vec<String>>,
    #[serde(rename = "a")]
    asks: Vec<Vec<String>>,
}

impl From<DepthUpdateMessage> for OrderBookDelta {
    fn from(msg: DepthUpdateMessage) -> Self {
        let levels = |pairs: Vec<Vec<String>>| -> Vec<RawPriceLevel> {
            pairs.iter().filter_map(|p| RawPriceLevel::from_pair(p)).collect()
        };
        OrderBookDelta {
            event_time: msg.event_time,
            first_update_id: msg.first_update_id,
            final_update_id: msg.final_update_id,
            asks: levels(msg.asks),
            bids: levels(msg.bids),
        }
    }
}

/// Parses one websocket text frame. `None` for anything that is not a depth update.
pub fn parse_depth_update(text: &str) -> Option<OrderBookDelta> {
    serde_json::from_str::<DepthUpdateMessage>(text)
        .ok()
        .map(OrderBookDelta::from)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Reconnecting,
    Disconnected,
}

/// Keeps one diff-depth websocket alive and feeds every delta into the shared book.
/// A health check forces a reconnect once the feed has been silent for too long.
pub struct OrderBookStream {
    symbol: String,
    book: Arc<Mutex<RawOrderBook>>,
    status: Arc<Mutex<ConnectionStatus>>,
    last_message_ms: Arc<AtomicI64>,
    force_reconnect: Arc<Notify>,
}

impl OrderBookStream {
    pub fn new(symbol: &str, book: Arc<Mutex<RawOrderBook>>) -> Self {
        Self {
            symbol: symbol.to_lowercase(),
            book,
            status: Arc::new(Mutex::new(ConnectionStatus::Disconnected)),
            last_message_ms: Arc::new(AtomicI64::new(0)),
            force_reconnect: Arc::new(Notify::new()),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.lock().unwrap()
    }

    /// Milliseconds since the last frame, `None` before the first one.
    pub fn time_since_last_message(&self, now: i64) -> Option<i64> {
        match self.last_message_ms.load(Ordering::Relaxed) {
            0 => None,
            last => Some(now - last),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/{}{}",
            BINANCE.ws.base_url, self.symbol, BINANCE.ws.depth_stream_suffix
        )
    }

    /// Spawns the connection loop and its health check on the current runtime.
    pub fn spawn(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        let stream = tokio::spawn(run_with_reconnect(
            self.url(),
            self.book.clone(),
            self.status.clone(),
            self.last_message_ms.clone(),
            self.force_reconnect.clone(),
        ));
        let health = tokio::spawn(run_health_check(
            self.status.clone(),
            self.last_message_ms.clone(),
            self.force_reconnect.clone(),
        ));
        (stream, health)
    }
}

async fn run_with_reconnect(
    url: String,
    book: Arc<Mutex<RawOrderBook>>,
    status: Arc<Mutex<ConnectionStatus>>,
    last_message_ms: Arc<AtomicI64>,
    force_reconnect: Arc<Notify>,
) {
    loop {
        *status.lock().unwrap() = ConnectionStatus::Reconnecting;
        match run_stream(&url, &book, &status, &last_message_ms, &force_reconnect).await {
            Ok(()) => log::info!("Order book stream closed, reconnecting..."),
            Err(e) => log::error!("Order book stream error: {}", e),
        }
        *status.lock().unwrap() = ConnectionStatus::Disconnected;
        tokio::time::sleep(Duration::from_secs(BINANCE.ws.reconnect_delay_sec)).await;
    }
}

async fn run_stream(
    url: &str,
    book: &Arc<Mutex<RawOrderBook>>,
    status: &Arc<Mutex<ConnectionStatus>>,
    last_message_ms: &AtomicI64,
    force_reconnect: &Notify,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    log::info!("Connecting to Binance depth stream: {}", url);
    let (ws_stream, _) = connect_async(url).await?;
    *status.lock().unwrap() = ConnectionStatus::Connected;
    last_message_ms.store(now_ms(), Ordering::Relaxed);

    let (_write, mut read) = ws_stream.split();
    loop {
        let msg = tokio::select! {
            msg = read.next() => msg,
            _ = force_reconnect.notified() => {
                log::warn!("Order book stream silent, forcing reconnect");
                return Ok(());
            }
        };
        let Some(msg) = msg else {
            return Ok(());
        };
        match msg {
            Ok(Message::Text(text)) => {
                last_message_ms.store(now_ms(), Ordering::Relaxed);
                let text: &str = &text;
                match parse_depth_update(text) {
                    Some(delta) => {
                        let _applied = book.lock().unwrap().apply_delta(&delta);
                        #[cfg(debug_assertions)]
                        if DEBUG_FLAGS.print_liquidity_stream_updates {
                            log::info!(
                                "[depth-stream] u={} applied={}",
                                delta.final_update_id,
                                _applied
                            );
                        }
                    }
                    None => log::warn!("Unexpected depth stream payload: {}", text),
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                last_message_ms.store(now_ms(), Ordering::Relaxed);
            }
            Ok(Message::Close(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }
}

async fn run_health_check(
    status: Arc<Mutex<ConnectionStatus>>,
    last_message_ms: Arc<AtomicI64>,
    force_reconnect: Arc<Notify>,
) {
    let mut interval =
        tokio::time::interval(Duration::from_secs(BINANCE.ws.health_check_interval_sec));
    loop {
        interval.tick().await;
        if *status.lock().unwrap() != ConnectionStatus::Connected {
            continue;
        }
        let silence = now_ms() - last_message_ms.load(Ordering::Relaxed);
        if silence > BINANCE.ws.silence_limit_sec as i64 * 1000 {
            request_reconnect(&force_reconnect);
        }
    }
}

/// Wakes the connection currently listening. Nothing is stored when no connection
/// listens, so a later fresh connection is not dropped by a stale request.
fn request_reconnect(force_reconnect: &Notify) {
    force_reconnect.notify_waiters();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(final_update_id: u64, asks: &[(&str, f64)], bids: &[(&str, f64)]) -> OrderBookDelta {
        let levels = |v: &[(&str, f64)]| v.iter().map(|(p, q)| RawPriceLevel::new(*p, *q)).collect();
        OrderBookDelta {
            event_time: 0,
            first_update_id: final_update_id,
            final_update_id,
            asks: levels(asks),
            bids: levels(bids),
        }
    }

    fn book() -> RawOrderBook {
        let mut book = RawOrderBook::default();
        book.apply_snapshot(OrderBookSnapshot {
            last_update_id: 100,
            asks: vec![RawPriceLevel::new("101.0", 2.0)],
            bids: vec![RawPriceLevel::new("99.0", 3.0)],
        });
        book
    }

    #[test]
    fn zero_quantity_deletes_level() {
        let mut book = book();
        assert!(book.apply_delta(&delta(101, &[("101.0", 0.0), ("102.0", 1.0)], &[])));
        assert!(!book.asks.contains_key("101.0"));
        assert_eq!(book.asks.get("102.0"), Some(&1.0));
        assert_eq!(book.last_update_id, 101);
    }

    #[test]
    fn stale_delta_is_dropped() {
        let mut book = book();
        assert!(!book.apply_delta(&delta(99, &[("101.0", 9.0)], &[])));
        assert_eq!(book.asks.get("101.0"), Some(&2.0));
        assert_eq!(book.last_update_id, 100);
    }

    #[test]
    fn levels_outside_window_are_ignored() {
        let mut book = book();
        book.window = Some(PeakRange::around(100.0, 1.5));
        book.apply_delta(&delta(101, &[("150.0", 4.0), ("100.5", 1.0)], &[("99.0", 0.0)]));
        assert!(!book.asks.contains_key("150.0"));
        assert!(book.asks.contains_key("100.5"));
        assert!(book.bids.is_empty());
    }

    #[test]
    fn parses_binance_depth_update() {
        let text = r#"{"e":"depthUpdate","E":1700000000000,"s":"BTCUSDT","U":157,"u":160,
            "b":[["0.0024","10"]],"a":[["0.0026","100"],["bad","1"]]}"#;
        let delta = parse_depth_update(text).unwrap();
        assert_eq!(delta.first_update_id, 157);
        assert_eq!(delta.final_update_id, 160);
        assert_eq!(delta.bids, vec![RawPriceLevel::new("0.0024", 10.0)]);
        assert_eq!(delta.asks.len(), 1);
        assert!(parse_depth_update(r#"{"result":null,"id":1}"#).is_none());
    }

    #[tokio::test]
    async fn reconnect_request_only_reaches_live_connection() {
        let notify = Notify::new();
        request_reconnect(&notify);
        let stale = tokio::time::timeout(Duration::from_millis(20), notify.notified()).await;
        assert!(stale.is_err());

        let listening = notify.notified();
        request_reconnect(&notify);
        let woken = tokio::time::timeout(Duration::from_millis(20), listening).await;
        assert!(woken.is_ok());
    }

    #[test]
    fn fresh_stream_reports_no_message_yet() {
        let stream = OrderBookStream::new("BTCUSDT", Arc::new(Mutex::new(RawOrderBook::default())));
        assert_eq!(stream.status(), ConnectionStatus::Disconnected);
        assert_eq!(stream.time_since_last_message(now_ms()), None);
        assert!(stream.url().ends_with("/btcusdt@depth@100ms"));
    }
}
