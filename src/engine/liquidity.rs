//! Liquidity engine: live order book image, intensity peaks and bid liquidity power.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::analysis::liquidity_analysis::{
    build_side, calculate_bid_liquidity_power, calculate_peaks, group_levels, weighted_points,
};
use crate::config::LiquidityConfig;
use crate::data::order_book_rest::OrderBookSource;
use crate::data::order_book_stream::RawOrderBook;
use crate::data::store::{Store, load_or_init_config, save_config};
use crate::domain::{BookSide, OrderBookDelta, OrderBookSnapshot};
use crate::models::{
    LiquidityBuild, LiquidityFullState, MinifiedLiquidityState, PeakRange,
};
use crate::utils::state_utils::calculate_intensity_requirements;
use crate::utils::time_utils::minutes_to_ms;

pub const CONFIG_KEY: &str = "liquidity";

/// Fetches a snapshot and swaps it into `book`. A failed fetch leaves the book untouched.
pub async fn sync_book_snapshot(
    book: &Mutex<RawOrderBook>,
    source: &dyn OrderBookSource,
    symbol: &str,
) -> Result<u64> {
    let snapshot = source.fetch_snapshot(symbol).await?;
    let id = snapshot.last_update_id;
    book.lock().unwrap().apply_snapshot(snapshot);
    Ok(id)
}

pub struct LiquidityEngine {
    config: LiquidityConfig,
    store: Arc<dyn Store>,
    book: Arc<Mutex<RawOrderBook>>,
    requirements_updated_at: Option<i64>,
    full: LiquidityFullState,
}

impl LiquidityEngine {
    /// Loads the stored configuration (persisting defaults on first run).
    pub fn initialize(store: Arc<dyn Store>) -> Result<Self> {
        let config: LiquidityConfig = load_or_init_config(store.as_ref(), CONFIG_KEY)?;
        config.validate()?;
        Ok(Self {
            config,
            store,
            book: Arc::new(Mutex::new(RawOrderBook::default())),
            requirements_updated_at: None,
            full: LiquidityFullState::default(),
        })
    }

    pub fn config(&self) -> &LiquidityConfig {
        &self.config
    }

    /// Validates, persists and only then swaps the configuration.
    /// Intensity requirements are recomputed on the next tick.
    pub fn update_configuration(&mut self, config: LiquidityConfig) -> Result<()> {
        config.validate()?;
        save_config(self.store.as_ref(), CONFIG_KEY, &config)?;
        self.config = config;
        self.requirements_updated_at = None;
        log::info!("Liquidity configuration updated");
        Ok(())
    }

    /// The raw book shared with the depth stream task.
    pub fn shared_book(&self) -> Arc<Mutex<RawOrderBook>> {
        self.book.clone()
    }

    pub async fn sync_snapshot(&self, source: &dyn OrderBookSource, symbol: &str) -> Result<u64> {
        sync_book_snapshot(&self.book, source, symbol).await
    }

    pub fn apply_snapshot(&self, snapshot: OrderBookSnapshot) {
        self.book.lock().unwrap().apply_snapshot(snapshot);
    }

    pub fn apply_delta(&self, delta: &OrderBookDelta) -> bool {
        self.book.lock().unwrap().apply_delta(delta)
    }

    fn requirements_due(&self, now_ms: i64) -> bool {
        let frequency = minutes_to_ms(self.config.intensity_requirements_update_frequency);
        match self.requirements_updated_at {
            None => true,
            Some(at) => now_ms - at >= frequency,
        }
    }

    /// Rebuilds the bucketed book around `current_price`. Never fails: an empty or
    /// stale book just yields a neutral state.
    pub fn calculate_state(&mut self, current_price: f64, now_ms: i64) -> MinifiedLiquidityState {
        let peak_range = PeakRange::around(current_price, self.config.max_peak_distance);

        let (ask_groups, bid_groups) = {
            let mut book = self.book.lock().unwrap();
            book.window = Some(peak_range);
            (
                group_levels(&book.asks, BookSide::Ask),
                group_levels(&book.bids, BookSide::Bid),
            )
        };

        if self.requirements_due(now_ms) {
            let quantities: Vec<f64> = ask_groups
                .iter()
                .chain(&bid_groups)
                .map(|&(_, q)| q)
                .collect();
            self.full.requirements = calculate_intensity_requirements(&quantities);
            self.full.requirements_updated_at = now_ms;
            self.requirements_updated_at = Some(now_ms);
        }

        let requirements = self.full.requirements;
        let build = LiquidityBuild {
            asks: build_side(&ask_groups, &requirements),
            bids: build_side(&bid_groups, &requirements),
        };
        let ask_peaks = calculate_peaks(&build.asks, &peak_range);
        let bid_peaks = calculate_peaks(&build.bids, &peak_range);
        let weights = &self.config.intensity_weights;
        let bid_liquidity_power = calculate_bid_liquidity_power(
            weighted_points(&bid_peaks, weights),
            weighted_points(&ask_peaks, weights),
        );

        let minified = MinifiedLiquidityState {
            bid_liquidity_power,
            ask_peaks,
            bid_peaks,
        };
        self.full.build = build;
        self.full.peak_range = peak_range;
        self.full.minified = minified.clone();
        minified
    }

    /// Per-side build of the last calculated state.
    pub fn build(&self) -> &LiquidityBuild {
        &self.full.build
    }

    pub fn full_state(&self) -> &LiquidityFullState {
        &self.full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::data::order_book_rest::test_support::StaticOrderBook;
    use crate::data::store::test_support::MemoryStore;
    use crate::domain::RawPriceLevel;

    fn engine() -> (LiquidityEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (LiquidityEngine::initialize(store.clone()).unwrap(), store)
    }

    fn levels(v: &[(&str, f64)]) -> Vec<RawPriceLevel> {
        v.iter().map(|(p, q)| RawPriceLevel::new(*p, *q)).collect()
    }

    fn snapshot() -> OrderBookSnapshot {
        OrderBookSnapshot {
            last_update_id: 10,
            asks: levels(&[("100.5", 1.0), ("101.2", 1.0), ("150.0", 50.0)]),
            bids: levels(&[("99.5", 40.0), ("98.7", 30.0), ("60.0", 1.0)]),
        }
    }

    #[test]
    fn initialize_persists_defaults() {
        let (engine, store) = engine();
        assert_eq!(engine.config(), &LiquidityConfig::default());
        assert!(store.configs.lock().unwrap().contains_key(CONFIG_KEY));
    }

    #[test]
    fn heavy_bids_give_high_bid_power() {
        let (mut engine, _) = engine();
        engine.apply_snapshot(snapshot());
        let state = engine.calculate_state(100.0, 1_000);
        assert!(state.bid_liquidity_power > 50.0);
        assert!(!state.bid_peaks.is_empty());
        assert!(state.ask_peaks.keys().all(|p| *p <= 101));
        assert_eq!(engine.build().asks.levels.len(), 3);
        assert_eq!(engine.full_state().requirements_updated_at, 1_000);
    }

    #[test]
    fn empty_book_is_neutral() {
        let (mut engine, _) = engine();
        let state = engine.calculate_state(100.0, 0);
        assert_eq!(state.bid_liquidity_power, 50.0);
        assert!(state.ask_peaks.is_empty() && state.bid_peaks.is_empty());
    }

    #[test]
    fn requirements_refresh_on_their_own_cadence() {
        let (mut engine, _) = engine();
        engine.apply_snapshot(snapshot());
        engine.calculate_state(100.0, 0);
        let first = engine.full_state().requirements;

        engine.apply_delta(&OrderBookDelta {
            final_update_id: 11,
            bids: levels(&[("99.5", 400.0)]),
            ..Default::default()
        });
        engine.calculate_state(100.0, minutes_to_ms(1));
        assert_eq!(engine.full_state().requirements, first);

        engine.calculate_state(100.0, minutes_to_ms(5));
        assert_ne!(engine.full_state().requirements, first);
    }

    #[tokio::test]
    async fn failed_snapshot_keeps_previous_book() {
        let (engine, _) = engine();
        let source = StaticOrderBook::default();
        *source.snapshot.lock().unwrap() = Some(snapshot());
        assert_eq!(engine.sync_snapshot(&source, "BTCUSDT").await.unwrap(), 10);

        *source.snapshot.lock().unwrap() = None;
        assert!(engine.sync_snapshot(&source, "BTCUSDT").await.is_err());
        assert_eq!(engine.shared_book().lock().unwrap().asks.len(), 3);
    }

    #[test]
    fn invalid_update_is_rejected_and_not_persisted() {
        let (mut engine, store) = engine();
        let mut config = LiquidityConfig::default();
        config.max_peak_distance = -1.0;
        let err = engine.update_configuration(config).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>().map(|e| e.field()),
            Some("max_peak_distance")
        );
        let stored: LiquidityConfig =
            serde_json::from_str(&store.configs.lock().unwrap()[CONFIG_KEY]).unwrap();
        assert_eq!(stored, LiquidityConfig::default());
    }

    #[test]
    fn failed_persist_keeps_old_configuration() {
        let (mut engine, store) = engine();
        store.set_fail_writes(true);
        let mut config = LiquidityConfig::default();
        config.max_peak_distance = 3.0;
        assert!(engine.update_configuration(config).is_err());
        assert_eq!(engine.config(), &LiquidityConfig::default());
    }
}
