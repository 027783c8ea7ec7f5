//! KeyZone engine: periodic zone builds plus the contact/idle event state machine.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::{Result, bail};

use crate::analysis::keyzone_build::build_keyzones;
use crate::analysis::zone_scoring::score_zone;
use crate::config::KeyZonesConfig;
use crate::data::store::{Store, load_or_init_config, save_config};
use crate::domain::{Candlestick, SplitRange, StateType};
use crate::models::{
    KeyZone, KeyZoneEvent, KeyZoneKind, KeyZonesState, LiquidityBuild, MinifiedKeyZone,
};
use crate::utils::TimeUtils;
use crate::utils::state_utils::calculate_split_states;
use crate::utils::time_utils::{epoch_ms_to_utc, minutes_to_ms, seconds_to_ms};

pub const CONFIG_KEY: &str = "keyzones";

/// Widest span `list_events` accepts.
pub const MAX_EVENT_QUERY_SPAN_MS: i64 = 30 * TimeUtils::MS_IN_D;

pub struct KeyZonesEngine {
    config: KeyZonesConfig,
    store: Arc<dyn Store>,
    zones: Vec<KeyZone>,
    /// Input of the last successful build, kept so a config update can rebuild
    history: Vec<Candlestick>,
    last_build_at: Option<i64>,
    snapshots: VecDeque<Candlestick>,
    /// zone id → time its idle period ends
    idle: HashMap<i64, i64>,
    event: Option<KeyZoneEvent>,
}

impl KeyZonesEngine {
    pub fn initialize(store: Arc<dyn Store>) -> Result<Self> {
        let config: KeyZonesConfig = load_or_init_config(store.as_ref(), CONFIG_KEY)?;
        config.validate()?;
        Ok(Self {
            config,
            store,
            zones: Vec::new(),
            history: Vec::new(),
            last_build_at: None,
            snapshots: VecDeque::new(),
            idle: HashMap::new(),
            event: None,
        })
    }

    pub fn config(&self) -> &KeyZonesConfig {
        &self.config
    }

    /// Validates, persists, swaps, then rebuilds from the last history if there is one.
    pub fn update_configuration(&mut self, config: KeyZonesConfig) -> Result<()> {
        config.validate()?;
        save_config(self.store.as_ref(), CONFIG_KEY, &config)?;
        self.config = config;
        log::info!("KeyZones configuration updated");

        if !self.history.is_empty() {
            match build_keyzones(&self.history, &self.config) {
                Ok(zones) => self.zones = zones,
                Err(e) => log::warn!("KeyZone rebuild after config update failed: {:#}", e),
            }
        }
        while self.snapshots.len() > self.config.price_snapshots_limit {
            self.snapshots.pop_front();
        }
        Ok(())
    }

    pub fn zones(&self) -> &[KeyZone] {
        &self.zones
    }

    pub fn active_event(&self) -> Option<&KeyZoneEvent> {
        self.event.as_ref()
    }

    /// Whether the build cadence has elapsed.
    pub fn build_due(&self, now_ms: i64) -> bool {
        match self.last_build_at {
            None => true,
            Some(at) => now_ms - at >= self.config.build_frequency_hours as i64 * TimeUtils::MS_IN_H,
        }
    }

    /// Builds a fresh zone set and swaps it in. On failure the previous zones stay.
    pub fn build_zones(&mut self, candles: Vec<Candlestick>, now_ms: i64) -> Result<usize> {
        let zones = build_keyzones(&candles, &self.config)?;
        let count = zones.len();
        self.zones = zones;
        self.history = candles;
        self.last_build_at = Some(now_ms);
        log::info!("KeyZones rebuilt: {} zones", count);
        Ok(count)
    }

    /// Adds the live candlestick to the snapshot window. A repeated open time
    /// replaces the still-forming candlestick.
    fn push_snapshot(&mut self, latest: Candlestick) {
        match self.snapshots.back_mut() {
            Some(last) if last.open_time == latest.open_time => *last = latest,
            _ => self.snapshots.push_back(latest),
        }
        while self.snapshots.len() > self.config.price_snapshots_limit {
            self.snapshots.pop_front();
        }
    }

    fn is_idle(&self, zone_id: i64, now_ms: i64) -> bool {
        self.idle.get(&zone_id).is_some_and(|until| now_ms < *until)
    }

    /// Which contact, if any, the snapshot window currently shows. Split states are
    /// measured over the closes of the whole live window.
    fn detect_contact(&self, window: &[Candlestick]) -> Option<KeyZoneKind> {
        if self.snapshots.len() < self.config.price_snapshots_limit || self.snapshots.len() < 2 {
            return None;
        }
        let closes: Vec<f64> = window.iter().map(|c| c.close).collect();
        let splits = calculate_split_states(
            &closes,
            self.config.split_min_change,
            self.config.split_strong_change,
        );
        let count = |state: StateType| splits.values().filter(|s| s.state == state).count();
        let shortest = [SplitRange::S2, SplitRange::S5].map(|r| splits.get(&r).map(|s| s.state));

        let n = self.snapshots.len();
        let (first, prior, latest) = (&self.snapshots[0], &self.snapshots[n - 2], &self.snapshots[n - 1]);
        let active_kind = self.event.as_ref().map(|e| e.kind);

        let resistance = active_kind != Some(KeyZoneKind::Support)
            && latest.close > first.close
            && shortest.iter().all(|s| s.is_some_and(|s| !s.is_decreasing()))
            && latest.high > prior.high
            && latest.close > prior.close
            && count(StateType::DecreasingStrongly) == 0
            && count(StateType::IncreasingStrongly) >= 2;
        if resistance {
            return Some(KeyZoneKind::Resistance);
        }

        let support = active_kind != Some(KeyZoneKind::Resistance)
            && latest.close < first.close
            && shortest.iter().all(|s| s.is_some_and(|s| !s.is_increasing()))
            && latest.low < prior.low
            && latest.close < prior.close
            && count(StateType::IncreasingStrongly) == 0
            && count(StateType::DecreasingStrongly) >= 2;
        support.then_some(KeyZoneKind::Support)
    }

    /// Nearest scored zone the latest candlestick reached on the contact side.
    fn contact_zone(
        &self,
        kind: KeyZoneKind,
        latest: &Candlestick,
        scored: &[MinifiedKeyZone],
        now_ms: i64,
    ) -> Option<MinifiedKeyZone> {
        let touched = |z: &MinifiedKeyZone| match kind {
            KeyZoneKind::Resistance => z.start <= latest.high && z.end >= latest.high,
            KeyZoneKind::Support => z.start <= latest.low && z.end >= latest.low,
        };
        let reference = match kind {
            KeyZoneKind::Resistance => latest.high,
            KeyZoneKind::Support => latest.low,
        };
        scored
            .iter()
            .filter(|z| touched(z))
            .filter(|z| z.score >= self.config.event_score_requirement)
            .filter(|z| !self.is_idle(z.id, now_ms))
            .min_by(|a, b| {
                let da = ((a.start + a.end) / 2.0 - reference).abs();
                let db = ((b.start + b.end) / 2.0 - reference).abs();
                da.total_cmp(&db)
            })
            .cloned()
    }

    /// Per-tick evaluation over the live window (oldest first). Only an empty window
    /// or a failed event persist returns an error, in which case no event or idle
    /// entry is committed.
    pub fn calculate_state(
        &mut self,
        window: &[Candlestick],
        liquidity: &LiquidityBuild,
        now_ms: i64,
    ) -> Result<KeyZonesState> {
        let Some(latest) = window.last().copied() else {
            bail!("KeyZones state needs at least one candlestick");
        };
        self.push_snapshot(latest);
        let price = latest.close;

        if let Some(event) = &self.event
            && !event.is_active(now_ms, price)
        {
            log::info!("KeyZone {:?} event {} ended", event.kind, event.triggered_at);
            self.event = None;
        }
        self.idle.retain(|_, until| now_ms < *until);

        let scored: Vec<MinifiedKeyZone> = self
            .zones
            .iter()
            .map(|zone| {
                let side = if zone.end >= price {
                    &liquidity.asks
                } else {
                    &liquidity.bids
                };
                score_zone(zone, side, &self.config)
            })
            .collect();

        if let Some(kind) = self.detect_contact(window)
            && let Some(zone) = self.contact_zone(kind, &latest, &scored, now_ms)
        {
            let pct = self.config.event_price_distance_limit / 100.0;
            let price_limit = match kind {
                KeyZoneKind::Resistance => zone.end * (1.0 + pct),
                KeyZoneKind::Support => zone.start * (1.0 - pct),
            };
            let event = KeyZoneEvent {
                kind,
                triggered_at: now_ms,
                expires_at: now_ms + seconds_to_ms(self.config.event_duration_seconds),
                price_limit,
                zone,
            };
            self.store.save_keyzone_event(&event)?;
            self.idle
                .insert(event.zone.id, now_ms + minutes_to_ms(self.config.idle_minutes));
            log::info!(
                "KeyZone {:?} contact on zone {} [{:.2}, {:.2}] score {:.2}, active until {}",
                event.kind,
                event.zone.id,
                event.zone.start,
                event.zone.end,
                event.zone.score,
                epoch_ms_to_utc(event.expires_at)
            );
            self.event = Some(event);
        }

        let limit = self.config.state_limit;
        let mut above: Vec<MinifiedKeyZone> =
            scored.iter().filter(|z| z.end >= price).cloned().collect();
        above.sort_by(|a, b| a.start.total_cmp(&b.start));
        above.truncate(limit);
        let mut below: Vec<MinifiedKeyZone> =
            scored.into_iter().filter(|z| z.end < price).collect();
        below.sort_by(|a, b| b.end.total_cmp(&a.end));
        below.truncate(limit);

        Ok(KeyZonesState {
            event: self.event.clone(),
            above,
            below,
        })
    }

    /// Persisted events triggered within `[start_ms, end_ms]`.
    pub fn list_events(&self, start_ms: i64, end_ms: i64) -> Result<Vec<KeyZoneEvent>> {
        if start_ms >= end_ms {
            bail!("Invalid range: start ({}) must be before end ({})", start_ms, end_ms);
        }
        if end_ms - start_ms > MAX_EVENT_QUERY_SPAN_MS {
            bail!("Invalid range: span exceeds 30 days");
        }
        self.store.list_keyzone_events(start_ms, end_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::data::store::test_support::MemoryStore;
    use crate::domain::candle::test_support::{candle, candle_with_close};
    use crate::models::{KeyZoneReversal, LiquidityPriceLevel, LiquiditySideBuild};

    const MIN: i64 = TimeUtils::MS_IN_MIN;

    fn engine_with_zone(store: Arc<MemoryStore>) -> KeyZonesEngine {
        let mut engine = KeyZonesEngine::initialize(store).unwrap();
        let mut zone = KeyZone::new(
            KeyZoneReversal {
                id: 42,
                kind: KeyZoneKind::Resistance,
                volume: 10.0,
            },
            105.5,
            106.5,
        );
        zone.volume_intensity = 4;
        engine.zones = vec![zone];
        engine
    }

    /// Asks concentrated inside the zone so it clears the score requirement.
    fn liquidity() -> LiquidityBuild {
        let asks = LiquiditySideBuild {
            levels: vec![LiquidityPriceLevel {
                price: 106.0,
                liquidity: 50.0,
                intensity: 4,
            }],
            total: 50.0,
        };
        LiquidityBuild {
            asks,
            bids: LiquiditySideBuild::default(),
        }
    }

    /// Five strongly rising minute candlesticks whose last high reaches 106.
    fn rally(start_ms: i64) -> Vec<Candlestick> {
        [100.0, 101.5, 103.0, 104.5, 105.8]
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let high = if i == 4 { 106.0 } else { close + 0.2 };
                candle_with_close(start_ms + i as i64 * MIN, close - 1.0, high, close - 1.2, close)
            })
            .collect()
    }

    /// Flat closes at 95 ahead of the live candlesticks.
    fn history() -> Vec<Candlestick> {
        (0..95)
            .map(|i| candle_with_close((i - 95) * MIN, 95.0, 95.2, 94.8, 95.0))
            .collect()
    }

    /// Ticks once per live candlestick, each time over `history` plus the live
    /// candlesticks seen so far.
    fn feed_with(
        engine: &mut KeyZonesEngine,
        history: &[Candlestick],
        live: &[Candlestick],
        liquidity: &LiquidityBuild,
    ) -> Result<KeyZonesState> {
        let mut window = history.to_vec();
        let mut state = KeyZonesState::default();
        for c in live {
            window.push(*c);
            state = engine.calculate_state(&window, liquidity, c.open_time)?;
        }
        Ok(state)
    }

    fn feed(engine: &mut KeyZonesEngine, live: &[Candlestick]) -> Result<KeyZonesState> {
        feed_with(engine, &history(), live, &liquidity())
    }

    #[test]
    fn rally_into_zone_triggers_resistance_event() {
        let store = Arc::new(MemoryStore::default());
        let mut engine = engine_with_zone(store.clone());
        let state = feed(&mut engine, &rally(0)).unwrap();

        let event = state.event.expect("resistance event");
        assert_eq!(event.kind, KeyZoneKind::Resistance);
        assert_eq!(event.zone.id, 42);
        assert!((event.price_limit - 106.5 * 1.005).abs() < 1e-9);
        assert_eq!(event.expires_at, 4 * MIN + 7_200_000);
        assert_eq!(store.events.lock().unwrap().len(), 1);
        assert_eq!(state.above.len(), 1);
    }

    #[test]
    fn window_must_be_full_before_evaluating() {
        let mut engine = engine_with_zone(Arc::new(MemoryStore::default()));
        let state = feed(&mut engine, &rally(0)[1..]).unwrap();
        assert!(state.event.is_none());
    }

    #[test]
    fn idle_zone_cannot_retrigger() {
        let store = Arc::new(MemoryStore::default());
        let mut engine = engine_with_zone(store.clone());
        feed(&mut engine, &rally(0)).unwrap();
        // Drop the active event but keep the idle ledger.
        engine.event = None;

        let again = rally(10 * MIN);
        feed(&mut engine, &again).unwrap();
        assert!(engine.active_event().is_none());
        assert_eq!(store.events.lock().unwrap().len(), 1);

        // Past the idle period the same zone can fire again.
        engine.event = None;
        let later = rally(40 * MIN);
        feed(&mut engine, &later).unwrap();
        assert_eq!(store.events.lock().unwrap().len(), 2);
    }

    #[test]
    fn failed_persist_aborts_trigger() {
        let store = Arc::new(MemoryStore::default());
        let mut engine = engine_with_zone(store.clone());
        store.set_fail_writes(true);
        let candles = rally(0);
        feed(&mut engine, &candles[..4]).unwrap();
        let mut window = history();
        window.extend_from_slice(&candles);
        assert!(engine.calculate_state(&window, &liquidity(), 4 * MIN).is_err());
        assert!(engine.active_event().is_none());
        assert!(engine.idle.is_empty());
    }

    #[test]
    fn event_ends_when_price_breaks_limit() {
        let mut engine = engine_with_zone(Arc::new(MemoryStore::default()));
        feed(&mut engine, &rally(0)).unwrap();
        assert!(engine.active_event().is_some());
        let breakout = candle_with_close(5 * MIN, 106.0, 108.0, 105.9, 107.9);
        let mut window = history();
        window.extend(rally(0));
        window.push(breakout);
        let state = engine.calculate_state(&window, &liquidity(), 5 * MIN).unwrap();
        assert!(state.event.is_none());
    }

    #[test]
    fn low_score_zone_is_ignored() {
        let mut engine = engine_with_zone(Arc::new(MemoryStore::default()));
        let state =
            feed_with(&mut engine, &history(), &rally(0), &LiquidityBuild::default()).unwrap();
        // volume only: 4 · 1.0 < 5.0
        assert_eq!(state.above[0].score, 4.0);
        assert!(state.event.is_none());
    }

    #[test]
    fn strong_final_move_in_a_downtrend_does_not_trigger() {
        let store = Arc::new(MemoryStore::default());
        let mut engine = engine_with_zone(store.clone());
        // Steady slide from 125 to 106.2, then a flat base and one sharp pop into the zone.
        let downtrend: Vec<Candlestick> = (0..95)
            .map(|i| {
                let close = 125.0 - i as f64 * 0.2;
                candle_with_close((i - 95) * MIN, close + 0.2, close + 0.3, close - 0.1, close)
            })
            .collect();
        let live: Vec<Candlestick> = [105.0, 105.0, 105.0, 105.0, 106.2]
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let high = if i == 4 { 106.3 } else { close + 0.1 };
                candle_with_close(i as i64 * MIN, close, high, close - 0.2, close)
            })
            .collect();

        let state = feed_with(&mut engine, &downtrend, &live, &liquidity()).unwrap();
        assert!(state.event.is_none());
        assert!(store.events.lock().unwrap().is_empty());

        // The same pop after a flat history is a contact.
        let mut fresh = engine_with_zone(Arc::new(MemoryStore::default()));
        let state = feed_with(&mut fresh, &history(), &live, &liquidity()).unwrap();
        assert_eq!(state.event.map(|e| e.kind), Some(KeyZoneKind::Resistance));
    }

    #[test]
    fn empty_window_is_rejected() {
        let mut engine = engine_with_zone(Arc::new(MemoryStore::default()));
        assert!(engine.calculate_state(&[], &liquidity(), 0).is_err());
    }

    #[test]
    fn build_needs_history() {
        let mut engine = KeyZonesEngine::initialize(Arc::new(MemoryStore::default())).unwrap();
        let short: Vec<Candlestick> = (0..4).map(|i| candle(i, 10.0, 9.0, 1.0)).collect();
        assert!(engine.build_zones(short, 0).is_err());
        assert!(engine.build_due(0));
    }

    #[test]
    fn event_queries_are_validated() {
        let engine = KeyZonesEngine::initialize(Arc::new(MemoryStore::default())).unwrap();
        assert!(engine.list_events(10, 10).is_err());
        assert!(engine.list_events(0, MAX_EVENT_QUERY_SPAN_MS + 1).is_err());
        assert!(engine.list_events(0, MAX_EVENT_QUERY_SPAN_MS).unwrap().is_empty());
    }

    #[test]
    fn invalid_config_reports_field() {
        let mut engine = KeyZonesEngine::initialize(Arc::new(MemoryStore::default())).unwrap();
        let mut config = KeyZonesConfig::default();
        config.zone_size = 0.0;
        let err = engine.update_configuration(config).unwrap_err();
        assert_eq!(err.downcast_ref::<ConfigError>().map(|e| e.field()), Some("zone_size"));
    }
}
