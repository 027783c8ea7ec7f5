//! KeyZone engine configuration record.

use serde::{Deserialize, Serialize};

use super::validation::{
    ConfigError, ensure_range_f64, ensure_range_u32, ensure_range_usize, invalid,
};

/// Score weights. They sum to 10 so a zone score lands in `0..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyZoneScoreWeights {
    pub volume_intensity: f64,
    pub liquidity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyZonesConfig {
    /// Hours between zone rebuilds.
    pub build_frequency_hours: u32,
    /// Number of 15-minute candlesticks scanned per build.
    pub build_lookback_candles: usize,
    /// Height (%) of a zone opened by a single reversal.
    pub zone_size: f64,
    /// Max gap (%) between adjacent zones for them to be merged.
    pub zone_merge_distance_limit: f64,
    /// Number of zones reported above and below the price.
    pub state_limit: usize,
    pub score_weights: KeyZoneScoreWeights,
    /// Padding (%) applied to a zone's range when measuring its liquidity share.
    pub liquidity_range_padding: f64,
    /// Live candlesticks kept to evaluate contacts.
    pub price_snapshots_limit: usize,
    /// Minutes a zone stays idle after it triggered an event.
    pub idle_minutes: u32,
    pub event_duration_seconds: u32,
    /// Distance (%) beyond the zone after which an active event is invalidated.
    pub event_price_distance_limit: f64,
    /// Minimum zone score for a contact to become an event.
    pub event_score_requirement: f64,
    /// Min change (%) for a long-range split to have a direction.
    pub split_min_change: f64,
    /// Change (%) at which a long-range split is considered strong.
    pub split_strong_change: f64,
}

impl Default for KeyZonesConfig {
    fn default() -> Self {
        Self {
            build_frequency_hours: 6,
            build_lookback_candles: 8_640,
            zone_size: 0.5,
            zone_merge_distance_limit: 1.0,
            state_limit: 3,
            score_weights: KeyZoneScoreWeights {
                volume_intensity: 4.0,
                liquidity: 6.0,
            },
            liquidity_range_padding: 0.25,
            price_snapshots_limit: 5,
            idle_minutes: 30,
            event_duration_seconds: 7_200,
            event_price_distance_limit: 0.5,
            event_score_requirement: 5.0,
            split_min_change: 0.1,
            split_strong_change: 1.0,
        }
    }
}

impl KeyZonesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_range_u32("build_frequency_hours", self.build_frequency_hours, 1, 48)?;
        ensure_range_usize(
            "build_lookback_candles",
            self.build_lookback_candles,
            100,
            100_000,
        )?;
        ensure_range_f64("zone_size", self.zone_size, 0.05, 5.0)?;
        ensure_range_f64(
            "zone_merge_distance_limit",
            self.zone_merge_distance_limit,
            0.0,
            10.0,
        )?;
        ensure_range_usize("state_limit", self.state_limit, 1, 20)?;
        let w = &self.score_weights;
        ensure_range_f64("score_weights.volume_intensity", w.volume_intensity, 0.0, 10.0)?;
        ensure_range_f64("score_weights.liquidity", w.liquidity, 0.0, 10.0)?;
        if ((w.volume_intensity + w.liquidity) - 10.0).abs() > 1e-9 {
            return Err(invalid(
                "score_weights",
                format!(
                    "weights must sum to 10, got {}",
                    w.volume_intensity + w.liquidity
                ),
            ));
        }
        ensure_range_f64(
            "liquidity_range_padding",
            self.liquidity_range_padding,
            0.0,
            5.0,
        )?;
        ensure_range_usize("price_snapshots_limit", self.price_snapshots_limit, 3, 30)?;
        ensure_range_u32("idle_minutes", self.idle_minutes, 1, 1_440)?;
        ensure_range_u32(
            "event_duration_seconds",
            self.event_duration_seconds,
            60,
            86_400,
        )?;
        ensure_range_f64(
            "event_price_distance_limit",
            self.event_price_distance_limit,
            0.05,
            10.0,
        )?;
        ensure_range_f64(
            "event_score_requirement",
            self.event_score_requirement,
            0.0,
            10.0,
        )?;
        ensure_range_f64("split_min_change", self.split_min_change, 0.01, 10.0)?;
        ensure_range_f64("split_strong_change", self.split_strong_change, 0.01, 50.0)?;
        if self.split_strong_change <= self.split_min_change {
            return Err(invalid(
                "split_strong_change",
                "must be greater than split_min_change",
            ));
        }
        Ok(())
    }
}
