//! Orchestration constants for the market state loop.

use crate::utils::TimeUtils;

pub struct WindowConfig {
    /// Interval of the live window candlesticks
    pub interval_ms: i64,
    /// Number of candlesticks in the live window
    pub size: i32,
}

pub struct MarketConfig {
    /// Default symbol when none is supplied on the command line
    pub default_symbol: &'static str,
    pub window: WindowConfig,
    /// Interval of the candlesticks the KeyZone builds scan
    pub keyzones_interval_ms: i64,
    /// Seconds between market state ticks
    pub tick_seconds: u64,
    /// Seconds between order book snapshot syncs
    pub snapshot_sync_seconds: u64,
}

pub const MARKET: MarketConfig = MarketConfig {
    default_symbol: "BTCUSDT",
    window: WindowConfig {
        interval_ms: TimeUtils::MS_IN_MIN,
        size: 128,
    },
    keyzones_interval_ms: TimeUtils::MS_IN_15_MIN,
    tick_seconds: 5,
    snapshot_sync_seconds: 30,
};
