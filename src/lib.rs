#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::type_complexity)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod models;
pub mod utils;

// The engines
pub mod engine;

// Re-export commonly used types
pub use data::{FileStore, OrderBookStream, Store};
pub use domain::{Candlestick, CompressedCoinsStates, StateType};
pub use engine::{KeyZonesEngine, LiquidityEngine, MarketState, MarketStateEngine, ReversalEngine};
pub use models::{KeyZone, KeyZoneEvent, MinifiedLiquidityState, MinifiedReversalState};

// CLI argument parsing
use clap::Parser;

use config::{MARKET, PERSISTENCE};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Symbol to track, e.g. BTCUSDT
    #[arg(long, default_value = MARKET.default_symbol)]
    pub symbol: String,

    /// Root directory of the durable store
    #[arg(long, default_value = PERSISTENCE.store.default_root)]
    pub store_dir: String,

    /// Seconds between market state ticks
    #[arg(long, default_value_t = MARKET.tick_seconds)]
    pub tick_seconds: u64,
}
