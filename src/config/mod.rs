//! Configuration module: static process constants plus the per-engine records.

pub mod binance;
pub mod keyzones;
pub mod liquidity;
pub mod market;
pub mod persistence;
pub mod reversal;
pub mod validation;

mod debug; // Private: use crate::config::DEBUG_FLAGS not crate::config::debug::DEBUG_FLAGS
pub use debug::DEBUG_FLAGS;

// Re-export commonly used items
pub use binance::{BINANCE, BinanceApiConfig};
pub use keyzones::{KeyZoneScoreWeights, KeyZonesConfig};
pub use liquidity::{IntensityWeights, LiquidityConfig};
pub use market::MARKET;
pub use persistence::PERSISTENCE;
pub use reversal::{EventSortFunc, ReversalConfig, ReversalScoreWeights};
pub use validation::ConfigError;
