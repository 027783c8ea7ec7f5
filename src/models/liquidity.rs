use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::state_utils::IntensityRequirements;

/// Liquidity resting at one integer price bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPriceLevel {
    /// Floored price of the bucket
    pub price: f64,
    pub liquidity: f64,
    pub intensity: u8,
}

/// Every bucket of one book side plus its total.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiquiditySideBuild {
    pub levels: Vec<LiquidityPriceLevel>,
    pub total: f64,
}

impl LiquiditySideBuild {
    /// Liquidity inside `[lower, upper]`.
    pub fn liquidity_between(&self, lower: f64, upper: f64) -> f64 {
        self.levels
            .iter()
            .filter(|l| l.price >= lower && l.price <= upper)
            .map(|l| l.liquidity)
            .sum()
    }
}

/// Both sides of the bucketed book. Asks ascend, bids descend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiquidityBuild {
    pub asks: LiquiditySideBuild,
    pub bids: LiquiditySideBuild,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakRange {
    pub lower: f64,
    pub upper: f64,
}

impl PeakRange {
    pub fn around(price: f64, max_distance_pct: f64) -> Self {
        Self {
            lower: price * (1.0 - max_distance_pct / 100.0),
            upper: price * (1.0 + max_distance_pct / 100.0),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }
}

/// Peaks keyed by integer price, valued by intensity.
pub type LiquidityPeaks = BTreeMap<i64, u8>;

/// Compact per-tick state handed to the other engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinifiedLiquidityState {
    /// Share (0-100) of weighted peak points sitting on the bid side
    pub bid_liquidity_power: f64,
    pub ask_peaks: LiquidityPeaks,
    pub bid_peaks: LiquidityPeaks,
}

impl Default for MinifiedLiquidityState {
    fn default() -> Self {
        Self {
            bid_liquidity_power: 50.0,
            ask_peaks: LiquidityPeaks::new(),
            bid_peaks: LiquidityPeaks::new(),
        }
    }
}

/// Diagnostics view of the whole book.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiquidityFullState {
    pub build: LiquidityBuild,
    pub requirements: IntensityRequirements,
    pub requirements_updated_at: i64,
    pub peak_range: PeakRange,
    pub minified: MinifiedLiquidityState,
}
