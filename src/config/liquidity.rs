//! Liquidity engine configuration record.

use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, ensure_range_f64, ensure_range_u32};

/// Multiplier applied to each intensity tier when computing weighted peak points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityWeights {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

impl IntensityWeights {
    /// Weight for an intensity tier (`1..=4`). Tier 0 carries no weight.
    pub fn weight_for(&self, intensity: u8) -> f64 {
        match intensity {
            1 => self.low,
            2 => self.medium,
            3 => self.high,
            4 => self.very_high,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityConfig {
    /// Max distance (%) from the current price a level can sit to count as a peak.
    pub max_peak_distance: f64,
    pub intensity_weights: IntensityWeights,
    /// Minutes between intensity requirement recalculations.
    pub intensity_requirements_update_frequency: u32,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            max_peak_distance: 1.5,
            intensity_weights: IntensityWeights {
                low: 1.0,
                medium: 3.0,
                high: 6.0,
                very_high: 10.0,
            },
            intensity_requirements_update_frequency: 5,
        }
    }
}

impl LiquidityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_range_f64("max_peak_distance", self.max_peak_distance, 0.1, 20.0)?;
        let w = &self.intensity_weights;
        ensure_range_f64("intensity_weights.low", w.low, 0.01, 100.0)?;
        ensure_range_f64("intensity_weights.medium", w.medium, 0.01, 100.0)?;
        ensure_range_f64("intensity_weights.high", w.high, 0.01, 100.0)?;
        ensure_range_f64("intensity_weights.very_high", w.very_high, 0.01, 100.0)?;
        ensure_range_u32(
            "intensity_requirements_update_frequency",
            self.intensity_requirements_update_frequency,
            1,
            120,
        )
    }
}
