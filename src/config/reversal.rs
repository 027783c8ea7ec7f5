//! Reversal engine configuration record.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, ensure_range_f64, invalid};
use crate::domain::state::SplitRange;

/// Policy used to order the symbols attached to a reversal signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventSortFunc {
    /// Sum of the short-range changes, strongest move in the reversal's favor first.
    #[default]
    ChangeSum,
    Shuffle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReversalScoreWeights {
    pub volume: f64,
    pub liquidity: f64,
    pub coins: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalConfig {
    /// General score (0-100) an episode must reach to issue a signal.
    pub min_event_score: f64,
    pub event_sort_func: EventSortFunc,
    pub score_weights: ReversalScoreWeights,
    /// Short-range coin splits evaluated by the coins score.
    pub coin_split_ranges: Vec<SplitRange>,
}

impl Default for ReversalConfig {
    fn default() -> Self {
        Self {
            min_event_score: 70.0,
            event_sort_func: EventSortFunc::ChangeSum,
            score_weights: ReversalScoreWeights {
                volume: 15.0,
                liquidity: 45.0,
                coins: 40.0,
            },
            coin_split_ranges: vec![
                SplitRange::S15,
                SplitRange::S10,
                SplitRange::S5,
                SplitRange::S2,
            ],
        }
    }
}

impl ReversalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_range_f64("min_event_score", self.min_event_score, 30.0, 100.0)?;
        let w = &self.score_weights;
        ensure_range_f64("score_weights.volume", w.volume, 5.0, 60.0)?;
        ensure_range_f64("score_weights.liquidity", w.liquidity, 5.0, 70.0)?;
        ensure_range_f64("score_weights.coins", w.coins, 5.0, 70.0)?;
        let total = w.volume + w.liquidity + w.coins;
        if (total - 100.0).abs() > 1e-9 {
            return Err(invalid(
                "score_weights",
                format!("weights must sum to 100, got {}", total),
            ));
        }
        if self.coin_split_ranges.is_empty() {
            return Err(invalid("coin_split_ranges", "at least one range is required"));
        }
        let unique: HashSet<_> = self.coin_split_ranges.iter().collect();
        if unique.len() != self.coin_split_ranges.len() {
            return Err(invalid("coin_split_ranges", "ranges must be unique"));
        }
        Ok(())
    }
}
