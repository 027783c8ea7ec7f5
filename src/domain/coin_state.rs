//! Compressed snapshot of every tracked coin, produced by the external coin-state engine.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::state::{SplitRange, StateType};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoinSplitState {
    pub state: StateType,
    /// Sum of the percentage changes observed within the split.
    pub change_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompressedCoinState {
    pub state: StateType,
    pub split_states: BTreeMap<SplitRange, CoinSplitState>,
}

impl CompressedCoinState {
    /// Sum of `change_sum` across the given ranges. Missing ranges contribute nothing.
    pub fn change_sum(&self, ranges: &[SplitRange]) -> f64 {
        ranges
            .iter()
            .filter_map(|r| self.split_states.get(r))
            .map(|s| s.change_sum)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompressedCoinsStates {
    pub by_symbol: HashMap<String, CompressedCoinState>,
}

impl CompressedCoinsStates {
    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}
