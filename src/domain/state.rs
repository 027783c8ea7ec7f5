//! Directional state tiers and the named window fractions they are computed over.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Signed direction tier of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum StateType {
    DecreasingStrongly,
    Decreasing,
    #[default]
    Stateless,
    Increasing,
    IncreasingStrongly,
}

impl StateType {
    pub fn value(self) -> i8 {
        match self {
            StateType::DecreasingStrongly => -2,
            StateType::Decreasing => -1,
            StateType::Stateless => 0,
            StateType::Increasing => 1,
            StateType::IncreasingStrongly => 2,
        }
    }

    pub fn is_increasing(self) -> bool {
        self.value() > 0
    }

    pub fn is_decreasing(self) -> bool {
        self.value() < 0
    }
}

/// Named fraction of a rolling window, measured from its most recent end.
/// `S2` covers the newest 2% of the window, `S100` the whole window.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SplitRange {
    S100,
    S75,
    S50,
    S25,
    S15,
    S10,
    S5,
    S2,
}

impl SplitRange {
    pub fn fraction(self) -> f64 {
        match self {
            SplitRange::S100 => 1.0,
            SplitRange::S75 => 0.75,
            SplitRange::S50 => 0.5,
            SplitRange::S25 => 0.25,
            SplitRange::S15 => 0.15,
            SplitRange::S10 => 0.10,
            SplitRange::S5 => 0.05,
            SplitRange::S2 => 0.02,
        }
    }

    /// Number of trailing items this split covers in a window of `len` items.
    /// Never fewer than two so a direction can always be measured.
    pub fn item_count(self, len: usize) -> usize {
        let count = (len as f64 * self.fraction()).ceil() as usize;
        count.clamp(2.min(len), len)
    }
}

/// State of a single split: its tier plus the raw percentage change.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SplitState {
    pub state: StateType,
    pub change: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn item_count_never_below_two() {
        assert_eq!(SplitRange::S2.item_count(10), 2);
        assert_eq!(SplitRange::S2.item_count(200), 4);
        assert_eq!(SplitRange::S100.item_count(128), 128);
        assert_eq!(SplitRange::S5.item_count(1), 1);
    }

    #[test]
    fn splits_are_ordered_longest_first() {
        let fractions: Vec<f64> = SplitRange::iter().map(|s| s.fraction()).collect();
        assert!(fractions.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn split_range_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SplitRange::S15).unwrap(), "\"s15\"");
        assert_eq!(SplitRange::S2.to_string(), "s2");
    }
}
