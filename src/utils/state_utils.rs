//! Stateless statistical helpers shared by every engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::domain::state::{SplitRange, SplitState, StateType};
use crate::utils::maths_utils::{get_min_max, mean, percent_change};

/// A price band. `start` is the edge closest to the middle of the range,
/// `end` is the outer edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Band {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bands {
    pub upper: Band,
    pub lower: Band,
}

/// Thresholds a value has to reach to be considered of a given intensity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntensityRequirements {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub very_high: f64,
}

/// Chunks `values` into `group_count` contiguous slices and returns the mean of each.
/// Slice boundaries round up, so the last slice is never longer than the others.
/// A series shorter than `group_count` yields one group per value.
pub fn build_averaged_groups(values: &[f64], group_count: usize) -> Vec<f64> {
    if values.is_empty() || group_count == 0 {
        return Vec::new();
    }
    let len = values.len();
    let groups = group_count.min(len);
    let boundary = |i: usize| (i * len).div_ceil(groups);
    (0..groups)
        .map(|i| mean(&values[boundary(i)..boundary(i + 1)]))
        .collect()
}

/// Bands are derived from the midpoint of the range and then halved again towards
/// each edge, so they scale with whatever the range is.
pub fn calculate_bands(min: f64, max: f64) -> Bands {
    let middle = (min + max) / 2.0;
    Bands {
        upper: Band {
            start: (middle + max) / 2.0,
            end: max,
        },
        lower: Band {
            start: (middle + min) / 2.0,
            end: min,
        },
    }
}

/// Signed state tier of a move from `initial` to `last`.
///
/// A move only counts as increasing when its change reaches `min_change_pct` *and*
/// the last value sits inside the upper band (mirrored for decreasing). When
/// `strong_change_pct` is given and reached, the strong tier is returned.
pub fn classify_state(
    initial: f64,
    last: f64,
    bands: &Bands,
    min_change_pct: f64,
    strong_change_pct: Option<f64>,
) -> StateType {
    let change = percent_change(initial, last);
    let strong = |c: f64| strong_change_pct.is_some_and(|s| c >= s);

    if change >= min_change_pct && last >= bands.upper.start {
        if strong(change) {
            StateType::IncreasingStrongly
        } else {
            StateType::Increasing
        }
    } else if change <= -min_change_pct && last <= bands.lower.start {
        if strong(-change) {
            StateType::DecreasingStrongly
        } else {
            StateType::Decreasing
        }
    } else {
        StateType::Stateless
    }
}

/// Requirements come from pairwise averaging of the mean, the minimum and the
/// maximum, so a single large outlier lifts the upper tiers much more than the lower.
pub fn calculate_intensity_requirements(values: &[f64]) -> IntensityRequirements {
    let Some((min, max)) = get_min_max(values) else {
        return IntensityRequirements::default();
    };
    let avg = mean(values);
    let low = (min + avg) / 2.0;
    let medium = avg;
    let high = (avg + max) / 2.0;
    let very_high = (high + max) / 2.0;
    IntensityRequirements {
        low,
        medium,
        high,
        very_high,
    }
}

/// Intensity tier in `0..=4`. Zero-valued inputs never score.
pub fn classify_intensity(value: f64, req: &IntensityRequirements) -> u8 {
    if value <= 0.0 {
        0
    } else if value >= req.very_high {
        4
    } else if value >= req.high {
        3
    } else if value >= req.medium {
        2
    } else if value >= req.low {
        1
    } else {
        0
    }
}

/// Computes the state of every split over the trailing portion of `values`.
pub fn calculate_split_states(
    values: &[f64],
    min_change_pct: f64,
    strong_change_pct: f64,
) -> BTreeMap<SplitRange, SplitState> {
    let mut splits = BTreeMap::new();
    if values.len() < 2 {
        return splits;
    }
    for split in SplitRange::iter() {
        let count = split.item_count(values.len());
        let slice = &values[values.len() - count..];
        let Some((min, max)) = get_min_max(slice) else {
            continue;
        };
        let initial = slice[0];
        let last = slice[slice.len() - 1];
        let bands = calculate_bands(min, max);
        splits.insert(
            split,
            SplitState {
                state: classify_state(
                    initial,
                    last,
                    &bands,
                    min_change_pct,
                    Some(strong_change_pct),
                ),
                change: percent_change(initial, last),
            },
        );
    }
    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaged_groups_last_group_shorter() {
        let groups = build_averaged_groups(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(groups, vec![2.0, 4.5]);

        let values: Vec<f64> = (1..=5).map(f64::from).collect();
        assert_eq!(build_averaged_groups(&values, 4), vec![1.5, 3.0, 4.0, 5.0]);

        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let groups = build_averaged_groups(&values, 6);
        assert_eq!(groups, vec![1.5, 3.0, 4.5, 6.0, 7.5, 9.0]);

        assert_eq!(build_averaged_groups(&[1.0, 3.0], 4), vec![1.0, 3.0]);
        assert!(build_averaged_groups(&[], 3).is_empty());
        assert!(build_averaged_groups(&[1.0], 0).is_empty());
    }

    #[test]
    fn bands_by_midpoint_averaging() {
        let bands = calculate_bands(100.0, 200.0);
        assert_eq!(bands.upper, Band { start: 175.0, end: 200.0 });
        assert_eq!(bands.lower, Band { start: 125.0, end: 100.0 });

        // Scale invariant: same relative layout at a different magnitude
        let scaled = calculate_bands(1.0, 2.0);
        assert_eq!(scaled.upper.start, 1.75);
        assert_eq!(scaled.lower.start, 1.25);
    }

    #[test]
    fn classify_state_requires_band_position() {
        let bands = calculate_bands(100.0, 110.0);
        // 5% up and inside the upper band
        assert_eq!(
            classify_state(100.0, 109.0, &bands, 1.0, Some(3.0)),
            StateType::IncreasingStrongly
        );
        assert_eq!(
            classify_state(100.0, 109.0, &bands, 1.0, None),
            StateType::Increasing
        );
        // Large change but outside the upper band
        let wide = calculate_bands(100.0, 130.0);
        assert_eq!(
            classify_state(100.0, 105.0, &wide, 1.0, Some(3.0)),
            StateType::Stateless
        );
        // Below the minimum change
        assert_eq!(
            classify_state(100.0, 100.5, &bands, 1.0, Some(3.0)),
            StateType::Stateless
        );
        assert_eq!(
            classify_state(110.0, 101.0, &bands, 1.0, Some(10.0)),
            StateType::Decreasing
        );
    }

    #[test]
    fn band_containment_holds_over_a_grid() {
        let series = [100.0, 96.0, 104.0, 120.0, 80.0, 101.0, 99.5];
        for &initial in &series {
            for &last in &series {
                let bands = calculate_bands(80.0, 120.0);
                let state = classify_state(initial, last, &bands, 0.5, Some(5.0));
                if state.is_increasing() {
                    assert!(last >= bands.upper.start);
                }
                if state.is_decreasing() {
                    assert!(last <= bands.lower.start);
                }
            }
        }
    }

    #[test]
    fn intensity_requirements_are_asymmetric() {
        let req = calculate_intensity_requirements(&[1.0, 1.0, 1.0, 1.0, 96.0]);
        // mean 20, min 1, max 96
        assert_eq!(req.low, 10.5);
        assert_eq!(req.medium, 20.0);
        assert_eq!(req.high, 58.0);
        assert_eq!(req.very_high, 77.0);

        assert_eq!(classify_intensity(0.0, &req), 0);
        assert_eq!(classify_intensity(5.0, &req), 0);
        assert_eq!(classify_intensity(11.0, &req), 1);
        assert_eq!(classify_intensity(20.0, &req), 2);
        assert_eq!(classify_intensity(60.0, &req), 3);
        assert_eq!(classify_intensity(96.0, &req), 4);
    }

    #[test]
    fn split_states_follow_the_tail() {
        // Long decline then a sharp rally at the very end
        let mut values: Vec<f64> = (0..100).map(|i| 200.0 - i as f64).collect();
        values.extend([110.0, 125.0]);
        let splits = calculate_split_states(&values, 0.5, 5.0);
        assert_eq!(splits.len(), 8);
        assert_eq!(splits[&SplitRange::S2].state, StateType::IncreasingStrongly);
        assert!(splits[&SplitRange::S100].state.is_decreasing());
    }
}
