//! Pure liquidity computations: bucketing, intensity, peaks and bid power.

use std::collections::{BTreeMap, HashMap};

use crate::config::IntensityWeights;
use crate::domain::BookSide;
use crate::models::{LiquidityPeaks, LiquidityPriceLevel, LiquiditySideBuild, PeakRange};
use crate::utils::maths_utils::round_to;
use crate::utils::state_utils::{IntensityRequirements, classify_intensity};

/// Groups raw `price → quantity` levels into integer-priced buckets.
/// Asks come back ascending, bids descending (best price first on both sides).
pub fn group_levels(raw: &HashMap<String, f64>, side: BookSide) -> Vec<(f64, f64)> {
    let mut buckets: BTreeMap<i64, f64> = BTreeMap::new();
    for (price, quantity) in raw {
        let Ok(price) = price.parse::<f64>() else {
            continue;
        };
        if *quantity <= 0.0 || !price.is_finite() {
            continue;
        }
        *buckets.entry(price.floor() as i64).or_insert(0.0) += quantity;
    }
    let ascending = buckets.into_iter().map(|(p, q)| (p as f64, q));
    match side {
        BookSide::Ask => ascending.collect(),
        BookSide::Bid => ascending.rev().collect(),
    }
}

/// Assigns an intensity tier to every bucket and totals the side.
pub fn build_side(groups: &[(f64, f64)], requirements: &IntensityRequirements) -> LiquiditySideBuild {
    let levels: Vec<LiquidityPriceLevel> = groups
        .iter()
        .map(|&(price, liquidity)| LiquidityPriceLevel {
            price,
            liquidity,
            intensity: classify_intensity(liquidity, requirements),
        })
        .collect();
    let total = levels.iter().map(|l| l.liquidity).sum();
    LiquiditySideBuild { levels, total }
}

/// Levels with a non-zero intensity inside the peak range.
pub fn calculate_peaks(side: &LiquiditySideBuild, range: &PeakRange) -> LiquidityPeaks {
    side.levels
        .iter()
        .filter(|l| l.intensity > 0 && range.contains(l.price))
        .map(|l| (l.price as i64, l.intensity))
        .collect()
}

/// Each peak contributes `intensity × weight[intensity]`.
pub fn weighted_points(peaks: &LiquidityPeaks, weights: &IntensityWeights) -> f64 {
    peaks
        .values()
        .map(|&intensity| intensity as f64 * weights.weight_for(intensity))
        .sum()
}

/// Share (0-100) of weighted points on the bid side. A book without peaks is neutral (50).
pub fn calculate_bid_liquidity_power(bid_points: f64, ask_points: f64) -> f64 {
    let total = bid_points + ask_points;
    if total <= 0.0 {
        return 50.0;
    }
    round_to(bid_points / total * 100.0, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(levels: &[(&str, f64)]) -> HashMap<String, f64> {
        levels.iter().map(|(p, q)| (p.to_string(), *q)).collect()
    }

    #[test]
    fn groups_into_integer_buckets() {
        let book = raw(&[("100.1", 1.0), ("100.9", 2.0), ("101.5", 4.0), ("99.99", 0.5)]);
        let asks = group_levels(&book, BookSide::Ask);
        assert_eq!(asks, vec![(99.0, 0.5), (100.0, 3.0), (101.0, 4.0)]);
        let bids = group_levels(&book, BookSide::Bid);
        assert_eq!(bids, vec![(101.0, 4.0), (100.0, 3.0), (99.0, 0.5)]);
    }

    #[test]
    fn ignores_unparseable_and_empty_levels() {
        let book = raw(&[("abc", 1.0), ("100", 0.0), ("101", 2.0)]);
        assert_eq!(group_levels(&book, BookSide::Ask), vec![(101.0, 2.0)]);
    }

    #[test]
    fn peaks_only_within_range() {
        let req = IntensityRequirements {
            low: 1.0,
            medium: 2.0,
            high: 3.0,
            very_high: 4.0,
        };
        let side = build_side(&[(100.0, 0.5), (101.0, 2.5), (150.0, 10.0)], &req);
        assert_eq!(side.total, 13.0);
        let peaks = calculate_peaks(&side, &PeakRange::around(100.0, 2.0));
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.get(&101), Some(&2));
    }

    #[test]
    fn bid_power_eighty_twenty() {
        assert_eq!(calculate_bid_liquidity_power(80.0, 20.0), 80.0);
        assert_eq!(calculate_bid_liquidity_power(0.0, 0.0), 50.0);
        assert_eq!(calculate_bid_liquidity_power(0.0, 5.0), 0.0);
    }

    #[test]
    fn weighted_points_use_tier_weight() {
        let weights = IntensityWeights {
            low: 1.0,
            medium: 3.0,
            high: 6.0,
            very_high: 10.0,
        };
        let peaks: LiquidityPeaks = [(100, 1u8), (101, 4u8)].into_iter().collect();
        // 1×1 + 4×10
        assert_eq!(weighted_points(&peaks, &weights), 41.0);
    }
}
