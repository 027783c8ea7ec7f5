//! Sub-scores and symbol selection for reversal episodes.

use rand::seq::SliceRandom;

use crate::config::{EventSortFunc, ReversalScoreWeights};
use crate::domain::coin_state::CompressedCoinsStates;
use crate::domain::state::{SplitRange, StateType};
use crate::models::ReversalKind;
use crate::utils::maths_utils::round_to;

fn in_favor(kind: ReversalKind, state: StateType) -> bool {
    match kind {
        ReversalKind::Support => state.is_increasing(),
        ReversalKind::Resistance => state.is_decreasing(),
    }
}

/// Step function of the market's volume intensity tier.
pub fn calculate_volume_score(volume_intensity: u8, weights: &ReversalScoreWeights) -> f64 {
    let multiplier = match volume_intensity {
        0 => 0.0,
        1 => 0.5,
        2 => 0.75,
        3 => 0.9,
        _ => 1.0,
    };
    round_to(weights.volume * multiplier, 2)
}

/// Asymmetric step of the bid liquidity power. Support wants a heavy bid side,
/// resistance a heavy ask side.
pub fn calculate_liquidity_score(
    kind: ReversalKind,
    bid_liquidity_power: f64,
    weights: &ReversalScoreWeights,
) -> f64 {
    let power = match kind {
        ReversalKind::Support => bid_liquidity_power,
        ReversalKind::Resistance => 100.0 - bid_liquidity_power,
    };
    let multiplier = if power >= 85.0 {
        1.0
    } else if power >= 75.0 {
        0.85
    } else if power >= 65.0 {
        0.7
    } else if power >= 55.0 {
        0.5
    } else if power >= 50.0 {
        0.25
    } else {
        0.0
    };
    round_to(weights.liquidity * multiplier, 2)
}

/// Fraction of `(symbol, range)` split states pointing in the reversal's favor.
pub fn calculate_coins_score(
    kind: ReversalKind,
    coins: &CompressedCoinsStates,
    ranges: &[SplitRange],
    weights: &ReversalScoreWeights,
) -> f64 {
    let (mut favorable, mut total) = (0usize, 0usize);
    for coin in coins.by_symbol.values() {
        for range in ranges {
            if let Some(split) = coin.split_states.get(range) {
                total += 1;
                if in_favor(kind, split.state) {
                    favorable += 1;
                }
            }
        }
    }
    if total == 0 {
        return 0.0;
    }
    round_to(weights.coins * favorable as f64 / total as f64, 2)
}

/// Symbols whose state is in the reversal's favor and whose short-range change moved
/// in favor since `initial`, ordered by `sort_func`.
pub fn select_compliant_symbols(
    kind: ReversalKind,
    initial: &CompressedCoinsStates,
    current: &CompressedCoinsStates,
    ranges: &[SplitRange],
    sort_func: EventSortFunc,
) -> Vec<String> {
    let mut compliant: Vec<(String, f64)> = current
        .by_symbol
        .iter()
        .filter(|(_, coin)| in_favor(kind, coin.state))
        .filter_map(|(symbol, coin)| {
            let now = coin.change_sum(ranges);
            let before = initial
                .by_symbol
                .get(symbol)
                .map(|c| c.change_sum(ranges))
                .unwrap_or(0.0);
            let moved = match kind {
                ReversalKind::Support => now > before,
                ReversalKind::Resistance => now < before,
            };
            moved.then(|| (symbol.clone(), now))
        })
        .collect();

    match sort_func {
        EventSortFunc::ChangeSum => {
            compliant.sort_by(|a, b| match kind {
                ReversalKind::Support => b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)),
                ReversalKind::Resistance => a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)),
            });
        }
        EventSortFunc::Shuffle => compliant.shuffle(&mut rand::thread_rng()),
    }
    compliant.into_iter().map(|(symbol, _)| symbol).collect()
}
