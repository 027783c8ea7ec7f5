//! Live scoring of KeyZones against the order book.

use crate::config::KeyZonesConfig;
use crate::models::{KeyZone, LiquiditySideBuild, MinifiedKeyZone};
use crate::utils::maths_utils::round_to;

/// Multiplier for a zone's volume intensity tier.
pub fn volume_intensity_multiplier(intensity: u8) -> f64 {
    match intensity {
        0 => 0.0,
        1 => 0.25,
        2 => 0.5,
        3 => 0.75,
        _ => 1.0,
    }
}

/// Multiplier for the share (%) of one book side resting inside a zone.
pub fn liquidity_share_multiplier(share: f64) -> f64 {
    if share >= 20.0 {
        1.0
    } else if share >= 15.0 {
        0.85
    } else if share >= 10.0 {
        0.7
    } else if share >= 5.0 {
        0.5
    } else if share >= 2.5 {
        0.3
    } else if share > 0.0 {
        0.1
    } else {
        0.0
    }
}

/// Percentage of `side`'s total liquidity inside the zone widened by `padding_pct`.
pub fn calculate_liquidity_share(zone: &KeyZone, side: &LiquiditySideBuild, padding_pct: f64) -> f64 {
    if side.total <= 0.0 {
        return 0.0;
    }
    let lower = zone.start * (1.0 - padding_pct / 100.0);
    let upper = zone.end * (1.0 + padding_pct / 100.0);
    round_to(side.liquidity_between(lower, upper) / side.total * 100.0, 2)
}

/// `w_volume · f(intensity) + w_liquidity · g(share)`, rounded to 2 decimals.
pub fn calculate_zone_score(volume_intensity: u8, liquidity_share: f64, config: &KeyZonesConfig) -> f64 {
    let weights = &config.score_weights;
    round_to(
        weights.volume_intensity * volume_intensity_multiplier(volume_intensity)
            + weights.liquidity * liquidity_share_multiplier(liquidity_share),
        2,
    )
}

/// Scores a zone against the book side it faces.
pub fn score_zone(zone: &KeyZone, side: &LiquiditySideBuild, config: &KeyZonesConfig) -> MinifiedKeyZone {
    let share = calculate_liquidity_share(zone, side, config.liquidity_range_padding);
    zone.minify(share, calculate_zone_score(zone.volume_intensity, share, config))
}
