//! Mines support/resistance zones out of candlestick history.
//!
//! 1. A candlestick is a resistance reversal when its high strictly exceeds the highs
//!    of its [`REVERSAL_NEIGHBORS`] predecessors and successors (support mirrors this
//!    on lows).
//! 2. Each reversal either lands inside an existing temporary zone or opens a new one.
//! 3. Temporary zones are merge-passed twice and their volume is summarised.

use anyhow::{Result, bail};

use crate::config::{DEBUG_FLAGS, KeyZonesConfig};
use crate::domain::Candlestick;
use crate::models::{KeyZone, KeyZoneKind, KeyZoneReversal};
use crate::utils::maths_utils::{alter_by_pct, mean, round_to};
use crate::utils::state_utils::{calculate_intensity_requirements, classify_intensity};

/// Candlesticks compared on each side of a reversal candidate.
pub const REVERSAL_NEIGHBORS: usize = 3;

/// A detected reversal together with the price range it proposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReversalCandidate {
    pub reversal: KeyZoneReversal,
    pub start: f64,
    pub end: f64,
}

/// Scans the candlesticks for local highs/lows. A single candlestick can be both.
pub fn detect_reversals(candles: &[Candlestick], zone_size: f64) -> Vec<ReversalCandidate> {
    let mut found = Vec::new();
    if candles.len() < REVERSAL_NEIGHBORS * 2 + 1 {
        return found;
    }

    for i in REVERSAL_NEIGHBORS..candles.len() - REVERSAL_NEIGHBORS {
        let current = &candles[i];
        let neighbors = candles[i - REVERSAL_NEIGHBORS..i]
            .iter()
            .chain(&candles[i + 1..=i + REVERSAL_NEIGHBORS]);

        let (mut is_resistance, mut is_support) = (true, true);
        for n in neighbors {
            is_resistance &= current.high > n.high;
            is_support &= current.low < n.low;
        }

        if is_resistance {
            found.push(ReversalCandidate {
                reversal: KeyZoneReversal {
                    id: current.open_time,
                    kind: KeyZoneKind::Resistance,
                    volume: current.volume,
                },
                start: alter_by_pct(current.high, -zone_size),
                end: current.high,
            });
        }
        if is_support {
            found.push(ReversalCandidate {
                reversal: KeyZoneReversal {
                    id: current.open_time,
                    kind: KeyZoneKind::Support,
                    volume: current.volume,
                },
                start: current.low,
                end: alter_by_pct(current.low, zone_size),
            });
        }
    }
    found
}

/// Attaches each candidate to the first temporary zone it overlaps, or opens a new one.
pub fn build_temporary_zones(candidates: &[ReversalCandidate]) -> Vec<KeyZone> {
    let mut zones: Vec<KeyZone> = Vec::new();
    for candidate in candidates {
        match zones
            .iter_mut()
            .find(|z| z.overlaps(candidate.start, candidate.end))
        {
            Some(zone) => zone.add_reversal(candidate.reversal),
            None => zones.push(KeyZone::new(
                candidate.reversal,
                candidate.start,
                candidate.end,
            )),
        }
    }
    zones
}

/// Gap (%) between the end of `lower` and the start of `upper`. Negative when they overlap.
fn gap_pct(lower: &KeyZone, upper: &KeyZone) -> f64 {
    (upper.start - lower.end) / lower.end * 100.0
}

fn merge_pair(a: KeyZone, b: KeyZone) -> KeyZone {
    let mut reversals = a.reversals;
    reversals.extend(b.reversals);
    reversals.sort_by_key(|r| r.id);
    let mut merged = KeyZone {
        id: a.id.min(b.id),
        start: (a.start + b.start) / 2.0,
        end: (a.end + b.end) / 2.0,
        reversals,
        mutated: false,
        volume_mean: 0.0,
        volume_intensity: 0,
    };
    merged.refresh_mutated();
    merged
}

/// One merge pass. Zones are sorted by start and the running zone absorbs every
/// following zone within `merge_distance_limit` percent, so chains collapse in one go.
pub fn merge_zones(mut zones: Vec<KeyZone>, merge_distance_limit: f64) -> Vec<KeyZone> {
    zones.sort_by(|a, b| a.start.total_cmp(&b.start));
    let mut merged: Vec<KeyZone> = Vec::with_capacity(zones.len());
    let mut iter = zones.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };
    for next in iter {
        if gap_pct(&current, &next) <= merge_distance_limit {
            current = merge_pair(current, next);
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);
    merged
}

/// Sets each zone's volume mean and its intensity relative to all the other zones.
fn summarise_volume(zones: &mut [KeyZone]) {
    for zone in zones.iter_mut() {
        let volumes: Vec<f64> = zone.reversals.iter().map(|r| r.volume).collect();
        zone.volume_mean = round_to(mean(&volumes), 4);
    }
    let means: Vec<f64> = zones.iter().map(|z| z.volume_mean).collect();
    let requirements = calculate_intensity_requirements(&means);
    for zone in zones.iter_mut() {
        zone.volume_intensity = classify_intensity(zone.volume_mean, &requirements);
    }
}

/// Full build. Fails when the history cannot hold a single reversal, in which case
/// the caller keeps its previous zones.
pub fn build_keyzones(candles: &[Candlestick], config: &KeyZonesConfig) -> Result<Vec<KeyZone>> {
    if candles.len() < REVERSAL_NEIGHBORS * 2 + 1 {
        bail!(
            "Insufficient history: {} candlesticks (minimum: {}).",
            candles.len(),
            REVERSAL_NEIGHBORS * 2 + 1
        );
    }

    let candidates = detect_reversals(candles, config.zone_size);
    let temporary = build_temporary_zones(&candidates);
    let temporary_count = temporary.len();

    let mut zones = merge_zones(temporary, config.zone_merge_distance_limit);
    zones = merge_zones(zones, config.zone_merge_distance_limit);
    summarise_volume(&mut zones);

    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_keyzone_build {
        log::info!(
            "KeyZone build: {} candlesticks, {} reversals, {} temporary zones, {} merged zones",
            candles.len(),
            candidates.len(),
            temporary_count,
            zones.len()
        );
    }
    #[cfg(not(debug_assertions))]
    let _ = temporary_count;

    Ok(zones)
}
