use serde::{Deserialize, Serialize};

use crate::domain::coin_state::CompressedCoinsStates;
use crate::models::keyzone::{KeyZoneEvent, KeyZoneKind};

/// Direction a reversal is expected to resolve in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReversalKind {
    /// Price bounces up off a support zone
    Support,
    /// Price is rejected down from a resistance zone
    Resistance,
}

impl ReversalKind {
    pub fn value(self) -> i8 {
        match self {
            ReversalKind::Support => 1,
            ReversalKind::Resistance => -1,
        }
    }
}

impl From<KeyZoneKind> for ReversalKind {
    fn from(kind: KeyZoneKind) -> Self {
        match kind {
            KeyZoneKind::Support => ReversalKind::Support,
            KeyZoneKind::Resistance => ReversalKind::Resistance,
        }
    }
}

/// Append-only score history of an episode, one entry per tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReversalScores {
    pub general: Vec<f64>,
    pub volume: Vec<f64>,
    pub liquidity: Vec<f64>,
    pub coins: Vec<f64>,
}

impl ReversalScores {
    pub fn latest_general(&self) -> f64 {
        self.general.last().copied().unwrap_or(0.0)
    }

    pub fn push(&mut self, volume: f64, liquidity: f64, coins: f64, general: f64) {
        self.volume.push(volume);
        self.liquidity.push(liquidity);
        self.coins.push(coins);
        self.general.push(general);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalSignal {
    pub timestamp: i64,
    /// Symbols that moved in the reversal's favor, in the configured order
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalState {
    /// `triggered_at` of the source KeyZone event
    pub id: i64,
    pub kind: ReversalKind,
    pub event: KeyZoneEvent,
    pub scores: ReversalScores,
    pub signal: Option<ReversalSignal>,
    pub ended_at: Option<i64>,
}

/// Coin snapshots taken at contact, at signal time and at close.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReversalCoinsStates {
    pub initial: CompressedCoinsStates,
    pub event: Option<CompressedCoinsStates>,
    pub last: Option<CompressedCoinsStates>,
}

/// One complete reversal episode as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalRecord {
    pub state: ReversalState,
    pub coins: ReversalCoinsStates,
}

/// Per-tick output. `id == 0` means no episode is active.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MinifiedReversalState {
    pub id: i64,
    /// 1 for support, -1 for resistance, 0 when idle
    pub kind: i8,
    pub general_score: f64,
    pub signal: Option<ReversalSignal>,
}

impl From<&ReversalState> for MinifiedReversalState {
    fn from(state: &ReversalState) -> Self {
        Self {
            id: state.id,
            kind: state.kind.value(),
            general_score: state.scores.latest_general(),
            signal: state.signal.clone(),
        }
    }
}
