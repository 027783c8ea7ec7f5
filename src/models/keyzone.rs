use serde::{Deserialize, Serialize};

/// Which side of the price a zone (or the reversal that formed it) acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyZoneKind {
    Support,
    Resistance,
}

/// A local price reversal that contributed to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyZoneReversal {
    /// Open time of the reversal candlestick
    pub id: i64,
    pub kind: KeyZoneKind,
    pub volume: f64,
}

/// A historical price band repeatedly acting as support or resistance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyZone {
    /// Open time of the candlestick that originated the zone
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub reversals: Vec<KeyZoneReversal>,
    /// Set once the zone has held both support and resistance reversals
    pub mutated: bool,
    pub volume_mean: f64,
    pub volume_intensity: u8,
}

impl KeyZone {
    pub fn new(reversal: KeyZoneReversal, start: f64, end: f64) -> Self {
        Self {
            id: reversal.id,
            start,
            end,
            reversals: vec![reversal],
            mutated: false,
            volume_mean: 0.0,
            volume_intensity: 0,
        }
    }

    /// Inclusive overlap with `[start, end]`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start <= end && start <= self.end
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.start && price <= self.end
    }

    /// Records another reversal inside the zone's range.
    pub fn add_reversal(&mut self, reversal: KeyZoneReversal) {
        self.reversals.push(reversal);
        self.refresh_mutated();
    }

    pub fn refresh_mutated(&mut self) {
        let has = |kind| self.reversals.iter().any(|r| r.kind == kind);
        self.mutated = has(KeyZoneKind::Support) && has(KeyZoneKind::Resistance);
    }

    pub fn minify(&self, liquidity_share: f64, score: f64) -> MinifiedKeyZone {
        MinifiedKeyZone {
            id: self.id,
            start: self.start,
            end: self.end,
            reversals: self.reversals.len(),
            mutated: self.mutated,
            volume_intensity: self.volume_intensity,
            liquidity_share,
            score,
        }
    }
}

/// A zone as reported in per-tick state and inside events, with its live score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinifiedKeyZone {
    pub id: i64,
    pub start: f64,
    pub end: f64,
    pub reversals: usize,
    pub mutated: bool,
    pub volume_intensity: u8,
    /// % of one book side's liquidity sitting inside the padded zone
    pub liquidity_share: f64,
    pub score: f64,
}

/// Contact between the price and a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyZoneEvent {
    pub kind: KeyZoneKind,
    pub zone: MinifiedKeyZone,
    pub triggered_at: i64,
    pub expires_at: i64,
    /// Price beyond which the event is invalidated before it expires
    pub price_limit: f64,
}

impl KeyZoneEvent {
    /// An event is live until it expires or price breaks through its limit.
    pub fn is_active(&self, now_ms: i64, price: f64) -> bool {
        if now_ms > self.expires_at {
            return false;
        }
        match self.kind {
            KeyZoneKind::Resistance => price <= self.price_limit,
            KeyZoneKind::Support => price >= self.price_limit,
        }
    }
}

/// Per-tick output of the KeyZone engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyZonesState {
    pub event: Option<KeyZoneEvent>,
    /// Nearest zones above the price, closest first
    pub above: Vec<MinifiedKeyZone>,
    /// Nearest zones below the price, closest first
    pub below: Vec<MinifiedKeyZone>,
}
