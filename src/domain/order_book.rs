//! Order book payloads as received from the exchange.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookSide {
    Ask,
    Bid,
}

/// A `[price, quantity]` pair. Prices stay as strings so they can key the raw
/// book exactly as the exchange spells them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceLevel {
    pub price: String,
    pub quantity: f64,
}

impl RawPriceLevel {
    pub fn new(price: impl Into<String>, quantity: f64) -> Self {
        Self {
            price: price.into(),
            quantity,
        }
    }

    /// Parses an exchange `[price, qty]` string pair. Unparseable quantities reject the level.
    pub fn from_pair(pair: &[String]) -> Option<Self> {
        let (price, qty) = (pair.first()?, pair.get(1)?);
        price.parse::<f64>().ok()?;
        let quantity = qty.parse::<f64>().ok()?;
        Some(Self::new(price.clone(), quantity))
    }
}

/// Full order book from the REST endpoint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBookSnapshot {
    pub last_update_id: u64,
    pub asks: Vec<RawPriceLevel>,
    pub bids: Vec<RawPriceLevel>,
}

/// One incremental update from the diff-depth stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderBookDelta {
    pub event_time: i64,
    pub first_update_id: u64,
    pub final_update_id: u64,
    pub asks: Vec<RawPriceLevel>,
    pub bids: Vec<RawPriceLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pair_rejects_garbage() {
        let ok = RawPriceLevel::from_pair(&["101.5".to_string(), "2.25".to_string()]).unwrap();
        assert_eq!(ok.price, "101.5");
        assert_eq!(ok.quantity, 2.25);
        assert!(RawPriceLevel::from_pair(&["abc".to_string(), "1".to_string()]).is_none());
        assert!(RawPriceLevel::from_pair(&["1".to_string()]).is_none());
    }
}
