use anyhow::{Result, bail};
use async_trait::async_trait;
use binance_sdk::spot::rest_api::{DepthParams, RestApi};

use crate::config::BINANCE;
use crate::data::binance_client::{configure_binance_client, report_connector_error};
use crate::domain::{OrderBookSnapshot, RawPriceLevel};

/// Full order book snapshots.
#[async_trait]
pub trait OrderBookSource: Send + Sync {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<OrderBookSnapshot>;
}

fn convert_levels(pairs: Option<Vec<Vec<String>>>) -> Vec<RawPriceLevel> {
    pairs
        .unwrap_or_default()
        .iter()
        .filter_map(|p| RawPriceLevel::from_pair(p))
        .collect()
}

pub struct BinanceOrderBook {
    client: RestApi,
}

impl BinanceOrderBook {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: configure_binance_client()?,
        })
    }
}

#[async_trait]
impl OrderBookSource for BinanceOrderBook {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<OrderBookSnapshot> {
        let params = DepthParams::builder(symbol.to_string())
            .limit(BINANCE.limits.depth_limit)
            .build()?;
        let depth = match self.client.depth(params).await {
            Ok(response) => response.data().await?,
            Err(e) => return Err(report_connector_error(e, symbol)),
        };
        let Some(last_update_id) = depth.last_update_id else {
            bail!("{}: depth snapshot without lastUpdateId", symbol);
        };
        Ok(OrderBookSnapshot {
            last_update_id: last_update_id.max(0) as u64,
            asks: convert_levels(depth.asks),
            bids: convert_levels(depth.bids),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use anyhow::{Result, bail};
    use async_trait::async_trait;

    use super::OrderBookSource;
    use crate::domain::OrderBookSnapshot;

    /// Serves a fixed snapshot, or fails when none is set.
    #[derive(Default)]
    pub struct StaticOrderBook {
        pub snapshot: Mutex<Option<OrderBookSnapshot>>,
    }

    #[async_trait]
    impl OrderBookSource for StaticOrderBook {
        async fn fetch_snapshot(&self, _symbol: &str) -> Result<OrderBookSnapshot> {
            match self.snapshot.lock().unwrap().clone() {
                Some(snapshot) => Ok(snapshot),
                None => bail!("snapshot unavailable"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sides_convert_to_empty() {
        assert!(convert_levels(None).is_empty());
        let levels = convert_levels(Some(vec![
            vec!["100.5".to_string(), "1.0".to_string()],
            vec!["x".to_string(), "1.0".to_string()],
        ]));
        assert_eq!(levels, vec![RawPriceLevel::new("100.5", 1.0)]);
    }
}
