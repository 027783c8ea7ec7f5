use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::{BINANCE, MARKET};
use crate::data::candlesticks::CandlestickSource;
use crate::data::store::Store;
use crate::domain::{Candlestick, CompressedCoinsStates};
use crate::models::{KeyZonesState, MinifiedLiquidityState, MinifiedReversalState};
use crate::utils::retry::retry_with_delay;
use crate::utils::state_utils::{calculate_intensity_requirements, classify_intensity};

use super::keyzones::KeyZonesEngine;
use super::liquidity::LiquidityEngine;
use super::reversal::{ReversalEngine, ReversalInputs};

/// Combined per-tick output of the three engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub timestamp: i64,
    pub price: f64,
    pub volume_intensity: u8,
    pub liquidity: MinifiedLiquidityState,
    pub keyzones: KeyZonesState,
    pub reversal: MinifiedReversalState,
}

/// Intensity tier of the latest candlestick's volume relative to the window.
pub fn window_volume_intensity(window: &[Candlestick]) -> u8 {
    let Some(latest) = window.last() else {
        return 0;
    };
    let volumes: Vec<f64> = window.iter().map(|c| c.volume).collect();
    classify_intensity(latest.volume, &calculate_intensity_requirements(&volumes))
}

/// Owns the three engines and drives them in their fixed order:
/// Liquidity → KeyZones → Reversal.
pub struct MarketStateEngine {
    pub symbol: String,
    pub liquidity: LiquidityEngine,
    pub keyzones: KeyZonesEngine,
    pub reversal: ReversalEngine,
}

impl MarketStateEngine {
    pub fn initialize(symbol: &str, store: Arc<dyn Store>) -> Result<Self> {
        Ok(Self {
            symbol: symbol.to_uppercase(),
            liquidity: LiquidityEngine::initialize(store.clone())
                .context("Failed to initialize the liquidity engine")?,
            keyzones: KeyZonesEngine::initialize(store.clone())
                .context("Failed to initialize the KeyZones engine")?,
            reversal: ReversalEngine::initialize(store)
                .context("Failed to initialize the reversal engine")?,
        })
    }

    /// One market tick over the live candlestick window (oldest first).
    pub fn tick(
        &mut self,
        window: &[Candlestick],
        coins: &CompressedCoinsStates,
        now_ms: i64,
    ) -> Result<MarketState> {
        let Some(latest) = window.last().copied() else {
            bail!("{}: empty candlestick window", self.symbol);
        };
        let price = latest.close;
        let volume_intensity = window_volume_intensity(window);

        let liquidity = self.liquidity.calculate_state(price, now_ms);
        let keyzones = self
            .keyzones
            .calculate_state(window, self.liquidity.build(), now_ms)
            .context("KeyZones state failed")?;
        let reversal = self
            .reversal
            .calculate_state(
                &ReversalInputs {
                    event: keyzones.event.as_ref(),
                    liquidity: &liquidity,
                    volume_intensity,
                    coins,
                },
                now_ms,
            )
            .context("Reversal state failed")?;

        Ok(MarketState {
            timestamp: now_ms,
            price,
            volume_intensity,
            liquidity,
            keyzones,
            reversal,
        })
    }
}

/// Fetches the KeyZone build history with the snapshot retry policy.
pub async fn fetch_build_history(
    source: &dyn CandlestickSource,
    symbol: &str,
    lookback: usize,
) -> Result<Vec<Candlestick>> {
    retry_with_delay(
        "KeyZone history fetch",
        BINANCE.snapshot_retry.attempts,
        std::time::Duration::from_millis(BINANCE.snapshot_retry.delay_ms),
        || source.fetch_candlesticks(symbol, MARKET.keyzones_interval_ms, lookback),
    )
    .await
}
