//! Reversal engine: scores each KeyZone contact episode and issues at most one signal.

use std::sync::Arc;

use anyhow::Result;

use crate::analysis::reversal_scoring::{
    calculate_coins_score, calculate_liquidity_score, calculate_volume_score,
    select_compliant_symbols,
};
#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::config::ReversalConfig;
use crate::data::store::{Store, load_or_init_config, save_config};
use crate::domain::CompressedCoinsStates;
use crate::models::{
    KeyZoneEvent, MinifiedLiquidityState, MinifiedReversalState, ReversalCoinsStates,
    ReversalKind, ReversalRecord, ReversalScores, ReversalSignal, ReversalState,
};
use crate::utils::maths_utils::round_to;

pub const CONFIG_KEY: &str = "reversal";

/// Market inputs of one reversal tick.
pub struct ReversalInputs<'a> {
    pub event: Option<&'a KeyZoneEvent>,
    pub liquidity: &'a MinifiedLiquidityState,
    /// Volume intensity tier (0-4) of the live window
    pub volume_intensity: u8,
    pub coins: &'a CompressedCoinsStates,
}

struct ActiveEpisode {
    state: ReversalState,
    coins: ReversalCoinsStates,
}

impl ActiveEpisode {
    fn record(&self) -> ReversalRecord {
        ReversalRecord {
            state: self.state.clone(),
            coins: self.coins.clone(),
        }
    }
}

pub struct ReversalEngine {
    config: ReversalConfig,
    store: Arc<dyn Store>,
    active: Option<ActiveEpisode>,
}

impl ReversalEngine {
    pub fn initialize(store: Arc<dyn Store>) -> Result<Self> {
        let config: ReversalConfig = load_or_init_config(store.as_ref(), CONFIG_KEY)?;
        config.validate()?;
        Ok(Self {
            config,
            store,
            active: None,
        })
    }

    pub fn config(&self) -> &ReversalConfig {
        &self.config
    }

    pub fn update_configuration(&mut self, config: ReversalConfig) -> Result<()> {
        config.validate()?;
        save_config(self.store.as_ref(), CONFIG_KEY, &config)?;
        self.config = config;
        log::info!("Reversal configuration updated");
        Ok(())
    }

    pub fn state(&self) -> MinifiedReversalState {
        self.active
            .as_ref()
            .map(|a| MinifiedReversalState::from(&a.state))
            .unwrap_or_default()
    }

    /// Closes the active episode when its event is gone or superseded, opens one for a
    /// new event, then scores the active episode. A failed close leaves the episode
    /// in place and returns the error.
    pub fn calculate_state(
        &mut self,
        inputs: &ReversalInputs,
        now_ms: i64,
    ) -> Result<MinifiedReversalState> {
        let event_id = inputs.event.map(|e| e.triggered_at);
        if let Some(active) = &self.active
            && event_id != Some(active.state.id)
        {
            self.close_active(inputs.coins, now_ms)?;
        }

        if self.active.is_none()
            && let Some(event) = inputs.event
        {
            log::info!(
                "Reversal episode {} opened ({:?})",
                event.triggered_at,
                event.kind
            );
            self.active = Some(ActiveEpisode {
                state: ReversalState {
                    id: event.triggered_at,
                    kind: ReversalKind::from(event.kind),
                    event: event.clone(),
                    scores: ReversalScores::default(),
                    signal: None,
                    ended_at: None,
                },
                coins: ReversalCoinsStates {
                    initial: inputs.coins.clone(),
                    event: None,
                    last: None,
                },
            });
        }

        let config = &self.config;
        let Some(active) = self.active.as_mut() else {
            return Ok(MinifiedReversalState::default());
        };

        let kind = active.state.kind;
        let weights = &config.score_weights;
        let volume = calculate_volume_score(inputs.volume_intensity, weights);
        let liquidity =
            calculate_liquidity_score(kind, inputs.liquidity.bid_liquidity_power, weights);
        let coins = calculate_coins_score(kind, inputs.coins, &config.coin_split_ranges, weights);
        let general = round_to(volume + liquidity + coins, 2);
        active.state.scores.push(volume, liquidity, coins, general);

        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_reversal_scores {
            log::info!(
                "Reversal {} scores: volume {} liquidity {} coins {} general {}",
                active.state.id,
                volume,
                liquidity,
                coins,
                general
            );
        }

        if active.state.signal.is_none() && general >= config.min_event_score {
            let symbols = select_compliant_symbols(
                kind,
                &active.coins.initial,
                inputs.coins,
                &config.coin_split_ranges,
                config.event_sort_func,
            );
            if symbols.is_empty() {
                log::debug!(
                    "Reversal {} reached {} but no symbol moved in its favor yet",
                    active.state.id,
                    general
                );
            } else {
                log::info!(
                    "Reversal {} signal ({:?}): {:?}",
                    active.state.id,
                    kind,
                    symbols
                );
                active.coins.event = Some(inputs.coins.clone());
                active.state.signal = Some(ReversalSignal {
                    timestamp: now_ms,
                    symbols,
                });
            }
        }

        Ok(MinifiedReversalState::from(&active.state))
    }

    fn close_active(&mut self, coins: &CompressedCoinsStates, now_ms: i64) -> Result<()> {
        let Some(active) = &self.active else {
            return Ok(());
        };
        let mut record = active.record();
        record.state.ended_at = Some(now_ms);
        record.coins.last = Some(coins.clone());
        self.store.save_reversal_record(&record)?;
        log::info!(
            "Reversal episode {} closed after {} ticks",
            record.state.id,
            record.state.scores.general.len()
        );
        self.active = None;
        Ok(())
    }

    /// The active episode from memory, closed ones from the store.
    pub fn get_record(&self, id: i64) -> Result<Option<ReversalRecord>> {
        match &self.active {
            Some(active) if active.state.id == id => Ok(Some(active.record())),
            _ => self.store.get_reversal_record(id),
        }
    }
}
