use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;

use zone_radar::config::{BINANCE, MARKET};
use zone_radar::data::candlesticks::{BinanceCandlesticks, CandlestickSource};
use zone_radar::data::order_book_rest::{BinanceOrderBook, OrderBookSource};
use zone_radar::engine::core::fetch_build_history;
use zone_radar::engine::liquidity::sync_book_snapshot;
use zone_radar::engine::{GuardedTask, MarketStateEngine};
use zone_radar::utils::retry::retry_with_delay;
use zone_radar::utils::time_utils::now_ms;
use zone_radar::{Cli, CompressedCoinsStates, FileStore, OrderBookStream, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // A. Init Logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // B. Parse Args
    let args = Cli::parse();
    #[cfg(debug_assertions)]
    log::info!("Parsed arguments: {:?}", args);

    // C. Store and engines
    let store: Arc<dyn Store> = Arc::new(
        FileStore::new(args.store_dir.clone())
            .with_context(|| format!("Failed to open store at {}", args.store_dir))?,
    );
    let engine = MarketStateEngine::initialize(&args.symbol, store)?;
    let symbol = engine.symbol.clone();
    let book = engine.liquidity.shared_book();
    let lookback = engine.keyzones.config().build_lookback_candles;
    let engine = Arc::new(Mutex::new(engine));
    log::info!("Zone Radar starting for {}", symbol);

    let candles: Arc<dyn CandlestickSource> = Arc::new(BinanceCandlesticks::new()?);
    let depth: Arc<dyn OrderBookSource> = Arc::new(BinanceOrderBook::new()?);

    // D. Live depth stream feeding the shared book
    let stream = OrderBookStream::new(&symbol, book.clone());
    let (_stream_handle, _health_handle) = stream.spawn();

    // E. Periodic order book snapshot sync
    let snapshot_task = GuardedTask::new(
        "Order book snapshot sync",
        Duration::from_secs(MARKET.snapshot_sync_seconds),
    );
    let _snapshot_handle = {
        let (book, depth, symbol) = (book.clone(), depth.clone(), symbol.clone());
        snapshot_task.spawn(move || {
            let (book, depth, symbol) = (book.clone(), depth.clone(), symbol.clone());
            async move {
                let id = retry_with_delay(
                    "Order book snapshot",
                    BINANCE.snapshot_retry.attempts,
                    Duration::from_millis(BINANCE.snapshot_retry.delay_ms),
                    || sync_book_snapshot(&book, depth.as_ref(), &symbol),
                )
                .await?;
                log::debug!("{}: order book synced at update {}", symbol, id);
                Ok(())
            }
        })
    };

    // F. KeyZone builds, checked every tick and run when the cadence has elapsed
    let build_task = GuardedTask::new("KeyZone build", Duration::from_secs(args.tick_seconds));
    let _build_handle = {
        let (engine, candles, symbol) = (engine.clone(), candles.clone(), symbol.clone());
        build_task.spawn(move || {
            let (engine, candles, symbol) = (engine.clone(), candles.clone(), symbol.clone());
            async move {
                if !engine.lock().await.keyzones.build_due(now_ms()) {
                    return Ok(());
                }
                let history = fetch_build_history(candles.as_ref(), &symbol, lookback).await?;
                engine
                    .lock()
                    .await
                    .keyzones
                    .build_zones(history, now_ms())
                    .with_context(|| format!("{}: KeyZone build failed", symbol))?;
                Ok(())
            }
        })
    };

    // G. Market state tick
    let tick_task = GuardedTask::new("Market state tick", Duration::from_secs(args.tick_seconds));
    let tick_handle = {
        let (engine, candles, symbol) = (engine.clone(), candles.clone(), symbol.clone());
        tick_task.spawn(move || {
            let (engine, candles, symbol) = (engine.clone(), candles.clone(), symbol.clone());
            async move {
                let window = candles
                    .fetch_candlesticks(&symbol, MARKET.window.interval_ms, MARKET.window.size as usize)
                    .await
                    .context("Failed to fetch the live window")?;
                // Coin states come from an external feed; none is wired into this binary.
                let coins = CompressedCoinsStates::default();
                let state = engine.lock().await.tick(&window, &coins, now_ms())?;
                log::info!(
                    "{} @ {:.2} | volume {} | bid power {:.1} | event {} | reversal #{} {:.1}",
                    symbol,
                    state.price,
                    state.volume_intensity,
                    state.liquidity.bid_liquidity_power,
                    state
                        .keyzones
                        .event
                        .as_ref()
                        .map(|e| format!("{:?}", e.kind))
                        .unwrap_or_else(|| "none".to_string()),
                    state.reversal.id,
                    state.reversal.general_score,
                );
                Ok(())
            }
        })
    };

    tick_handle.await.context("Market state loop stopped")?;
    Ok(())
}
