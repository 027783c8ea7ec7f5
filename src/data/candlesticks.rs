use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use binance_sdk::spot::rest_api::{KlinesIntervalEnum, KlinesItemInner, KlinesParams, RestApi};

use crate::config::BINANCE;
use crate::data::binance_client::{configure_binance_client, report_connector_error};
use crate::domain::Candlestick;
use crate::utils::TimeUtils;

/// Where candlestick history comes from.
#[async_trait]
pub trait CandlestickSource: Send + Sync {
    /// The latest `limit` candlesticks of `interval_ms`, oldest first.
    async fn fetch_candlesticks(
        &self,
        symbol: &str,
        interval_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candlestick>>;

    /// A unique identifier for this implementation.
    fn signature(&self) -> &'static str;
}

pub fn try_interval_from_ms(ms: i64) -> Result<KlinesIntervalEnum> {
    match ms {
        TimeUtils::MS_IN_S => Ok(KlinesIntervalEnum::Interval1s),
        TimeUtils::MS_IN_MIN => Ok(KlinesIntervalEnum::Interval1m),
        TimeUtils::MS_IN_5_MIN => Ok(KlinesIntervalEnum::Interval5m),
        TimeUtils::MS_IN_15_MIN => Ok(KlinesIntervalEnum::Interval15m),
        TimeUtils::MS_IN_30_MIN => Ok(KlinesIntervalEnum::Interval30m),
        TimeUtils::MS_IN_H => Ok(KlinesIntervalEnum::Interval1h),
        TimeUtils::MS_IN_4_H => Ok(KlinesIntervalEnum::Interval4h),
        TimeUtils::MS_IN_D => Ok(KlinesIntervalEnum::Interval1d),
        _ => Err(anyhow!("Unsupported interval: {}ms", ms)),
    }
}

fn as_f64(item: Option<&KlinesItemInner>) -> Option<f64> {
    match item? {
        KlinesItemInner::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn as_i64(item: Option<&KlinesItemInner>) -> Option<i64> {
    match item? {
        KlinesItemInner::Integer(i) => Some(*i),
        _ => None,
    }
}

/// Converts one Binance kline row. Rows missing any OHLCV field are rejected.
fn convert_kline(row: &[KlinesItemInner]) -> Option<Candlestick> {
    Some(Candlestick {
        open_time: as_i64(row.first())?,
        open: as_f64(row.get(1))?,
        high: as_f64(row.get(2))?,
        low: as_f64(row.get(3))?,
        close: as_f64(row.get(4))?,
        volume: as_f64(row.get(5))?,
        close_time: as_i64(row.get(6))?,
        trade_count: as_i64(row.get(8)).unwrap_or(0).max(0) as u64,
        taker_buy_volume: as_f64(row.get(9)).unwrap_or(0.0),
    })
}

pub struct BinanceCandlesticks {
    client: RestApi,
}

impl BinanceCandlesticks {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: configure_binance_client()?,
        })
    }
}

#[async_trait]
impl CandlestickSource for BinanceCandlesticks {
    fn signature(&self) -> &'static str {
        "Binance API klines"
    }

    async fn fetch_candlesticks(
        &self,
        symbol: &str,
        interval_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candlestick>> {
        let interval = try_interval_from_ms(interval_ms)?;
        let page_size = BINANCE.limits.klines_limit.max(1) as usize;
        let mut all: Vec<Candlestick> = Vec::with_capacity(limit);
        let mut end_time: Option<i64> = None;

        // Page backwards from now until `limit` candlesticks are collected.
        while all.len() < limit {
            let wanted = (limit - all.len()).min(page_size);
            let params = KlinesParams::builder(symbol.to_string(), interval.clone())
                .limit(wanted as i32)
                .end_time(end_time)
                .build()?;
            let rows = match self.client.klines(params).await {
                Ok(response) => response.data().await?,
                Err(e) => return Err(report_connector_error(e, symbol)),
            };
            let batch: Vec<Candlestick> = rows.iter().filter_map(|r| convert_kline(r)).collect();
            if batch.len() != rows.len() {
                log::warn!(
                    "{}: dropped {} malformed klines",
                    symbol,
                    rows.len() - batch.len()
                );
            }
            let Some(first) = batch.first() else {
                break;
            };
            end_time = Some(first.open_time - 1);
            let exhausted = rows.len() < wanted;
            all.splice(0..0, batch);
            if exhausted {
                break;
            }
        }

        if all.is_empty() {
            bail!("{}: Binance returned no klines", symbol);
        }
        log::debug!(
            "{}: fetched {} {} klines",
            symbol,
            all.len(),
            TimeUtils::interval_to_string(interval_ms)
        );
        Ok(all)
    }
}
