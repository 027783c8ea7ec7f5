// Shared Binance REST client setup and error reporting.
use anyhow::Result;
use binance_sdk::config::ConfigurationRestApi;
use binance_sdk::errors::{self, ConnectorError};
use binance_sdk::spot::{SpotRestApi, rest_api::RestApi};

use crate::config::BinanceApiConfig;

pub fn configure_binance_client() -> Result<RestApi> {
    let config = BinanceApiConfig::default();
    let rest_conf = ConfigurationRestApi::builder()
        .timeout(config.timeout_ms)
        .retries(config.retries)
        .backoff(config.backoff_ms)
        .build()?;
    Ok(SpotRestApi::production(rest_conf))
}

/// Logs the connector failure behind `e` and wraps it with `what`.
pub fn report_connector_error(e: anyhow::Error, what: &str) -> anyhow::Error {
    match e.downcast_ref::<errors::ConnectorError>() {
        Some(ConnectorError::TooManyRequestsError(msg)) => {
            log::error!("{} Rate limit exceeded. Please wait and try again. {}", what, msg);
        }
        Some(ConnectorError::RateLimitBanError(msg)) => {
            log::error!("{} IP address banned due to excessive rate limits. {}", what, msg);
        }
        Some(ConnectorError::ServerError { msg, status_code }) => {
            log::error!("{} Server error: {} (status code: {:?})", what, msg, status_code);
        }
        Some(ConnectorError::NetworkError(msg)) => {
            log::error!("{} Network error: Check your internet connection. {}", what, msg);
        }
        Some(other) => log::error!("{} Binance API error: {:?}", what, other),
        None => log::error!("An unexpected error occurred for {}: {:#}", what, e),
    }
    e.context(format!("Binance API call failed for {}", what))
}
