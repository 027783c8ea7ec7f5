//! Binance-specific configuration constants and types.

/// Configuration for Binance REST API client
/// (This is the runtime struct used by the Http Client)
pub struct BinanceApiConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

impl Default for BinanceApiConfig {
    fn default() -> Self {
        Self {
            timeout_ms: BINANCE.client.timeout_ms,
            retries: BINANCE.client.retries,
            backoff_ms: BINANCE.client.backoff_ms,
        }
    }
}

/// Configuration for REST API Limits
pub struct RestLimits {
    /// Default limit for number of klines returned in a single request
    pub klines_limit: i32,
    /// Number of levels requested per side on an order book snapshot
    pub depth_limit: i32,
}

/// Configuration for the diff-depth WebSocket connection
pub struct WsConfig {
    /// WebSocket base URL for Binance streaming API (single stream)
    pub base_url: &'static str,
    /// Stream suffix appended to the lowercase symbol
    pub depth_stream_suffix: &'static str,
    /// Delay before a reconnect attempt (seconds)
    pub reconnect_delay_sec: u64,
    /// Silence after which the health check forces a reconnect (seconds)
    pub silence_limit_sec: u64,
    /// How often the health check runs (seconds)
    pub health_check_interval_sec: u64,
}

/// Default values for the Rest Client
pub struct ClientDefaults {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
}

/// Retry policy applied around snapshot fetches by the scheduler
pub struct SnapshotRetry {
    pub attempts: u32,
    pub delay_ms: u64,
}

/// The Master Configuration Struct
pub struct BinanceConfig {
    pub limits: RestLimits,
    pub ws: WsConfig,
    pub client: ClientDefaults,
    pub snapshot_retry: SnapshotRetry,
}

pub const BINANCE: BinanceConfig = BinanceConfig {
    limits: RestLimits {
        klines_limit: 1000,
        depth_limit: 5000,
    },
    ws: WsConfig {
        base_url: "wss://stream.binance.com:9443/ws",
        depth_stream_suffix: "@depth@100ms",
        reconnect_delay_sec: 3,
        silence_limit_sec: 30,
        health_check_interval_sec: 10,
    },
    client: ClientDefaults {
        timeout_ms: 5000,
        retries: 5,
        backoff_ms: 5000,
    },
    snapshot_retry: SnapshotRetry {
        attempts: 3,
        delay_ms: 1500,
    },
};
