// Exchange sources, the depth stream and durable storage
pub mod binance_client;
pub mod candlesticks;
pub mod order_book_rest;
pub mod order_book_stream;
pub mod store;

// Re-export commonly used types
pub use candlesticks::{BinanceCandlesticks, CandlestickSource};
pub use order_book_rest::{BinanceOrderBook, OrderBookSource};
pub use order_book_stream::{ConnectionStatus, OrderBookStream, RawOrderBook};
pub use store::{FileStore, Store};
