// Domain types and value objects
pub mod candle;
pub mod coin_state;
pub mod order_book;
pub mod state;

// Re-export commonly used types
pub use candle::Candlestick;
pub use coin_state::{CoinSplitState, CompressedCoinState, CompressedCoinsStates};
pub use order_book::{BookSide, OrderBookDelta, OrderBookSnapshot, RawPriceLevel};
pub use state::{SplitRange, SplitState, StateType};
