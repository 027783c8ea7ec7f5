// Stateful engines and the tick orchestrator
pub mod core;
pub mod keyzones;
pub mod liquidity;
pub mod reversal;
pub mod scheduler;

// Re-export key components
pub use core::{MarketState, MarketStateEngine};
pub use keyzones::KeyZonesEngine;
pub use liquidity::LiquidityEngine;
pub use reversal::ReversalEngine;
pub use scheduler::GuardedTask;
