// Domain models produced by the engines.
// These modules hold data only; the algorithms live in `analysis` and `engine`.

pub mod keyzone;
pub mod liquidity;
pub mod reversal;

// Re-export key types for convenience
pub use keyzone::{
    KeyZone, KeyZoneEvent, KeyZoneKind, KeyZoneReversal, KeyZonesState, MinifiedKeyZone,
};
pub use liquidity::{
    LiquidityBuild, LiquidityFullState, LiquidityPeaks, LiquidityPriceLevel, LiquiditySideBuild,
    MinifiedLiquidityState, PeakRange,
};
pub use reversal::{
    MinifiedReversalState, ReversalCoinsStates, ReversalKind, ReversalRecord, ReversalScores,
    ReversalSignal, ReversalState,
};
