//! Debugging feature flags.
//!
//! Toggle individual diagnostics here; keep them `false` by default so debug
//! builds remain readable.

pub struct DebugFlags {
    /// Emit every applied/dropped order book delta.
    pub print_liquidity_stream_updates: bool,
    /// Emit zone counts and merge results after each KeyZone build.
    pub print_keyzone_build: bool,
    /// Emit per-tick reversal scores.
    pub print_reversal_scores: bool,
    /// Emit store reads/writes.
    pub print_store_events: bool,
}

pub const DEBUG_FLAGS: DebugFlags = DebugFlags {
    print_liquidity_stream_updates: false,
    print_keyzone_build: true,
    print_reversal_scores: false,
    print_store_events: false,
};
