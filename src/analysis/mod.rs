// Pure market analysis. Engines own the state, these modules own the maths.
pub mod keyzone_build;
pub mod liquidity_analysis;
pub mod reversal_scoring;
pub mod zone_scoring;

pub use keyzone_build::build_keyzones;
pub use zone_scoring::score_zone;
