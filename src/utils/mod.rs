pub mod maths_utils;
pub mod retry;
pub mod state_utils;
pub mod time_utils;

pub use time_utils::TimeUtils;
