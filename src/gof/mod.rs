//! Goodness-of-fit testing.
//!
//! Responsibilities:
//!
//! - compute the discrepancy statistic of a fitted family (`statistic`)
//! - calibrate it by parametric bootstrap into a p-value (`bootstrap`)
//! - early termination of long runs (`cancel`)

pub mod bootstrap;
pub mod cancel;
pub mod statistic;

pub use bootstrap::*;
pub use cancel::CancelToken;
pub use statistic::*;
