//! Copula fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit one family on pseudo-observations (`fitter`)
//! - rank successful fits and pick the best family by AIC (`selection`)

pub mod fitter;
pub mod selection;

pub use fitter::*;
pub use selection::*;
