//! `copula-gof` library crate.
//!
//! Selects a bivariate copula family for paired scores by AIC and checks the
//! fit with a parametric-bootstrap goodness-of-fit test.
//!
//! The binary (`cgof`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the engine can be driven from batch jobs over many conditions

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod gof;
pub mod io;
pub mod math;
pub mod models;
pub mod report;

pub use domain::{AnalysisConfig, ConditionReport, CopulaFamily, StatisticKind};
pub use engine::analyze;
pub use error::{CopulaError, CopulaResult};
