//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the closed set of copula families (`CopulaFamily`) and statistic kinds
//! - pseudo-observations (`PseudoObservations`)
//! - fit / GoF outputs (`FamilyOutcome`, `FittedCopula`, `GofResult`, etc.)
//! - the condition-level configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;
