//! Reporting utilities: terminal tables for a condition report.

pub mod format;

pub use format::*;
