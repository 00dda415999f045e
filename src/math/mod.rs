//! Mathematical utilities: rank transform, special functions, bounded
//! optimization and dominance counting.

pub mod dominance;
pub mod optimize;
pub mod ranks;
pub mod special;

pub use dominance::*;
pub use optimize::*;
pub use ranks::*;
pub use special::*;
