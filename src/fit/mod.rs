//! Training orchestration.
//!
//! Responsibilities:
//!
//! - split the clean table chronologically (`split`)
//! - fit the impute → regress pipeline on the head, evaluate on the tail (`trainer`)

pub mod split;
pub mod trainer;

pub use split::*;
pub use trainer::*;
