//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the feature catalog (rename table, target, user-overridable features)
//! - the shared calendar-feature derivation
//! - clean table / feature vector / report types

pub mod calendar;
pub mod catalog;
pub mod types;

pub use calendar::*;
pub use catalog::*;
pub use types::*;
