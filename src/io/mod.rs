//! Input/output helpers.
//!
//! - CSV ingest + cleaning (`ingest`)
//! - model artifact read/write (`artifact`)
//! - training report JSON (`report`)
//! - hold-out exports (`export`)

pub mod artifact;
pub mod export;
pub mod ingest;
pub mod report;

pub use artifact::*;
pub use export::*;
pub use ingest::*;
pub use report::*;
