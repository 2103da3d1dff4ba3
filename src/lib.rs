//! `energy-forecast` library crate.
//!
//! The binary (`ef`) is a thin wrapper around this library so that:
//!
//! - the cleaning, training and prediction logic is testable without spawning processes
//! - a future HTTP front end can share the same [`app::context::ServingContext`]
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod predict;
pub mod report;
pub mod scenario;
