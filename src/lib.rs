//! Shopsight Analytics Core
//!
//! Acquires a versioned analytical dataset artifact (a single SQLite
//! snapshot published through a release registry) and computes ecommerce
//! metrics over it: revenue overview, customer cohorts/LTV/retention,
//! returns & review quality, and marketing ROI.
//!
//! The presentation layer lives elsewhere; everything exposed here is
//! plain tabular data.

pub mod acquire;
pub mod analytics;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod registry;
