//! # Adrelay Pipeline
//!
//! Generic provisioning engine driven by per-platform step tables.

pub mod engine;
pub mod executor;
pub mod steps;

pub use engine::Pipeline;
pub use executor::StepExecutor;
pub use steps::{StepDef, StepTable};
