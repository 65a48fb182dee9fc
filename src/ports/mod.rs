//! Ports layer: Trait definitions for external operations.
//!
//! The trained classifier is the only external collaborator the pipeline
//! calls after startup.

mod model;

pub use model::{ModelError, ProbabilityModel};
