//! Adapters layer: Concrete implementations of ports.
//!
//! - `logistic`: exported logistic regression with optional calibration
//! - `artifact_store`: fitted-state and model loading with manifest checks
//! - `sanitize`: PII filtering for logs

pub mod artifact_store;
pub mod logistic;
pub mod sanitize;

pub use artifact_store::{ArtifactBundle, ArtifactStore};
pub use logistic::LogisticModel;
