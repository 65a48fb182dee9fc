//! Application layer: Use cases and services.
//!
//! Orchestrates the domain types and the model port: the preprocessing
//! pipeline, the risk classifier, the prediction service, and batch scoring.

pub mod analytics;
pub mod batch;
pub mod classifier;
pub mod preprocessing;
mod service;

pub use analytics::BatchSummary;
pub use batch::{BatchProgress, BatchWorker, BatchWorkerHandle};
pub use service::{check_schema, LoadedArtifacts, PredictionService};
