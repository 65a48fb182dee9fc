//! Domain layer: Core types for stroke-risk inference.
//!
//! Pure Rust types with no I/O. Every categorical vocabulary is a closed
//! enum and every fitted artifact is validated before use.

mod artifacts;
pub mod binning;
mod error;
mod features;
mod patient;
mod prediction;

pub use artifacts::{
    ArtifactError, CategoricalFill, FittedState, NumericColumns, ScalerParams,
};
pub use binning::{AgeGroup, BmiCategory};
pub use error::ValidationError;
pub use features::{FeatureColumn, FeatureVector};
pub use patient::{
    Categorical, EverMarried, FlagInput, Gender, LabelInput, NumericInput, RawPatientRecord,
    ResidenceType, SmokingStatus, WorkType,
};
pub use prediction::{
    DecisionPolicy, ErrorResponse, HealthStatus, PredictionResponse, PredictionResult, RiskLevel,
    RiskTierCuts, DEFAULT_THRESHOLD,
};
