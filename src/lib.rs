//! # Strokewatch
//!
//! Stroke-risk inference from a previously trained binary classifier.
//!
//! This crate provides:
//! - The training-faithful preprocessing pipeline (imputation, binning,
//!   scaling, categorical encoding, column ordering)
//! - Threshold-based risk classification with independent risk tiers
//! - A prediction service with explicit readiness for form and HTTP callers
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (patient record, vocabularies, fitted state, results)
//! - `ports`: Trait definitions for external collaborators (the model)
//! - `adapters`: Concrete implementations (logistic model, artifact store, log sanitizing)
//! - `application`: Use cases (pipeline, classifier, service, batch scoring)
//! - `config`: Environment-driven runtime configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use application::PredictionService;
pub use domain::{PredictionResponse, PredictionResult, RawPatientRecord, RiskLevel};

/// Result type for Strokewatch operations
pub type Result<T> = std::result::Result<T, StrokeError>;

/// Main error type for Strokewatch
#[derive(Debug, thiserror::Error)]
pub enum StrokeError {
    #[error("Invalid input: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Artifact error: {0}")]
    Artifact(#[from] domain::ArtifactError),

    #[error("Model computation failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error class, for callers that render errors over a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; the caller should fix the request
    InvalidInput,
    /// Artifacts or configuration failed to load; the service is not ready
    Unavailable,
    /// Schema mismatch between pipeline and artifacts, or another internal fault
    Internal,
}

impl StrokeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Serialization(_) => ErrorKind::InvalidInput,
            Self::ServiceUnavailable(_) | Self::Artifact(_) | Self::Config(_) => {
                ErrorKind::Unavailable
            }
            Self::Model(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status an API layer should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    #[must_use]
    pub fn to_response(&self) -> domain::ErrorResponse {
        let error = match self.kind() {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Unavailable => "service_unavailable",
            ErrorKind::Internal => "internal",
        };
        domain::ErrorResponse {
            success: false,
            error: error.to_string(),
            detail: self.to_string(),
        }
    }
}
