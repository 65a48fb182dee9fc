//! Model port: Trait for the trained binary classifier.
//!
//! The pipeline only needs one thing from a model: the probability of the
//! positive class for an already-encoded feature vector.

/// Error type for model evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Feature count mismatch: model expects {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Feature {index} is not finite")]
    NonFiniteInput { index: usize },

    #[error("Model produced an invalid probability: {0}")]
    InvalidProbability(f64),
}

/// A trained binary classifier.
///
/// Implementations are immutable after loading and are shared across
/// threads, hence `Send + Sync`.
pub trait ProbabilityModel: Send + Sync {
    /// Number of input features the model was trained on.
    fn n_features(&self) -> usize;

    /// Training column names, in input order, when the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Estimated probability of the positive (stroke) class.
    ///
    /// # Errors
    /// Returns `ModelError::ShapeMismatch` if `features.len() != n_features()`.
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError>;
}

impl<M: ProbabilityModel + ?Sized> ProbabilityModel for Box<M> {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn feature_names(&self) -> Option<&[String]> {
        (**self).feature_names()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        (**self).predict_proba(features)
    }
}
