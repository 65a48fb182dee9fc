//! Logistic adapter: `ProbabilityModel` backed by exported logistic regression.
//!
//! The training pipeline exports the fitted coefficients as JSON, optionally
//! with an isotonic calibration table mapping raw sigmoid output to
//! calibrated probability.

use serde::{Deserialize, Serialize};

use crate::domain::{ArtifactError, FeatureColumn};
use crate::ports::{ModelError, ProbabilityModel};

/// Upper bound on model width; the pipeline cannot produce more columns.
const MAX_FEATURES: usize = FeatureColumn::TRAINING_ORDER.len();

/// Model parameters exported by the training pipeline (`model.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedLogisticModel {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub calibration: Option<IsotonicCalibration>,
}

/// Isotonic calibration breakpoints, interpolated piecewise-linearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsotonicCalibration {
    /// Raw probability breakpoints, strictly increasing
    pub x: Vec<f64>,
    /// Calibrated probability at each breakpoint, non-decreasing in [0, 1]
    pub y: Vec<f64>,
}

impl IsotonicCalibration {
    fn validate(&self) -> Result<(), ArtifactError> {
        if self.x.len() < 2 || self.x.len() != self.y.len() {
            return Err(ArtifactError::Invalid(format!(
                "Calibration needs >= 2 breakpoints with matching x/y lengths (x={}, y={})",
                self.x.len(),
                self.y.len()
            )));
        }
        if self.x.iter().any(|v| !v.is_finite()) || self.x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ArtifactError::Invalid(
                "Calibration x must be finite and strictly increasing".into(),
            ));
        }
        if self.y.iter().any(|v| !(0.0..=1.0).contains(v)) || self.y.windows(2).any(|w| w[1] < w[0])
        {
            return Err(ArtifactError::Invalid(
                "Calibration y must lie in [0, 1] and be non-decreasing".into(),
            ));
        }
        Ok(())
    }

    /// Map a raw probability through the table, clamping outside the breakpoints.
    #[must_use]
    pub fn apply(&self, p: f64) -> f64 {
        let last = self.x.len() - 1;
        if p <= self.x[0] {
            return self.y[0];
        }
        if p >= self.x[last] {
            return self.y[last];
        }
        // First breakpoint strictly greater than p; always in 1..=last here.
        let hi = self.x.partition_point(|&x| x <= p);
        let lo = hi - 1;
        let t = (p - self.x[lo]) / (self.x[hi] - self.x[lo]);
        self.y[lo] + t * (self.y[hi] - self.y[lo])
    }
}

/// Logistic regression model with optional calibration.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    params: ExportedLogisticModel,
}

impl LogisticModel {
    /// Validate exported parameters and build the model.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` on inconsistent lengths, non-finite
    /// weights, or a malformed calibration table.
    pub fn from_exported(params: ExportedLogisticModel) -> Result<Self, ArtifactError> {
        let n = params.feature_names.len();
        if n == 0 || n > MAX_FEATURES {
            return Err(ArtifactError::Invalid(format!(
                "Invalid feature count in model: got {n}, max {MAX_FEATURES}"
            )));
        }
        if params.coefficients.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "Model has {} coefficients for {n} feature names",
                params.coefficients.len()
            )));
        }
        if !params.intercept.is_finite() || params.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactError::Invalid(
                "Model coefficients and intercept must be finite".into(),
            ));
        }
        if let Some(calibration) = &params.calibration {
            calibration.validate()?;
        }

        tracing::debug!(
            "Built logistic model (n_features={}, calibrated={})",
            n,
            params.calibration.is_some()
        );
        Ok(Self { params })
    }

    fn sigmoid(x: f64) -> f64 {
        if x >= 0.0 {
            1.0 / (1.0 + (-x).exp())
        } else {
            let e = x.exp();
            e / (1.0 + e)
        }
    }
}

impl ProbabilityModel for LogisticModel {
    fn n_features(&self) -> usize {
        self.params.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        Some(&self.params.feature_names)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        let expected = self.n_features();
        if features.len() != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteInput { index });
        }

        let logit = self.params.intercept
            + features
                .iter()
                .zip(&self.params.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>();
        let raw = Self::sigmoid(logit);
        let probability = match &self.params.calibration {
            Some(calibration) => calibration.apply(raw),
            None => raw,
        };

        if !(0.0..=1.0).contains(&probability) {
            return Err(ModelError::InvalidProbability(probability));
        }
        tracing::trace!("logit={:.4} raw={:.4} calibrated={:.4}", logit, raw, probability);
        Ok(probability)
    }
}
