//! Fitted preprocessing state produced by the offline training run.
//!
//! Loaded once at startup, validated, then shared read-only by every request.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::binning::{AgeGroup, BmiCategory};
use super::features::FeatureColumn;
use super::patient::SmokingStatus;
use super::prediction::{DecisionPolicy, RiskTierCuts, DEFAULT_THRESHOLD};

/// Error type for artifact loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid artifact: {0}")]
    Invalid(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),
}

/// One value per numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericColumns {
    pub age: f64,
    pub avg_glucose_level: f64,
    pub bmi: f64,
}

impl NumericColumns {
    fn named(&self) -> [(&'static str, f64); 3] {
        [
            ("age", self.age),
            ("avg_glucose_level", self.avg_glucose_level),
            ("bmi", self.bmi),
        ]
    }
}

/// Fill value for the nullable categorical column (fitted mode).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFill {
    pub smoking_status: SmokingStatus,
}

/// Standard scaler parameters: `(x - mean) / scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: NumericColumns,
    pub scale: NumericColumns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedState {
    /// Numeric imputer statistics (fill values for missing numerics)
    pub imputer_num: NumericColumns,

    /// Categorical imputer statistics
    pub imputer_cat: CategoricalFill,

    pub scaler: ScalerParams,

    /// Columns the model expects, in order
    pub feature_columns: Vec<FeatureColumn>,

    /// Tuned decision threshold; `None` means 0.5
    #[serde(default)]
    pub optimal_threshold: Option<f64>,

    /// Tier cut points; `None` means HIGH > 0.7, MEDIUM > 0.4
    #[serde(default)]
    pub risk_tiers: Option<RiskTierCuts>,
}

impl FittedState {
    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        for (name, fill) in self.imputer_num.named() {
            if !fill.is_finite() {
                return Err(ArtifactError::Invalid(format!(
                    "Imputer fill for '{name}' is not finite"
                )));
            }
        }
        if AgeGroup::from_age(self.imputer_num.age).is_none() {
            return Err(ArtifactError::Invalid(format!(
                "Imputer fill for 'age' ({}) is outside the age_group range {}",
                self.imputer_num.age,
                AgeGroup::RANGE
            )));
        }
        if BmiCategory::from_bmi(self.imputer_num.bmi).is_none() {
            return Err(ArtifactError::Invalid(format!(
                "Imputer fill for 'bmi' ({}) is outside the bmi_category range {}",
                self.imputer_num.bmi,
                BmiCategory::RANGE
            )));
        }

        for ((name, mean), (_, scale)) in self
            .scaler
            .mean
            .named()
            .into_iter()
            .zip(self.scaler.scale.named())
        {
            if !mean.is_finite() {
                return Err(ArtifactError::Invalid(format!(
                    "Scaler mean for '{name}' is not finite"
                )));
            }
            if !scale.is_finite() || scale == 0.0 {
                return Err(ArtifactError::Invalid(format!(
                    "Scaler scale for '{name}' must be finite and non-zero, got {scale}"
                )));
            }
        }

        if self.feature_columns.is_empty() {
            return Err(ArtifactError::Invalid("feature_columns is empty".into()));
        }
        let mut seen = HashSet::new();
        for column in &self.feature_columns {
            if !seen.insert(*column) {
                return Err(ArtifactError::Invalid(format!(
                    "Duplicate feature column '{column}'"
                )));
            }
        }

        self.decision_policy().map(|_| ())
    }

    /// Decision threshold with the 0.5 default applied.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.optimal_threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    /// Build the decision policy carried by this state.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if the threshold or cut points are out of range.
    pub fn decision_policy(&self) -> Result<DecisionPolicy, ArtifactError> {
        DecisionPolicy::new(self.threshold(), self.risk_tiers.unwrap_or_default())
            .map_err(ArtifactError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fitted_state;

    #[test]
    fn test_fixture_is_valid() {
        fitted_state().validate().expect("fixture should validate");
    }

    #[test]
    fn test_threshold_defaults_to_half() {
        let mut state = fitted_state();
        state.optimal_threshold = None;
        assert!((state.threshold() - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            state.decision_policy().expect("valid").tiers(),
            RiskTierCuts::default()
        );
    }

    #[test]
    fn test_rejects_zero_scale() {
        let mut state = fitted_state();
        state.scaler.scale.bmi = 0.0;
        assert!(matches!(state.validate(), Err(ArtifactError::Invalid(_))));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let mut state = fitted_state();
        state.feature_columns.push(FeatureColumn::Age);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_rejects_non_monotonic_tiers() {
        let mut state = fitted_state();
        state.risk_tiers = Some(RiskTierCuts {
            high: 0.2,
            medium: 0.6,
        });
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_rejects_unbinnable_age_fill() {
        let mut state = fitted_state();
        state.imputer_num.age = 0.0;
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_parses_training_export() {
        let json = r#"{
            "imputer_num": {"age": 43.2, "avg_glucose_level": 106.1, "bmi": 28.9},
            "imputer_cat": {"smoking_status": "never smoked"},
            "scaler": {
                "mean": {"age": 43.2, "avg_glucose_level": 106.1, "bmi": 28.9},
                "scale": {"age": 22.6, "avg_glucose_level": 45.3, "bmi": 7.7}
            },
            "feature_columns": ["gender", "age", "bmi"]
        }"#;
        let state: FittedState = serde_json::from_str(json).expect("parse");
        assert_eq!(state.imputer_cat.smoking_status, SmokingStatus::NeverSmoked);
        assert_eq!(state.optimal_threshold, None);
        assert_eq!(state.feature_columns.len(), 3);
        state.validate().expect("valid");
    }
}
