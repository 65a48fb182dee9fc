//! Prediction service: readiness, prediction and health.
//!
//! Artifacts are loaded once by an explicit initialization step. A failed
//! load leaves the service in an unavailable state instead of aborting the
//! process, so callers can observe the degraded state through `health()`.
//! Every request shares the same immutable artifacts behind an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{classifier, preprocessing};
use crate::adapters::artifact_store::ArtifactStore;
use crate::adapters::logistic::LogisticModel;
use crate::config::{PolicyOverrides, ServiceConfig};
use crate::domain::{
    ArtifactError, DecisionPolicy, FeatureVector, FittedState, HealthStatus, PredictionResponse,
    RawPatientRecord,
};
use crate::ports::ProbabilityModel;
use crate::StrokeError;

/// Immutable serving artifacts.
#[derive(Debug)]
pub struct LoadedArtifacts<M> {
    pub state: FittedState,
    pub model: M,
    pub policy: DecisionPolicy,
    pub fingerprint: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug)]
enum Readiness<M> {
    Ready(Arc<LoadedArtifacts<M>>),
    Unavailable { reason: String },
}

/// Verify that the model consumes exactly the columns the pipeline produces.
///
/// # Errors
/// Returns `ArtifactError::SchemaMismatch` on a width or column-name mismatch.
pub fn check_schema<M>(state: &FittedState, model: &M) -> Result<(), ArtifactError>
where
    M: ProbabilityModel + ?Sized,
{
    let columns = state.feature_columns.len();
    if model.n_features() != columns {
        return Err(ArtifactError::SchemaMismatch(format!(
            "Model expects {} features, fitted state lists {columns}",
            model.n_features()
        )));
    }
    if let Some(names) = model.feature_names() {
        for (i, (name, column)) in names.iter().zip(&state.feature_columns).enumerate() {
            if name != column.name() {
                return Err(ArtifactError::SchemaMismatch(format!(
                    "Column {i}: model was trained on '{name}', fitted state lists '{column}'"
                )));
            }
        }
    }
    Ok(())
}

/// Service answering `predict` for the form and HTTP callers.
#[derive(Debug)]
pub struct PredictionService<M>
where
    M: ProbabilityModel,
{
    readiness: Readiness<M>,
}

impl PredictionService<LogisticModel> {
    /// Load artifacts as configured. Never fails: a load error yields an
    /// unavailable service that reports the reason through `health()`.
    #[must_use]
    pub fn initialize(config: &ServiceConfig) -> Self {
        tracing::info!(
            "Initializing prediction service from {:?}...",
            config.artifact_dir
        );

        let store = ArtifactStore::new(&config.artifact_dir, config.require_manifest);
        let loaded = store.load().map_err(StrokeError::from).and_then(|bundle| {
            Self::build(
                bundle.state,
                bundle.model,
                &config.overrides,
                Some(bundle.fingerprint),
            )
        });

        match loaded {
            Ok(service) => service,
            Err(e) => {
                tracing::error!("Failed to load artifacts: {e}");
                Self::unavailable(e.to_string())
            }
        }
    }
}

impl<M> PredictionService<M>
where
    M: ProbabilityModel,
{
    /// Build a ready service from already-loaded parts.
    ///
    /// # Errors
    /// Returns error if the fitted state is invalid, the overrides produce an
    /// invalid policy, or the model does not match the feature columns.
    pub fn from_parts(
        state: FittedState,
        model: M,
        overrides: &PolicyOverrides,
    ) -> Result<Self, StrokeError> {
        Self::build(state, model, overrides, None)
    }

    fn build(
        state: FittedState,
        model: M,
        overrides: &PolicyOverrides,
        fingerprint: Option<String>,
    ) -> Result<Self, StrokeError> {
        state.validate()?;
        check_schema(&state, &model)?;
        let policy = overrides.resolve(&state)?;
        if !overrides.is_empty() {
            tracing::info!(
                "Decision policy overridden: threshold={}, high>{}, medium>{}",
                policy.threshold(),
                policy.tiers().high,
                policy.tiers().medium
            );
        }

        tracing::info!(
            "Prediction service ready (n_features={}, threshold={})",
            state.feature_columns.len(),
            policy.threshold()
        );
        Ok(Self {
            readiness: Readiness::Ready(Arc::new(LoadedArtifacts {
                state,
                model,
                policy,
                fingerprint,
                loaded_at: Utc::now(),
            })),
        })
    }

    /// A service that refuses every request with `reason`.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            readiness: Readiness::Unavailable {
                reason: reason.into(),
            },
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready(_))
    }

    /// Shared handle to the loaded artifacts.
    ///
    /// # Errors
    /// Returns `StrokeError::ServiceUnavailable` if loading failed.
    pub fn artifacts(&self) -> Result<Arc<LoadedArtifacts<M>>, StrokeError> {
        match &self.readiness {
            Readiness::Ready(artifacts) => Ok(Arc::clone(artifacts)),
            Readiness::Unavailable { reason } => {
                Err(StrokeError::ServiceUnavailable(reason.clone()))
            }
        }
    }

    /// Run only the preprocessing pipeline.
    ///
    /// # Errors
    /// Returns `ServiceUnavailable` or `Validation`.
    pub fn transform(&self, record: &RawPatientRecord) -> Result<FeatureVector, StrokeError> {
        let artifacts = self.artifacts()?;
        Ok(preprocessing::transform(record, &artifacts.state)?)
    }

    /// Score one raw record.
    ///
    /// # Errors
    /// - `ServiceUnavailable` if artifacts failed to load
    /// - `Validation` if the record is rejected
    /// - `Model` on a pipeline/model schema mismatch
    pub fn predict(&self, record: &RawPatientRecord) -> Result<PredictionResponse, StrokeError> {
        let artifacts = self.artifacts()?;

        let features = preprocessing::transform(record, &artifacts.state).map_err(|e| {
            tracing::info!("Rejected record: {} on field '{}'", e.reason(), e.field());
            e
        })?;
        let result = classifier::classify(&features, &artifacts.model, &artifacts.policy)
            .map_err(|e| {
                tracing::error!("Model evaluation failed: {e}");
                e
            })?;

        tracing::info!(
            "Prediction complete: prediction={}, probability={:.4}, risk={}",
            result.prediction,
            result.probability,
            result.risk_level
        );
        Ok(PredictionResponse::new(result, artifacts.policy.threshold()))
    }

    #[must_use]
    pub fn health(&self) -> HealthStatus {
        match &self.readiness {
            Readiness::Ready(artifacts) => HealthStatus {
                status: "healthy".to_string(),
                model_loaded: true,
                reason: None,
                threshold: Some(artifacts.policy.threshold()),
                risk_tiers: Some(artifacts.policy.tiers()),
                artifact_fingerprint: artifacts.fingerprint.clone(),
                loaded_at: Some(artifacts.loaded_at),
            },
            Readiness::Unavailable { reason } => HealthStatus {
                status: "unhealthy".to_string(),
                model_loaded: false,
                reason: Some(reason.clone()),
                threshold: None,
                risk_tiers: None,
                artifact_fingerprint: None,
                loaded_at: None,
            },
        }
    }
}
