//! Runtime configuration from environment variables.
//!
//! Read once at startup. Decision-policy overrides let operators retune the
//! threshold and tier cuts without re-exporting the fitted state.

use std::path::PathBuf;

use crate::domain::{DecisionPolicy, FittedState, RiskTierCuts};
use crate::StrokeError;

pub const ARTIFACT_DIR_ENV: &str = "STROKEWATCH_ARTIFACT_DIR";
pub const REQUIRE_MANIFEST_ENV: &str = "STROKEWATCH_REQUIRE_MANIFEST";
pub const THRESHOLD_ENV: &str = "STROKEWATCH_DECISION_THRESHOLD";
pub const HIGH_CUT_ENV: &str = "STROKEWATCH_RISK_HIGH_CUT";
pub const MEDIUM_CUT_ENV: &str = "STROKEWATCH_RISK_MEDIUM_CUT";
pub const WORKERS_ENV: &str = "STROKEWATCH_WORKERS";
pub const LOG_MODE_ENV: &str = "STROKEWATCH_LOG_MODE";
pub const LOG_FILE_ENV: &str = "STROKEWATCH_LOG_FILE";

const DEFAULT_ARTIFACT_DIR: &str = "models";
const DEFAULT_LOG_FILE: &str = "strokewatch.log";

/// Where log output goes. Stdout is reserved for results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File(PathBuf),
}

/// Operator overrides applied on top of the fitted state's policy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolicyOverrides {
    pub threshold: Option<f64>,
    pub high_cut: Option<f64>,
    pub medium_cut: Option<f64>,
}

impl PolicyOverrides {
    /// Resolve the effective policy for `state`.
    ///
    /// # Errors
    /// Returns `StrokeError::Config` if the combined values are out of range
    /// or the cut points are no longer monotonic.
    pub fn resolve(&self, state: &FittedState) -> Result<DecisionPolicy, StrokeError> {
        let base_tiers = state.risk_tiers.unwrap_or_default();
        let tiers = RiskTierCuts {
            high: self.high_cut.unwrap_or(base_tiers.high),
            medium: self.medium_cut.unwrap_or(base_tiers.medium),
        };
        let threshold = self.threshold.unwrap_or_else(|| state.threshold());
        DecisionPolicy::new(threshold, tiers).map_err(StrokeError::Config)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threshold.is_none() && self.high_cut.is_none() && self.medium_cut.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub artifact_dir: PathBuf,
    pub require_manifest: bool,
    pub overrides: PolicyOverrides,
    pub workers: usize,
    pub log_mode: LogMode,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            require_manifest: false,
            overrides: PolicyOverrides::default(),
            workers: default_workers(),
            log_mode: LogMode::Stderr,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

fn parse_probability(name: &str, value: &str) -> Result<f64, StrokeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
        .ok_or_else(|| {
            StrokeError::Config(format!("{name} must be a number in [0, 1], got {value:?}"))
        })
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `StrokeError::Config` for malformed values.
    pub fn from_env() -> Result<Self, StrokeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    /// Returns `StrokeError::Config` for malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StrokeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let artifact_dir = lookup(ARTIFACT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or(defaults.artifact_dir);
        let require_manifest = lookup(REQUIRE_MANIFEST_ENV)
            .map(|v| parse_bool(&v))
            .unwrap_or(defaults.require_manifest);

        let probability = |name: &str| -> Result<Option<f64>, StrokeError> {
            lookup(name)
                .map(|v| parse_probability(name, &v))
                .transpose()
        };
        let overrides = PolicyOverrides {
            threshold: probability(THRESHOLD_ENV)?,
            high_cut: probability(HIGH_CUT_ENV)?,
            medium_cut: probability(MEDIUM_CUT_ENV)?,
        };

        let workers = match lookup(WORKERS_ENV) {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    StrokeError::Config(format!(
                        "{WORKERS_ENV} must be a positive integer, got {v:?}"
                    ))
                })?,
            None => defaults.workers,
        };

        let log_mode = match lookup(LOG_MODE_ENV).as_deref().map(str::trim) {
            None | Some("stderr") => LogMode::Stderr,
            Some("file") => LogMode::File(
                lookup(LOG_FILE_ENV)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            ),
            Some(other) => {
                return Err(StrokeError::Config(format!(
                    "{LOG_MODE_ENV} must be 'stderr' or 'file', got {other:?}"
                )))
            }
        };

        Ok(Self {
            artifact_dir,
            require_manifest,
            overrides,
            workers,
            log_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fitted_state;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.artifact_dir, PathBuf::from("models"));
        assert!(!config.require_manifest);
        assert!(config.overrides.is_empty());
        assert!(config.workers >= 1);
        assert_eq!(config.log_mode, LogMode::Stderr);
    }

    #[test]
    fn test_reads_values() {
        let config = ServiceConfig::from_lookup(lookup(&[
            (ARTIFACT_DIR_ENV, "/srv/artifacts"),
            (REQUIRE_MANIFEST_ENV, "true"),
            (THRESHOLD_ENV, "0.2"),
            (HIGH_CUT_ENV, "0.3"),
            (MEDIUM_CUT_ENV, "0.15"),
            (WORKERS_ENV, "4"),
            (LOG_MODE_ENV, "file"),
            (LOG_FILE_ENV, "/tmp/sw.log"),
        ]))
        .expect("config");
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/artifacts"));
        assert!(config.require_manifest);
        assert_eq!(config.overrides.threshold, Some(0.2));
        assert_eq!(config.workers, 4);
        assert_eq!(config.log_mode, LogMode::File(PathBuf::from("/tmp/sw.log")));
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(ServiceConfig::from_lookup(lookup(&[(THRESHOLD_ENV, "high")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[(HIGH_CUT_ENV, "1.5")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[(WORKERS_ENV, "0")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[(LOG_MODE_ENV, "syslog")])).is_err());
    }

    #[test]
    fn test_overrides_resolve_against_state() {
        let state = fitted_state();
        let policy = PolicyOverrides::default().resolve(&state).expect("policy");
        assert!((policy.threshold() - state.threshold()).abs() < f64::EPSILON);

        let overrides = PolicyOverrides {
            threshold: Some(0.35),
            high_cut: Some(0.3),
            medium_cut: Some(0.15),
        };
        let policy = overrides.resolve(&state).expect("policy");
        assert!((policy.threshold() - 0.35).abs() < f64::EPSILON);
        assert!((policy.tiers().high - 0.3).abs() < f64::EPSILON);

        // Lowering only the high cut below the fitted medium cut breaks monotonicity.
        let overrides = PolicyOverrides {
            high_cut: Some(0.1),
            ..Default::default()
        };
        assert!(matches!(overrides.resolve(&state), Err(StrokeError::Config(_))));
    }
}
