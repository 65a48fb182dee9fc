//! Prediction result types.
//!
//! Two independent decisions are made from one probability: the binary
//! `prediction` (decision threshold) and the presentation `risk_level`
//! (tier cut points). A record can be `prediction = 0` and still show
//! MEDIUM risk; both signals are consumed separately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default decision threshold when the fitted state carries none.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Three-tier presentation risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Display color (hex) used by the dashboard and the HTTP response.
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#16a34a",
            Self::Medium => "#ea580c",
            Self::High => "#dc2626",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Cut points for the risk tiers: `> high` is HIGH, `> medium` is MEDIUM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTierCuts {
    pub high: f64,
    pub medium: f64,
}

impl Default for RiskTierCuts {
    fn default() -> Self {
        Self {
            high: 0.7,
            medium: 0.4,
        }
    }
}

impl RiskTierCuts {
    /// # Errors
    /// Returns error if a cut is outside [0, 1] or `high < medium`.
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [("high", self.high), ("medium", self.medium)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("Risk tier cut '{name}' = {v} must be within [0, 1]"));
            }
        }
        if self.high < self.medium {
            return Err(format!(
                "Risk tier cuts must be monotonic: high ({}) < medium ({})",
                self.high, self.medium
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn tier(&self, probability: f64) -> RiskLevel {
        if probability > self.high {
            RiskLevel::High
        } else if probability > self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Decision threshold plus tier cuts, validated once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecisionPolicy {
    threshold: f64,
    tiers: RiskTierCuts,
}

impl DecisionPolicy {
    /// # Errors
    /// Returns error if the threshold is outside [0, 1] or the tier cuts are invalid.
    pub fn new(threshold: f64, tiers: RiskTierCuts) -> Result<Self, String> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(format!(
                "Decision threshold {threshold} must be within [0, 1]"
            ));
        }
        tiers.validate()?;
        Ok(Self { threshold, tiers })
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn tiers(&self) -> RiskTierCuts {
        self.tiers
    }

    /// Binary prediction: `1` iff `probability > threshold`.
    #[must_use]
    pub fn decide(&self, probability: f64) -> u8 {
        u8::from(probability > self.threshold)
    }

    #[must_use]
    pub fn risk_level(&self, probability: f64) -> RiskLevel {
        self.tiers.tier(probability)
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            tiers: RiskTierCuts::default(),
        }
    }
}

/// Output of the risk classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Probability of the positive (stroke) class, in [0, 1]
    pub probability: f64,

    /// 1 if `probability > threshold`, else 0
    pub prediction: u8,

    pub risk_level: RiskLevel,
}

/// Success body of the predict endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: u8,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub risk_color: String,
    pub threshold_used: f64,
}

impl PredictionResponse {
    #[must_use]
    pub fn new(result: PredictionResult, threshold_used: f64) -> Self {
        Self {
            success: true,
            prediction: result.prediction,
            probability: result.probability,
            risk_level: result.risk_level,
            risk_color: result.risk_level.color().to_string(),
            threshold_used,
        }
    }
}

/// Failure body of the predict endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// Short error class: `invalid_input`, `service_unavailable`, `internal`
    pub error: String,
    pub detail: String,
}

/// Readiness report for the health endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `healthy` or `unhealthy`
    pub status: String,
    pub model_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tiers: Option<RiskTierCuts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.model_loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_from_probability() {
        let tiers = RiskTierCuts::default();
        assert_eq!(tiers.tier(0.1), RiskLevel::Low);
        assert_eq!(tiers.tier(0.4), RiskLevel::Low);
        assert_eq!(tiers.tier(0.41), RiskLevel::Medium);
        assert_eq!(tiers.tier(0.7), RiskLevel::Medium);
        assert_eq!(tiers.tier(0.85), RiskLevel::High);
    }

    #[test]
    fn test_decide_is_strictly_greater() {
        let policy = DecisionPolicy::new(0.2, RiskTierCuts::default()).expect("valid");
        assert_eq!(policy.decide(0.2), 0);
        assert_eq!(policy.decide(0.200_001), 1);
        assert_eq!(DecisionPolicy::default().threshold(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_policy_validation() {
        assert!(DecisionPolicy::new(1.5, RiskTierCuts::default()).is_err());
        assert!(DecisionPolicy::new(-0.1, RiskTierCuts::default()).is_err());

        let inverted = RiskTierCuts {
            high: 0.3,
            medium: 0.5,
        };
        assert!(DecisionPolicy::new(0.5, inverted).is_err());

        // Client-facing variant with lower cuts is valid.
        let friendly = RiskTierCuts {
            high: 0.3,
            medium: 0.15,
        };
        assert!(DecisionPolicy::new(0.2, friendly).is_ok());
    }

    #[test]
    fn test_response_shape() {
        let result = PredictionResult {
            probability: 0.85,
            prediction: 1,
            risk_level: RiskLevel::High,
        };
        let json = serde_json::to_value(PredictionResponse::new(result, 0.2)).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["prediction"], 1);
        assert_eq!(json["risk_level"], "HIGH");
        assert_eq!(json["risk_color"], "#dc2626");
        assert_eq!(json["threshold_used"], 0.2);
    }
}
