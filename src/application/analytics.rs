//! Aggregate statistics over a scored batch.
//!
//! Counts are exact. Only outcome fields are recorded, never record content.

use serde::Serialize;

use crate::domain::{PredictionResponse, RiskLevel};

/// Summary of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Records submitted
    pub total: usize,
    /// Records that produced a prediction
    pub scored: usize,
    /// Records refused (validation or model failure)
    pub rejected: usize,
    /// Scored records with `prediction = 1`
    pub positives: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Mean probability over scored records, if any
    pub mean_probability: Option<f64>,
    #[serde(skip)]
    probability_sum: f64,
}

impl BatchSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one successful prediction.
    pub fn record_scored(&mut self, response: &PredictionResponse) {
        self.total += 1;
        self.scored += 1;
        if response.prediction == 1 {
            self.positives += 1;
        }
        match response.risk_level {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
        self.probability_sum += response.probability;
        #[allow(clippy::cast_precision_loss)]
        let mean = self.probability_sum / self.scored as f64;
        self.mean_probability = Some(mean);
    }

    pub fn record_rejected(&mut self) {
        self.total += 1;
        self.rejected += 1;
    }

    /// Share of scored records predicted positive.
    #[must_use]
    pub fn positive_rate(&self) -> f64 {
        if self.scored == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.positives as f64 / self.scored as f64;
        rate
    }

    #[must_use]
    pub fn count_for(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }
}
