//! Risk classifier: probability -> binary prediction and risk tier.

use crate::domain::{DecisionPolicy, FeatureVector, PredictionResult};
use crate::ports::{ModelError, ProbabilityModel};

/// Score `features` and apply `policy`.
///
/// The binary decision and the tier are computed independently from the
/// same probability.
///
/// # Errors
/// Returns `ModelError` if the vector does not fit the model or the model
/// yields a probability outside [0, 1].
pub fn classify<M>(
    features: &FeatureVector,
    model: &M,
    policy: &DecisionPolicy,
) -> Result<PredictionResult, ModelError>
where
    M: ProbabilityModel + ?Sized,
{
    let expected = model.n_features();
    if features.len() != expected {
        return Err(ModelError::ShapeMismatch {
            expected,
            actual: features.len(),
        });
    }

    let probability = model.predict_proba(features.values())?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(ModelError::InvalidProbability(probability));
    }

    Ok(PredictionResult {
        probability,
        prediction: policy.decide(probability),
        risk_level: policy.risk_level(probability),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureColumn, RiskLevel, RiskTierCuts};
    use crate::test_support::StubModel;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn features(n: usize) -> FeatureVector {
        FeatureColumn::TRAINING_ORDER
            .iter()
            .take(n)
            .map(|&c| (c, 0.0))
            .collect()
    }

    fn policy(threshold: f64) -> DecisionPolicy {
        DecisionPolicy::new(threshold, RiskTierCuts::default()).expect("valid policy")
    }

    #[test]
    fn test_prediction_above_threshold_but_low_tier() {
        // 0.25 > 0.2 threshold, but well under the 0.4 MEDIUM cut.
        let result = classify(&features(12), &StubModel::new(0.25, 12), &policy(0.2))
            .expect("classify");
        assert_eq!(result.prediction, 1);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_negative_prediction_but_medium_tier() {
        // 0.55 <= 0.6 threshold, yet above the 0.4 MEDIUM cut.
        let result = classify(&features(12), &StubModel::new(0.55, 12), &policy(0.6))
            .expect("classify");
        assert_eq!(result.prediction, 0);
        assert_eq!(result.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_raising_threshold_never_flips_to_positive() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for _ in 0..500 {
            let p: f64 = rng.gen();
            let low: f64 = rng.gen();
            let high: f64 = rng.gen_range(low..=1.0);
            let model = StubModel::new(p, 12);

            let at_low = classify(&features(12), &model, &policy(low)).expect("classify");
            let at_high = classify(&features(12), &model, &policy(high)).expect("classify");
            assert!(at_high.prediction <= at_low.prediction, "p={p} low={low} high={high}");
        }
    }

    #[test]
    fn test_tier_ignores_threshold() {
        let model = StubModel::new(0.85, 12);
        for threshold in [0.0, 0.2, 0.5, 0.9, 1.0] {
            let result = classify(&features(12), &model, &policy(threshold)).expect("classify");
            assert_eq!(result.risk_level, RiskLevel::High);
        }
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let err = classify(&features(3), &StubModel::new(0.5, 12), &policy(0.5)).unwrap_err();
        assert_eq!(
            err,
            ModelError::ShapeMismatch {
                expected: 12,
                actual: 3
            }
        );
    }

    #[test]
    fn test_out_of_range_probability_is_rejected() {
        let err = classify(&features(12), &StubModel::new(1.2, 12), &policy(0.5)).unwrap_err();
        assert!(matches!(err, ModelError::InvalidProbability(_)));
    }
}
