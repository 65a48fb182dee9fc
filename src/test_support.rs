//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing_subscriber::fmt::MakeWriter;

use crate::adapters::logistic::ExportedLogisticModel;
use crate::domain::{
    Categorical, EverMarried, FittedState, FlagInput, Gender, LabelInput, NumericInput,
    RawPatientRecord, ResidenceType, SmokingStatus, WorkType,
};
use crate::ports::{ModelError, ProbabilityModel};

/// The demonstration fitted state shipped in `models/`.
pub fn fitted_state() -> FittedState {
    serde_json::from_str(include_str!("../models/fitted_state.json"))
        .expect("models/fitted_state.json should parse")
}

/// The demonstration model shipped in `models/`.
pub fn logistic_export() -> ExportedLogisticModel {
    serde_json::from_str(include_str!("../models/model.json"))
        .expect("models/model.json should parse")
}

/// High-risk profile from the dashboard's default form values.
pub fn stroke_profile() -> RawPatientRecord {
    serde_json::from_value(serde_json::json!({
        "age": 80,
        "gender": "Male",
        "hypertension": 1,
        "heart_disease": 1,
        "ever_married": "Yes",
        "work_type": "Private",
        "Residence_type": "Urban",
        "avg_glucose_level": 280,
        "bmi": 45,
        "smoking_status": "smokes"
    }))
    .expect("valid record")
}

pub fn healthy_profile() -> RawPatientRecord {
    serde_json::from_value(serde_json::json!({
        "age": 25,
        "gender": "Female",
        "hypertension": 0,
        "heart_disease": 0,
        "ever_married": "No",
        "work_type": "Private",
        "Residence_type": "Urban",
        "avg_glucose_level": 85,
        "bmi": 22,
        "smoking_status": "never smoked"
    }))
    .expect("valid record")
}

fn pick<T: Categorical, R: Rng>(rng: &mut R) -> String {
    T::ALL
        .choose(rng)
        .map(|v| v.label().to_string())
        .unwrap_or_default()
}

/// A random record that the pipeline must accept.
pub fn random_record<R: Rng>(rng: &mut R) -> RawPatientRecord {
    let smoking_status = match rng.gen_range(0..5) {
        0 => None,
        1 => Some(LabelInput::from(SmokingStatus::UNKNOWN_MARKER)),
        _ => Some(pick::<SmokingStatus, _>(rng).into()),
    };
    RawPatientRecord {
        age: rng
            .gen_bool(0.9)
            .then(|| NumericInput::from(rng.gen_range(0.1..=100.0))),
        gender: Some(pick::<Gender, _>(rng).into()),
        hypertension: Some(FlagInput::from(rng.gen_range(0..=1u8))),
        heart_disease: Some(FlagInput::Bool(rng.gen())),
        ever_married: Some(pick::<EverMarried, _>(rng).into()),
        work_type: Some(pick::<WorkType, _>(rng).into()),
        residence_type: Some(pick::<ResidenceType, _>(rng).into()),
        avg_glucose_level: Some(NumericInput::from(rng.gen_range(50.0..300.0))),
        bmi: Some(NumericInput::Text(format!("{:.1}", rng.gen_range(10.0..70.0)))),
        smoking_status,
    }
}

/// Model returning a fixed probability.
#[derive(Debug, Clone)]
pub struct StubModel {
    probability: f64,
    n_features: usize,
    names: Option<Vec<String>>,
}

impl StubModel {
    pub fn new(probability: f64, n_features: usize) -> Self {
        Self {
            probability,
            n_features,
            names: None,
        }
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.n_features = names.len();
        self.names = Some(names);
        self
    }
}

impl ProbabilityModel for StubModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        Ok(self.probability)
    }
}

/// In-memory log sink for asserting on formatted tracing output.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer lock");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Run `f` with every event at DEBUG and above written into this sink.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer lock")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
