//! Model feature columns and the ordered feature vector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the columns the preprocessing pipeline can produce.
///
/// Names are the training DataFrame column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FeatureColumn {
    Gender,
    Age,
    Hypertension,
    HeartDisease,
    EverMarried,
    WorkType,
    ResidenceType,
    AvgGlucoseLevel,
    Bmi,
    SmokingStatus,
    AgeGroup,
    BmiCategory,
}

impl FeatureColumn {
    /// Column order of the training DataFrame.
    pub const TRAINING_ORDER: [Self; 12] = [
        Self::Gender,
        Self::Age,
        Self::Hypertension,
        Self::HeartDisease,
        Self::EverMarried,
        Self::WorkType,
        Self::ResidenceType,
        Self::AvgGlucoseLevel,
        Self::Bmi,
        Self::SmokingStatus,
        Self::AgeGroup,
        Self::BmiCategory,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::Age => "age",
            Self::Hypertension => "hypertension",
            Self::HeartDisease => "heart_disease",
            Self::EverMarried => "ever_married",
            Self::WorkType => "work_type",
            Self::ResidenceType => "Residence_type",
            Self::AvgGlucoseLevel => "avg_glucose_level",
            Self::Bmi => "bmi",
            Self::SmokingStatus => "smoking_status",
            Self::AgeGroup => "age_group",
            Self::BmiCategory => "bmi_category",
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::TRAINING_ORDER
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("Unknown feature column: {s:?}"))
    }
}

impl TryFrom<String> for FeatureColumn {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FeatureColumn> for String {
    fn from(c: FeatureColumn) -> Self {
        c.name().to_string()
    }
}

/// Model-ready values, in the exact column order the model was trained on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    columns: Vec<FeatureColumn>,
    values: Vec<f64>,
}

impl FeatureVector {
    #[must_use]
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a single column, if it was selected.
    #[must_use]
    pub fn get(&self, column: FeatureColumn) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values[i])
    }
}

impl FromIterator<(FeatureColumn, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (FeatureColumn, f64)>>(iter: I) -> Self {
        let (columns, values) = iter.into_iter().unzip();
        Self { columns, values }
    }
}
