//! Raw patient record and the closed categorical vocabularies.
//!
//! Field names and labels follow the stroke training dataset. The integer
//! codes are training artifacts: changing any of them silently corrupts
//! every prediction, so they live in exhaustive matches, one per enum.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// A closed set of training labels with fixed integer codes.
pub trait Categorical: Sized + Copy + 'static {
    /// Wire name of the field this vocabulary belongs to.
    const FIELD: &'static str;

    /// Every member, in label order used for error messages.
    const ALL: &'static [Self];

    /// Label as it appeared in the training data.
    fn label(self) -> &'static str;

    /// Integer code the model was trained on.
    fn code(self) -> u8;

    /// Parse a wire label. Matching is exact after trimming whitespace.
    ///
    /// # Errors
    /// Returns `ValidationError::UnknownCategory` for any label outside the vocabulary.
    fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.label() == trimmed)
            .ok_or_else(|| Self::unknown(raw.to_string()))
    }

    /// Rejection for a value outside this vocabulary.
    fn unknown(value: String) -> ValidationError {
        ValidationError::UnknownCategory {
            field: Self::FIELD,
            value,
            allowed: Self::ALL
                .iter()
                .map(|v| v.label())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Categorical for Gender {
    const FIELD: &'static str = "gender";
    const ALL: &'static [Self] = &[Self::Male, Self::Female];

    fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Male => 1,
            Self::Female => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EverMarried {
    Yes,
    No,
}

impl Categorical for EverMarried {
    const FIELD: &'static str = "ever_married";
    const ALL: &'static [Self] = &[Self::Yes, Self::No];

    fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Yes => 1,
            Self::No => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    Private,
    #[serde(rename = "Self-employed")]
    SelfEmployed,
    #[serde(rename = "Govt_job")]
    GovtJob,
    #[serde(rename = "children")]
    Children,
    #[serde(rename = "Never_worked")]
    NeverWorked,
}

impl Categorical for WorkType {
    const FIELD: &'static str = "work_type";
    const ALL: &'static [Self] = &[
        Self::Private,
        Self::SelfEmployed,
        Self::GovtJob,
        Self::Children,
        Self::NeverWorked,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Private => "Private",
            Self::SelfEmployed => "Self-employed",
            Self::GovtJob => "Govt_job",
            Self::Children => "children",
            Self::NeverWorked => "Never_worked",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::GovtJob => 0,
            Self::Children => 1,
            Self::Private => 2,
            Self::SelfEmployed => 3,
            Self::NeverWorked => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResidenceType {
    Urban,
    Rural,
}

impl Categorical for ResidenceType {
    const FIELD: &'static str = "Residence_type";
    const ALL: &'static [Self] = &[Self::Urban, Self::Rural];

    fn label(self) -> &'static str {
        match self {
            Self::Urban => "Urban",
            Self::Rural => "Rural",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Urban => 1,
            Self::Rural => 0,
        }
    }
}

/// Smoking history. Nullable on the wire; a missing value is imputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmokingStatus {
    #[serde(rename = "never smoked")]
    NeverSmoked,
    #[serde(rename = "formerly smoked")]
    FormerlySmoked,
    #[serde(rename = "smokes")]
    Smokes,
}

impl SmokingStatus {
    /// Placeholder the source dataset uses for "not recorded".
    pub const UNKNOWN_MARKER: &'static str = "Unknown";
}

impl Categorical for SmokingStatus {
    const FIELD: &'static str = "smoking_status";
    const ALL: &'static [Self] = &[Self::NeverSmoked, Self::FormerlySmoked, Self::Smokes];

    fn label(self) -> &'static str {
        match self {
            Self::NeverSmoked => "never smoked",
            Self::FormerlySmoked => "formerly smoked",
            Self::Smokes => "smokes",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::NeverSmoked => 1,
            Self::FormerlySmoked => 2,
            Self::Smokes => 3,
        }
    }
}

/// A categorical wire value.
///
/// Non-string JSON (e.g. an already-encoded `1`) is kept as `Other` so the
/// pipeline can reject it against the field it arrived in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelInput {
    Text(String),
    Other(serde_json::Value),
}

impl LabelInput {
    /// Trimmed label for vocabulary `T`, or `None` when empty.
    ///
    /// # Errors
    /// Returns `ValidationError::UnknownCategory` for a non-string value.
    pub fn label<T: Categorical>(&self) -> Result<Option<&str>, ValidationError> {
        match self {
            Self::Text(s) => {
                let trimmed = s.trim();
                Ok((!trimmed.is_empty()).then_some(trimmed))
            }
            Self::Other(v) => Err(T::unknown(v.to_string())),
        }
    }
}

impl From<&str> for LabelInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for LabelInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A numeric wire value: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
    /// Any other JSON type; always malformed
    Other(serde_json::Value),
}

impl NumericInput {
    /// Resolve to a finite number, or `None` when the value counts as missing.
    ///
    /// Empty strings and `NaN` are missing; anything else non-numeric is malformed.
    ///
    /// # Errors
    /// Returns `ValidationError::MalformedNumeric` for text that does not parse
    /// or for infinite values.
    pub fn resolve(&self, field: &'static str) -> Result<Option<f64>, ValidationError> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| ValidationError::MalformedNumeric {
                        field,
                        value: s.clone(),
                    })?
            }
            Self::Other(v) => {
                return Err(ValidationError::MalformedNumeric {
                    field,
                    value: v.to_string(),
                })
            }
        };

        if value.is_nan() {
            Ok(None)
        } else if value.is_infinite() {
            Err(ValidationError::MalformedNumeric {
                field,
                value: value.to_string(),
            })
        } else {
            Ok(Some(value))
        }
    }
}

impl From<f64> for NumericInput {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

/// A boolean flag on the wire: `0`/`1`, `true`/`false`, or `"0"`/`"1"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagInput {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl FlagInput {
    /// Resolve to `0` or `1`.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidFlag` for any other value.
    pub fn resolve(&self, field: &'static str) -> Result<u8, ValidationError> {
        let invalid = |value: String| ValidationError::InvalidFlag { field, value };
        match self {
            Self::Bool(b) => Ok(u8::from(*b)),
            Self::Number(v) if *v == 0.0 => Ok(0),
            Self::Number(v) if *v == 1.0 => Ok(1),
            Self::Number(v) => Err(invalid(v.to_string())),
            Self::Text(s) => match s.trim() {
                "0" => Ok(0),
                "1" => Ok(1),
                _ => Err(invalid(s.clone())),
            },
            Self::Other(v) => Err(invalid(v.to_string())),
        }
    }
}

impl From<u8> for FlagInput {
    fn from(v: u8) -> Self {
        Self::Number(f64::from(v))
    }
}

/// Patient attributes exactly as a caller supplied them.
///
/// Every field is optional on the wire; which absences are tolerated is
/// decided by the preprocessing pipeline, not by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPatientRecord {
    #[serde(default)]
    pub age: Option<NumericInput>,

    #[serde(default)]
    pub gender: Option<LabelInput>,

    #[serde(default)]
    pub hypertension: Option<FlagInput>,

    #[serde(default)]
    pub heart_disease: Option<FlagInput>,

    #[serde(default)]
    pub ever_married: Option<LabelInput>,

    #[serde(default)]
    pub work_type: Option<LabelInput>,

    #[serde(default, rename = "Residence_type", alias = "residence_type")]
    pub residence_type: Option<LabelInput>,

    #[serde(default)]
    pub avg_glucose_level: Option<NumericInput>,

    #[serde(default)]
    pub bmi: Option<NumericInput>,

    /// Nullable; `Unknown` is treated the same as absent.
    #[serde(default)]
    pub smoking_status: Option<LabelInput>,
}
