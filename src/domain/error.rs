//! Input validation errors.
//!
//! Every variant names the offending wire field so callers can tell the
//! client exactly what to fix. These are always client errors: the service
//! is healthy, the record is not.

/// Rejection of a raw patient record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field '{field}' (no imputation rule)")]
    MissingField { field: &'static str },

    #[error("Field '{field}' is not numeric: {value:?}")]
    MalformedNumeric { field: &'static str, value: String },

    #[error("Field '{field}' must be 0 or 1, got {value:?}")]
    InvalidFlag { field: &'static str, value: String },

    #[error("Unknown label {value:?} for field '{field}' (expected one of: {allowed})")]
    UnknownCategory {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("Field '{field}' value {value} is outside {range}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        range: &'static str,
    },
}

impl ValidationError {
    /// Wire name of the field that caused the rejection.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::MalformedNumeric { field, .. }
            | Self::InvalidFlag { field, .. }
            | Self::UnknownCategory { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }

    /// Short rejection class. Carries no input value, so it is safe to log.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing",
            Self::MalformedNumeric { .. } => "malformed_numeric",
            Self::InvalidFlag { .. } => "invalid_flag",
            Self::UnknownCategory { .. } => "unknown_category",
            Self::OutOfRange { .. } => "out_of_range",
        }
    }
}
