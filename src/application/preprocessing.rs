//! Preprocessing pipeline: raw patient record -> model-ready feature vector.
//!
//! Reproduces the training-time transformation exactly:
//!
//! 1. impute missing numerics (`age`, `avg_glucose_level`, `bmi`) with the fitted fills
//! 2. derive `age_group` / `bmi_category` from the unscaled values
//! 3. impute a missing `smoking_status` with the fitted mode
//! 4. standard-scale the numerics (after imputation, never before)
//! 5. encode every categorical through its closed vocabulary
//! 6. select and order columns as `feature_columns` dictates
//!
//! Pure: the only inputs are the record and the immutable fitted state.

use crate::domain::{
    AgeGroup, BmiCategory, Categorical, EverMarried, FeatureColumn, FeatureVector, FittedState,
    FlagInput, Gender, LabelInput, NumericColumns, NumericInput, RawPatientRecord, ResidenceType,
    ScalerParams, SmokingStatus, ValidationError, WorkType,
};

/// Categorical fields after parsing, before encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedCategoricals {
    pub gender: Gender,
    pub hypertension: u8,
    pub heart_disease: u8,
    pub ever_married: EverMarried,
    pub work_type: WorkType,
    pub residence_type: ResidenceType,
}

/// All columns as model inputs, before column selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedRow {
    pub gender: f64,
    pub age: f64,
    pub hypertension: f64,
    pub heart_disease: f64,
    pub ever_married: f64,
    pub work_type: f64,
    pub residence_type: f64,
    pub avg_glucose_level: f64,
    pub bmi: f64,
    pub smoking_status: f64,
    pub age_group: f64,
    pub bmi_category: f64,
}

impl EncodedRow {
    #[must_use]
    pub fn value(&self, column: FeatureColumn) -> f64 {
        match column {
            FeatureColumn::Gender => self.gender,
            FeatureColumn::Age => self.age,
            FeatureColumn::Hypertension => self.hypertension,
            FeatureColumn::HeartDisease => self.heart_disease,
            FeatureColumn::EverMarried => self.ever_married,
            FeatureColumn::WorkType => self.work_type,
            FeatureColumn::ResidenceType => self.residence_type,
            FeatureColumn::AvgGlucoseLevel => self.avg_glucose_level,
            FeatureColumn::Bmi => self.bmi,
            FeatureColumn::SmokingStatus => self.smoking_status,
            FeatureColumn::AgeGroup => self.age_group,
            FeatureColumn::BmiCategory => self.bmi_category,
        }
    }
}

fn present_label<T: Categorical>(
    raw: Option<&LabelInput>,
) -> Result<Option<&str>, ValidationError> {
    Ok(raw.map(LabelInput::label::<T>).transpose()?.flatten())
}

fn parse_required<T: Categorical>(raw: Option<&LabelInput>) -> Result<T, ValidationError> {
    match present_label::<T>(raw)? {
        Some(label) => T::parse(label),
        None => Err(ValidationError::MissingField { field: T::FIELD }),
    }
}

fn resolve_flag(raw: Option<&FlagInput>, field: &'static str) -> Result<u8, ValidationError> {
    raw.ok_or(ValidationError::MissingField { field })?
        .resolve(field)
}

fn resolve_numeric(
    raw: Option<&NumericInput>,
    field: &'static str,
    fill: f64,
) -> Result<f64, ValidationError> {
    let value = match raw {
        Some(input) => input.resolve(field)?,
        None => None,
    };
    Ok(value.unwrap_or_else(|| {
        tracing::debug!("Imputing missing '{}' with fitted value", field);
        fill
    }))
}

/// Parse the categoricals and flags that have no imputation rule.
///
/// # Errors
/// Returns `MissingField` for an absent value and `UnknownCategory` /
/// `InvalidFlag` for a value outside its vocabulary.
pub fn parse_categoricals(
    record: &RawPatientRecord,
) -> Result<ParsedCategoricals, ValidationError> {
    Ok(ParsedCategoricals {
        gender: parse_required(record.gender.as_ref())?,
        hypertension: resolve_flag(record.hypertension.as_ref(), "hypertension")?,
        heart_disease: resolve_flag(record.heart_disease.as_ref(), "heart_disease")?,
        ever_married: parse_required(record.ever_married.as_ref())?,
        work_type: parse_required(record.work_type.as_ref())?,
        residence_type: parse_required(record.residence_type.as_ref())?,
    })
}

/// Step 1: fill missing numerics from the numeric imputer.
///
/// # Errors
/// Returns `MalformedNumeric` for a present value that is not a number.
pub fn impute_numeric(
    record: &RawPatientRecord,
    fills: &NumericColumns,
) -> Result<NumericColumns, ValidationError> {
    Ok(NumericColumns {
        age: resolve_numeric(record.age.as_ref(), "age", fills.age)?,
        avg_glucose_level: resolve_numeric(
            record.avg_glucose_level.as_ref(),
            "avg_glucose_level",
            fills.avg_glucose_level,
        )?,
        bmi: resolve_numeric(record.bmi.as_ref(), "bmi", fills.bmi)?,
    })
}

/// Step 2: derive the ordinal bins from unscaled values.
///
/// # Errors
/// Returns `OutOfRange` when a value falls outside every bin.
pub fn derive_bins(numeric: &NumericColumns) -> Result<(AgeGroup, BmiCategory), ValidationError> {
    let age_group = AgeGroup::from_age(numeric.age).ok_or(ValidationError::OutOfRange {
        field: "age",
        value: numeric.age,
        range: AgeGroup::RANGE,
    })?;
    let bmi_category = BmiCategory::from_bmi(numeric.bmi).ok_or(ValidationError::OutOfRange {
        field: "bmi",
        value: numeric.bmi,
        range: BmiCategory::RANGE,
    })?;
    Ok((age_group, bmi_category))
}

/// Step 3: fill a missing `smoking_status` with the fitted mode.
///
/// Absent, empty and the dataset's `Unknown` marker all count as missing.
///
/// # Errors
/// Returns `UnknownCategory` for any other label outside the vocabulary.
pub fn impute_smoking_status(
    raw: Option<&LabelInput>,
    fill: SmokingStatus,
) -> Result<SmokingStatus, ValidationError> {
    match present_label::<SmokingStatus>(raw)? {
        None | Some(SmokingStatus::UNKNOWN_MARKER) => Ok(fill),
        Some(s) => SmokingStatus::parse(s),
    }
}

/// Step 4: `(x - mean) / scale` per numeric column.
#[must_use]
pub fn scale_numeric(numeric: &NumericColumns, scaler: &ScalerParams) -> NumericColumns {
    let z = |x: f64, mean: f64, scale: f64| (x - mean) / scale;
    NumericColumns {
        age: z(numeric.age, scaler.mean.age, scaler.scale.age),
        avg_glucose_level: z(
            numeric.avg_glucose_level,
            scaler.mean.avg_glucose_level,
            scaler.scale.avg_glucose_level,
        ),
        bmi: z(numeric.bmi, scaler.mean.bmi, scaler.scale.bmi),
    }
}

/// Step 5: integer-encode the categoricals and assemble the full row.
#[must_use]
pub fn encode(
    scaled: &NumericColumns,
    categoricals: &ParsedCategoricals,
    smoking_status: SmokingStatus,
    bins: (AgeGroup, BmiCategory),
) -> EncodedRow {
    let code = |c: u8| f64::from(c);
    EncodedRow {
        gender: code(categoricals.gender.code()),
        age: scaled.age,
        hypertension: code(categoricals.hypertension),
        heart_disease: code(categoricals.heart_disease),
        ever_married: code(categoricals.ever_married.code()),
        work_type: code(categoricals.work_type.code()),
        residence_type: code(categoricals.residence_type.code()),
        avg_glucose_level: scaled.avg_glucose_level,
        bmi: scaled.bmi,
        smoking_status: code(smoking_status.code()),
        age_group: code(bins.0.code()),
        bmi_category: code(bins.1.code()),
    }
}

/// Step 6: keep exactly `columns`, in that order.
#[must_use]
pub fn select_columns(row: &EncodedRow, columns: &[FeatureColumn]) -> FeatureVector {
    columns.iter().map(|&c| (c, row.value(c))).collect()
}

/// Run the full pipeline.
///
/// # Errors
/// Returns `ValidationError` when the record cannot be encoded faithfully.
pub fn transform(
    record: &RawPatientRecord,
    state: &FittedState,
) -> Result<FeatureVector, ValidationError> {
    let categoricals = parse_categoricals(record)?;
    let numeric = impute_numeric(record, &state.imputer_num)?;
    let bins = derive_bins(&numeric)?;
    let smoking_status = impute_smoking_status(
        record.smoking_status.as_ref(),
        state.imputer_cat.smoking_status,
    )?;
    let scaled = scale_numeric(&numeric, &state.scaler);
    let row = encode(&scaled, &categoricals, smoking_status, bins);

    let features = select_columns(&row, &state.feature_columns);
    tracing::debug!(
        "Transformed record into {} features (age_group={}, bmi_category={})",
        features.len(),
        bins.0.label(),
        bins.1.label()
    );
    Ok(features)
}
