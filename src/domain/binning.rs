//! Derived ordinal features: age group and BMI category.
//!
//! Bins are right-inclusive and left-exclusive: a value sitting exactly on
//! an edge belongs to the bin whose upper edge it is. Values at or below the
//! lowest edge, or above the highest, fall in no bin.

use serde::{Deserialize, Serialize};

use super::patient::Categorical;

/// Assign `value` to the first bin in `bins` whose upper edge is `>= value`.
///
/// `bins` is an ordered list of `(upper_edge, label)` pairs; `lower` is the
/// exclusive left edge of the first bin. Returns `None` outside `(lower, last_upper]`.
#[must_use]
pub fn cut<L: Copy>(value: f64, lower: f64, bins: &[(f64, L)]) -> Option<L> {
    if value.is_nan() || value <= lower {
        return None;
    }
    bins.iter()
        .find(|(upper, _)| value <= *upper)
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    Young,
    Middle,
    Senior,
    Elderly,
}

impl AgeGroup {
    pub const LOWER_EDGE: f64 = 0.0;
    pub const BINS: [(f64, Self); 4] = [
        (30.0, Self::Young),
        (50.0, Self::Middle),
        (70.0, Self::Senior),
        (100.0, Self::Elderly),
    ];
    pub const RANGE: &'static str = "(0, 100]";

    #[must_use]
    pub fn from_age(age: f64) -> Option<Self> {
        cut(age, Self::LOWER_EDGE, &Self::BINS)
    }
}

impl Categorical for AgeGroup {
    const FIELD: &'static str = "age_group";
    const ALL: &'static [Self] = &[Self::Young, Self::Middle, Self::Senior, Self::Elderly];

    fn label(self) -> &'static str {
        match self {
            Self::Young => "Young",
            Self::Middle => "Middle",
            Self::Senior => "Senior",
            Self::Elderly => "Elderly",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Young => 3,
            Self::Middle => 2,
            Self::Senior => 1,
            Self::Elderly => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub const LOWER_EDGE: f64 = 0.0;
    pub const BINS: [(f64, Self); 4] = [
        (18.5, Self::Underweight),
        (25.0, Self::Normal),
        (30.0, Self::Overweight),
        (100.0, Self::Obese),
    ];
    pub const RANGE: &'static str = "(0, 100]";

    #[must_use]
    pub fn from_bmi(bmi: f64) -> Option<Self> {
        cut(bmi, Self::LOWER_EDGE, &Self::BINS)
    }
}

impl Categorical for BmiCategory {
    const FIELD: &'static str = "bmi_category";
    const ALL: &'static [Self] = &[
        Self::Underweight,
        Self::Normal,
        Self::Overweight,
        Self::Obese,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Underweight => 3,
            Self::Normal => 2,
            Self::Overweight => 1,
            Self::Obese => 0,
        }
    }
}
