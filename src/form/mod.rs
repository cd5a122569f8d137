//! Form fields, their current values, and the feature vector sent to the
//! prediction service.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Number of fields on the form (and entries in the feature vector)
pub const FIELD_COUNT: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Categorical(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: &'static str,
}

impl Field {
    pub fn options(&self) -> &'static [&'static str] {
        match self.kind {
            FieldKind::Numeric => &[],
            FieldKind::Categorical(options) => options,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == FieldKind::Numeric
    }
}

const STUDY_METHODS: &[&str] = &["online videos", "self-study", "coaching", "group study", "mixed"];
const COURSES: &[&str] = &["b.sc", "diploma", "bca", "b.com", "ba", "bba", "b.tech"];
const GENDERS: &[&str] = &["male", "female", "other"];
const FACILITY_RATINGS: &[&str] = &["low", "medium", "high"];
const SLEEP_QUALITIES: &[&str] = &["poor", "average", "good"];
const EXAM_DIFFICULTIES: &[&str] = &["easy", "moderate", "hard"];
const INTERNET_ACCESS: &[&str] = &["no", "yes"];

/// All fields in wire order (the order the prediction service expects)
pub const FIELDS: [Field; FIELD_COUNT] = [
    Field { key: "age", label: "Age", kind: FieldKind::Numeric, default: "20" },
    Field { key: "study_hours", label: "Study Hours", kind: FieldKind::Numeric, default: "5.0" },
    Field { key: "class_attendance", label: "Attendance (%)", kind: FieldKind::Numeric, default: "80" },
    Field { key: "sleep_hours", label: "Sleep Hours", kind: FieldKind::Numeric, default: "7.0" },
    Field { key: "study_method", label: "Study Method", kind: FieldKind::Categorical(STUDY_METHODS), default: "self-study" },
    Field { key: "course", label: "Course", kind: FieldKind::Categorical(COURSES), default: "b.sc" },
    Field { key: "gender", label: "Gender", kind: FieldKind::Categorical(GENDERS), default: "male" },
    Field { key: "facility_rating", label: "Facility Rating", kind: FieldKind::Categorical(FACILITY_RATINGS), default: "medium" },
    Field { key: "sleep_quality", label: "Sleep Quality", kind: FieldKind::Categorical(SLEEP_QUALITIES), default: "average" },
    Field { key: "exam_difficulty", label: "Exam Difficulty", kind: FieldKind::Categorical(EXAM_DIFFICULTIES), default: "moderate" },
    Field { key: "internet_access", label: "Internet Access", kind: FieldKind::Categorical(INTERNET_ACCESS), default: "yes" },
];

/// Numeric section, top-left to bottom-right
pub const NUMERIC_LAYOUT: [&str; 4] = ["age", "study_hours", "class_attendance", "sleep_hours"];

/// Categorical section, top-left to bottom-right
pub const CATEGORICAL_LAYOUT: [&str; 7] = [
    "gender",
    "study_method",
    "course",
    "internet_access",
    "facility_rating",
    "sleep_quality",
    "exam_difficulty",
];

/// Look up a field definition by key
pub fn field(key: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.key == key)
}

/// Keys in focus order (numeric section first, then categorical)
pub fn display_order() -> impl Iterator<Item = &'static str> {
    NUMERIC_LAYOUT.iter().chain(CATEGORICAL_LAYOUT.iter()).copied()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("'{value}' is not a valid choice for {field} (expected one of: {expected})")]
    InvalidChoice {
        field: &'static str,
        value: String,
        expected: String,
    },
}

/// Current raw value of every field, indexed by wire position
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    values: [String; FIELD_COUNT],
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            values: FIELDS.map(|f| f.default.to_string()),
        }
    }
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let index = FIELDS.iter().position(|f| f.key == key)?;
        Some(&self.values[index])
    }

    /// Store a new raw value. Numeric fields take anything; categorical
    /// fields only accept one of their options.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), FormError> {
        let index = FIELDS
            .iter()
            .position(|f| f.key == key)
            .ok_or_else(|| FormError::UnknownField(key.to_string()))?;
        let field = &FIELDS[index];
        let value = value.into();

        if let FieldKind::Categorical(options) = field.kind {
            if !options.contains(&value.as_str()) {
                return Err(FormError::InvalidChoice {
                    field: field.key,
                    value,
                    expected: options.join(", "),
                });
            }
        }

        self.values[index] = value;
        Ok(())
    }

    /// `(key, value)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        FIELDS.iter().zip(self.values.iter()).map(|(f, v)| (f.key, v.as_str()))
    }

    /// Coerce every value in wire order into the vector the service expects
    pub fn features(&self) -> Vec<FeatureValue> {
        self.iter().map(|(_, v)| FeatureValue::coerce(v)).collect()
    }
}

/// One entry of the feature vector
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Parse numeric-looking input as a number, otherwise keep the string.
    /// Blank input stays a (blank) string.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return FeatureValue::Number(n);
                }
            }
        }
        FeatureValue::Text(raw.to_string())
    }
}

// Max integer exactly representable in an f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Whole numbers go out as JSON integers: 5.0 -> 5
            FeatureValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            FeatureValue::Number(n) => serializer.serialize_f64(*n),
            FeatureValue::Text(s) => serializer.serialize_str(s),
        }
    }
}
