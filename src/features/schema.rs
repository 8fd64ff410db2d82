//! Wine feature schema
//!
//! Each of the twelve inputs can be addressed by its display name as it appears in the
//! raw datasets ("fixed acidity") or by its internal name (`fixed_acidity`).

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// How a feature value is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Any finite or non-finite 64-bit float
    Continuous,
    /// Integer category code (`type`: 0 = red, 1 = white)
    Categorical,
}

/// Static description of one input feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Internal name
    pub name: &'static str,
    /// Display name used on the wire and in the raw dataset headers
    pub alias: &'static str,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    const fn continuous(name: &'static str, alias: &'static str) -> Self {
        FeatureSpec {
            name,
            alias,
            kind: FeatureKind::Continuous,
        }
    }

    /// True if `key` addresses this feature by either name
    pub fn matches(&self, key: &str) -> bool {
        self.alias == key || self.name == key
    }
}

/// All features in declaration order, which is also the column order of the raw datasets
/// with `type` appended.
pub const FEATURES: [FeatureSpec; 12] = [
    FeatureSpec::continuous("fixed_acidity", "fixed acidity"),
    FeatureSpec::continuous("volatile_acidity", "volatile acidity"),
    FeatureSpec::continuous("citric_acid", "citric acid"),
    FeatureSpec::continuous("residual_sugar", "residual sugar"),
    FeatureSpec::continuous("chlorides", "chlorides"),
    FeatureSpec::continuous("free_sulfur_dioxide", "free sulfur dioxide"),
    FeatureSpec::continuous("total_sulfur_dioxide", "total sulfur dioxide"),
    FeatureSpec::continuous("density", "density"),
    FeatureSpec::continuous("pH", "pH"),
    FeatureSpec::continuous("sulphates", "sulphates"),
    FeatureSpec::continuous("alcohol", "alcohol"),
    FeatureSpec {
        name: "type",
        alias: "type",
        kind: FeatureKind::Categorical,
    },
];

/// Look up a feature's position in [`FEATURES`] by display or internal name
pub fn feature_index(key: &str) -> Option<usize> {
    FEATURES.iter().position(|spec| spec.matches(key))
}

/// Rejection of a request payload, naming the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Field '{field}' is required")]
    Missing { field: String },

    #[error("Field '{field}' {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    /// Display name of the offending field, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::NotAnObject => None,
            ValidationError::Missing { field } | ValidationError::Invalid { field, .. } => {
                Some(field)
            }
        }
    }
}

/// Validated physicochemical measurements of one wine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WineFeatures {
    #[serde(rename = "fixed acidity")]
    pub fixed_acidity: f64,
    #[serde(rename = "volatile acidity")]
    pub volatile_acidity: f64,
    #[serde(rename = "citric acid")]
    pub citric_acid: f64,
    #[serde(rename = "residual sugar")]
    pub residual_sugar: f64,
    pub chlorides: f64,
    #[serde(rename = "free sulfur dioxide")]
    pub free_sulfur_dioxide: f64,
    #[serde(rename = "total sulfur dioxide")]
    pub total_sulfur_dioxide: f64,
    pub density: f64,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub sulphates: f64,
    pub alcohol: f64,
    /// 0 for red, 1 for white. Not range-checked.
    #[serde(rename = "type")]
    pub wine_type: i64,
}

impl WineFeatures {
    /// Dimension of feature vector
    pub const DIM: usize = FEATURES.len();

    /// Validate an arbitrary JSON payload
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Validate a JSON object. Display names take precedence over internal names when a
    /// payload carries both.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut values = [0.0f64; Self::DIM];
        let mut wine_type = 0i64;

        for (i, spec) in FEATURES.iter().enumerate() {
            let raw = map
                .get(spec.alias)
                .or_else(|| map.get(spec.name))
                .ok_or_else(|| ValidationError::Missing {
                    field: spec.alias.to_string(),
                })?;

            match spec.kind {
                FeatureKind::Continuous => values[i] = coerce_float(spec, raw)?,
                FeatureKind::Categorical => {
                    wine_type = coerce_int(spec, raw)?;
                    values[i] = wine_type as f64;
                }
            }
        }

        Ok(WineFeatures {
            fixed_acidity: values[0],
            volatile_acidity: values[1],
            citric_acid: values[2],
            residual_sugar: values[3],
            chlorides: values[4],
            free_sulfur_dioxide: values[5],
            total_sulfur_dioxide: values[6],
            density: values[7],
            ph: values[8],
            sulphates: values[9],
            alcohol: values[10],
            wine_type,
        })
    }

    /// Value of a feature addressed by display or internal name
    pub fn get(&self, key: &str) -> Option<f64> {
        feature_index(key).map(|i| self.value_at(i))
    }

    /// Value at a position of [`FEATURES`]
    pub fn value_at(&self, index: usize) -> f64 {
        match index {
            0 => self.fixed_acidity,
            1 => self.volatile_acidity,
            2 => self.citric_acid,
            3 => self.residual_sugar,
            4 => self.chlorides,
            5 => self.free_sulfur_dioxide,
            6 => self.total_sulfur_dioxide,
            7 => self.density,
            8 => self.ph,
            9 => self.sulphates,
            10 => self.alcohol,
            _ => self.wine_type as f64,
        }
    }

    /// Values in declaration order
    pub fn to_vec(&self) -> Vec<f64> {
        (0..Self::DIM).map(|i| self.value_at(i)).collect()
    }

    /// Display names in declaration order
    pub fn declared_order() -> Vec<String> {
        FEATURES.iter().map(|spec| spec.alias.to_string()).collect()
    }

    /// The sample used in API documentation (a red wine rated 5 in the raw data)
    pub fn example() -> Self {
        WineFeatures {
            fixed_acidity: 7.4,
            volatile_acidity: 0.7,
            citric_acid: 0.0,
            residual_sugar: 1.9,
            chlorides: 0.076,
            free_sulfur_dioxide: 11.0,
            total_sulfur_dioxide: 34.0,
            density: 0.9978,
            ph: 3.51,
            sulphates: 0.56,
            alcohol: 9.4,
            wine_type: 0,
        }
    }
}

fn coerce_float(spec: &FeatureSpec, raw: &Value) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::Invalid {
        field: spec.alias.to_string(),
        reason: "must be a number".to_string(),
    };

    match raw {
        Value::Number(n) => n.as_f64().ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn coerce_int(spec: &FeatureSpec, raw: &Value) -> Result<i64, ValidationError> {
    let invalid = || ValidationError::Invalid {
        field: spec.alias.to_string(),
        reason: "must be an integer".to_string(),
    };

    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                n.as_f64().and_then(integral).ok_or_else(invalid)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn integral(x: f64) -> Option<i64> {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}
