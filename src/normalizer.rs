use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::Trajectory;

/// Confidence used for every frame when the service sends none.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;
/// Matched feature count used for every frame when the service sends none.
pub const DEFAULT_MATCHED_FEATURES: u64 = 100;

/// The service response did not have the expected shape.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("response body is not a JSON object")]
    NotAnObject,

    #[error("response has no `trajectory` field")]
    MissingTrajectory,

    #[error("`{0}` is not an array")]
    NotAnArray(&'static str),

    #[error("trajectory point {frame} is not an [x, y, z] triple")]
    BadPoint { frame: usize },

    #[error("`{field}` value at frame {frame} is not {expected}")]
    BadValue {
        field: &'static str,
        frame: usize,
        expected: &'static str,
    },

    #[error("`{field}` has {found} entries but the trajectory has {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Loosely typed body of an upload response.
#[derive(Debug, Default, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub trajectory: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default, rename = "matchedFeatures")]
    pub matched_features: Option<Value>,
}

impl RawResponse {
    pub fn from_value(value: Value) -> Result<RawResponse, ShapeError> {
        if !value.is_object() {
            return Err(ShapeError::NotAnObject);
        }
        serde_json::from_value(value).map_err(|_| ShapeError::NotAnObject)
    }

    /// Message carried by a truthy `error` field.
    pub fn service_error(&self) -> Option<String> {
        match &self.error {
            Some(v) if is_truthy(v) => Some(match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            _ => None,
        }
    }
}

/// JavaScript truthiness of a JSON value; arrays and objects are always truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy(field: &Option<Value>) -> Option<&Value> {
    field.as_ref().filter(|v| is_truthy(v))
}

fn column<'a>(
    field: &'static str,
    value: &'a Value,
    expected: usize,
) -> Result<&'a Vec<Value>, ShapeError> {
    let values = value.as_array().ok_or(ShapeError::NotAnArray(field))?;
    if values.len() != expected {
        return Err(ShapeError::LengthMismatch {
            field,
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

/// Builds a [`Trajectory`] from a decoded response.
///
/// The row-major `trajectory` array is transposed into `x`, `y`, `z`.
/// Missing or falsy `confidence` / `matchedFeatures` are replaced by
/// [`DEFAULT_CONFIDENCE`] / [`DEFAULT_MATCHED_FEATURES`] for every frame.
pub fn normalize(raw: &RawResponse) -> Result<Trajectory, ShapeError> {
    let points = raw
        .trajectory
        .as_ref()
        .filter(|v| !v.is_null())
        .ok_or(ShapeError::MissingTrajectory)?
        .as_array()
        .ok_or(ShapeError::NotAnArray("trajectory"))?;
    let n = points.len();

    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);
    for (frame, point) in points.iter().enumerate() {
        let xyz = point
            .as_array()
            .filter(|p| p.len() == 3)
            .ok_or(ShapeError::BadPoint { frame })?;
        let coord = |i: usize| {
            xyz[i].as_f64().ok_or(ShapeError::BadValue {
                field: "trajectory",
                frame,
                expected: "a number",
            })
        };
        x.push(coord(0)?);
        y.push(coord(1)?);
        z.push(coord(2)?);
    }

    let confidence = match truthy(&raw.confidence) {
        Some(v) => column("confidence", v, n)?
            .iter()
            .enumerate()
            .map(|(frame, c)| {
                c.as_f64().ok_or(ShapeError::BadValue {
                    field: "confidence",
                    frame,
                    expected: "a number",
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![DEFAULT_CONFIDENCE; n],
    };

    let matched_features = match truthy(&raw.matched_features) {
        Some(v) => column("matchedFeatures", v, n)?
            .iter()
            .enumerate()
            .map(|(frame, m)| {
                as_count(m).ok_or(ShapeError::BadValue {
                    field: "matchedFeatures",
                    frame,
                    expected: "a non-negative integer",
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![DEFAULT_MATCHED_FEATURES; n],
    };

    log::trace!("normalized trajectory with {} frames", n);
    Trajectory::new(x, y, z, confidence, matched_features)
}

/// [`normalize`] straight from a decoded JSON body.
pub fn normalize_value(value: Value) -> Result<Trajectory, ShapeError> {
    normalize(&RawResponse::from_value(value)?)
}
