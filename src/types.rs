use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::normalizer::ShapeError;

/// Camera trajectory returned by the odometry service.
///
/// Four frame-aligned columns: positions, confidence in `[0, 1]` and matched
/// feature counts. Index `i` of every column refers to the same frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    confidence: Vec<f64>,
    matched_features: Vec<u64>,
}

/// One frame of a [`Trajectory`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub position: DVec3,
    pub confidence: f64,
    pub matched_features: u64,
}

impl Trajectory {
    pub fn new(
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        confidence: Vec<f64>,
        matched_features: Vec<u64>,
    ) -> Result<Trajectory, ShapeError> {
        let n = x.len();
        for (field, len) in [
            ("y", y.len()),
            ("z", z.len()),
            ("confidence", confidence.len()),
            ("matchedFeatures", matched_features.len()),
        ] {
            if len != n {
                return Err(ShapeError::LengthMismatch {
                    field,
                    expected: n,
                    found: len,
                });
            }
        }
        Ok(Trajectory {
            x,
            y,
            z,
            confidence,
            matched_features,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn confidence(&self) -> &[f64] {
        &self.confidence
    }

    pub fn matched_features(&self) -> &[u64] {
        &self.matched_features
    }

    pub fn frame(&self, index: usize) -> Option<Frame> {
        if index >= self.len() {
            return None;
        }
        Some(Frame {
            index,
            position: DVec3::new(self.x[index], self.y[index], self.z[index]),
            confidence: self.confidence[index],
            matched_features: self.matched_features[index],
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        (0..self.len()).filter_map(|i| self.frame(i))
    }

    /// Sum of the distances between consecutive positions.
    pub fn path_length(&self) -> f64 {
        self.frames()
            .zip(self.frames().skip(1))
            .map(|(a, b)| a.position.distance(b.position))
            .sum()
    }

    /// Axis aligned bounds of all positions, `None` for an empty trajectory.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        self.frames().map(|f| f.position).fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })
    }

    pub fn mean_confidence(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.confidence.iter().sum::<f64>() / self.len() as f64)
        }
    }
}

/// Camera intrinsics entered by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub focal_length: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            focal_length: 1000.0,
            center_x: 640.0,
            center_y: 360.0,
        }
    }
}

impl CalibrationParams {
    /// Multipart text fields used when calibration is forwarded to the service.
    pub fn form_fields(&self) -> [(&'static str, String); 3] {
        [
            ("focal_length", self.focal_length.to_string()),
            ("center_x", self.center_x.to_string()),
            ("center_y", self.center_y.to_string()),
        ]
    }
}

/// Presentation toggles. Never touches the trajectory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    pub show_features: bool,
}

impl ViewState {
    pub fn toggle_features(&mut self) -> bool {
        self.show_features = !self.show_features;
        self.show_features
    }
}
