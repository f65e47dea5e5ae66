use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::CalibrationParams;

/// Whether the camera calibration travels with the upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    /// Only the archive is sent.
    #[default]
    Withhold,
    /// Calibration is attached as extra multipart text fields.
    Forward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub service_url: String,
    pub upload_path: String,
    pub health_path: String,
    pub calibration: CalibrationParams,
    pub calibration_mode: CalibrationMode,
    pub output_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000".to_string(),
            upload_path: "/api/upload".to_string(),
            health_path: "/api/health".to_string(),
            calibration: CalibrationParams::default(),
            calibration_mode: CalibrationMode::Withhold,
            output_dir: PathBuf::from("."),
        }
    }
}

impl TrackerConfig {
    pub fn from_json_file(path: &str) -> Result<TrackerConfig> {
        let config: TrackerConfig = crate::io::object_from_json(path)?;
        config.validate()?;
        Ok(config)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&self.service_url)
            .map_err(|e| Error::Config(format!("service_url {:?}: {}", self.service_url, e)))?;
        base.join(path)
            .map_err(|e| Error::Config(format!("endpoint path {:?}: {}", path, e)))
    }

    pub fn upload_url(&self) -> Result<Url> {
        self.endpoint(&self.upload_path)
    }

    pub fn health_url(&self) -> Result<Url> {
        self.endpoint(&self.health_path)
    }

    pub fn validate(&self) -> Result<()> {
        self.upload_url()?;
        self.health_url()?;
        let c = &self.calibration;
        if !(c.focal_length.is_finite() && c.focal_length > 0.0) {
            return Err(Error::Config(format!(
                "focal_length must be positive, got {}",
                c.focal_length
            )));
        }
        if !(c.center_x.is_finite() && c.center_y.is_finite()) {
            return Err(Error::Config("principal point must be finite".to_string()));
        }
        Ok(())
    }
}
