use std::sync::Arc;

use crate::config::TrackerConfig;
use crate::error::Result;
use crate::export::{CsvExport, export_csv};
use crate::types::{CalibrationParams, Trajectory, ViewState};
use crate::upload::{TrajectoryService, UploadController, UploadFile, UploadState};
use crate::visualization::{Charts, Visualizer};

/// Operator session: upload, view toggles, charts and export.
pub struct App<S> {
    controller: UploadController<S>,
    calibration: CalibrationParams,
    view: ViewState,
    visualizer: Visualizer,
}

impl<S: TrajectoryService> App<S> {
    pub fn new(service: S, config: &TrackerConfig) -> App<S> {
        App {
            controller: UploadController::new(service, config.calibration_mode),
            calibration: config.calibration,
            view: ViewState::default(),
            visualizer: Visualizer::new(),
        }
    }

    pub async fn choose_file(&mut self, file: Option<&UploadFile>) -> &UploadState {
        self.controller.submit(file, &self.calibration).await
    }

    pub fn state(&self) -> &UploadState {
        self.controller.state()
    }

    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        self.controller.trajectory()
    }

    pub fn calibration(&self) -> &CalibrationParams {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: CalibrationParams) {
        self.calibration = calibration;
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn toggle_features(&mut self) -> bool {
        self.view.toggle_features()
    }

    /// Charts for the displayed trajectory, `None` before the first success.
    pub fn charts(&mut self) -> Option<Charts> {
        let trajectory = self.controller.trajectory()?.clone();
        Some(self.visualizer.render(&trajectory, &self.view))
    }

    pub fn export_csv(&self) -> Result<Option<CsvExport>> {
        export_csv(self.trajectory().map(|t| t.as_ref()))
    }
}
