use std::sync::Arc;

use drone_vo_tracker::app::App;
use drone_vo_tracker::config::TrackerConfig;
use drone_vo_tracker::types::CalibrationParams;
use drone_vo_tracker::upload::{TrajectoryService, UploadError, UploadFile};
use serde_json::{Value, json};

/// Answers every upload with the same body.
struct FixedService(Value);

impl TrajectoryService for FixedService {
    async fn upload(
        &self,
        _file: &UploadFile,
        _calibration: Option<&CalibrationParams>,
    ) -> Result<Value, UploadError> {
        Ok(self.0.clone())
    }
}

fn app() -> App<FixedService> {
    let body = json!({
        "trajectory": [[1, 2, 3], [4, 5, 6]],
        "confidence": [0.5, 0.9],
        "matchedFeatures": [50, 80]
    });
    App::new(FixedService(body), &TrackerConfig::default())
}

#[tokio::test]
async fn test_toggle_features_leaves_trajectory_alone() {
    let mut app = app();
    app.choose_file(Some(&UploadFile::new("a.zip", vec![]))).await;
    let before = app.trajectory().unwrap().clone();

    assert!(!app.view().show_features);
    assert!(app.toggle_features());
    assert!(app.view().show_features);
    assert!(Arc::ptr_eq(app.trajectory().unwrap(), &before));
    assert!(!app.toggle_features());
    assert!(!app.view().show_features);
    assert!(Arc::ptr_eq(app.trajectory().unwrap(), &before));
}

#[tokio::test]
async fn test_charts_follow_view_state() {
    let mut app = app();
    assert!(app.charts().is_none());

    app.choose_file(Some(&UploadFile::new("a.zip", vec![]))).await;
    let charts = app.charts().unwrap();
    assert!(charts.quality.is_none());
    assert_eq!(charts.trajectory.trajectory.len(), 2);

    app.toggle_features();
    let charts = app.charts().unwrap();
    assert_eq!(charts.quality.unwrap().frames, vec![0, 1]);
}

#[tokio::test]
async fn test_export_from_session() {
    let mut app = app();
    assert!(app.export_csv().unwrap().is_none());

    app.choose_file(Some(&UploadFile::new("a.zip", vec![]))).await;
    let export = app.export_csv().unwrap().unwrap();
    assert_eq!(
        export.as_str().unwrap(),
        "Frame,X,Y,Z,Confidence,MatchedFeatures\n0,1,2,3,0.5,50\n1,4,5,6,0.9,80"
    );
}

#[test]
fn test_calibration_defaults_and_edit() {
    let mut app = app();
    assert_eq!(app.calibration(), &CalibrationParams::default());
    app.set_calibration(CalibrationParams {
        focal_length: 1200.0,
        ..Default::default()
    });
    assert_eq!(app.calibration().focal_length, 1200.0);
    assert_eq!(app.calibration().center_x, 640.0);
}
