use std::sync::Arc;

use rerun::{RecordingStream, RecordingStreamError, TimeCell};
use serde_json::{Value, json};

use crate::types::{Frame, Trajectory, ViewState};

pub const PATH_COLOR: (u8, u8, u8, u8) = (33, 150, 243, 255);
pub const PATH_WIDTH: f32 = 3.0;
/// Marker size per unit of confidence.
pub const SIZE_SCALE: f64 = 10.0;
pub const FEATURES_LABEL: &str = "Matched Features";
pub const CONFIDENCE_LABEL: &str = "Confidence (%)";

/// Per-frame marker encodings of the 3-D plot.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerArrays {
    pub sizes: Vec<f64>,
    pub colors: Vec<(u8, u8, u8, u8)>,
    /// Feature counts mapped to both ends of the color scale.
    pub color_range: (u64, u64),
    pub hover: Vec<String>,
}

/// Fixed-point text of `value` with `digits` decimals.
///
/// Rounds on the exact binary value with ties away from zero, unlike `{:.N}`
/// which sends ties to even. `0.125` gives `0.13`, `2.675` (below the tie) gives `2.67`.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    // 1074 decimals hold every f64 exactly, so nothing is rounded here
    let exact = format!("{:.1074}", value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .map(|b| b - b'0')
        .collect();
    let mut int_len = int_part.len();

    if frac_part.as_bytes().get(digits).is_some_and(|&b| b >= b'5') {
        let mut carry = true;
        for d in kept.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, 1);
            int_len += 1;
        }
    }

    let mut text = String::with_capacity(kept.len() + 2);
    if value < 0.0 {
        text.push('-');
    }
    for (i, d) in kept.iter().enumerate() {
        if i == int_len {
            text.push('.');
        }
        text.push(char::from(b'0' + d));
    }
    text
}

pub fn hover_text(frame: &Frame) -> String {
    format!(
        "Position {}<br>X: {}<br>Y: {}<br>Z: {}<br>Confidence: {}%<br>Features: {}",
        frame.index + 1,
        to_fixed(frame.position.x, 2),
        to_fixed(frame.position.y, 2),
        to_fixed(frame.position.z, 2),
        to_fixed(frame.confidence * 100.0, 1),
        frame.matched_features
    )
}

/// Viridis color of a feature count within `range`.
pub fn feature_color(count: u64, range: (u64, u64)) -> (u8, u8, u8, u8) {
    let (lo, hi) = range;
    let t = if hi > lo {
        count.saturating_sub(lo) as f64 / (hi - lo) as f64
    } else {
        0.5
    };
    let c = colorous::VIRIDIS.eval_continuous(t.clamp(0.0, 1.0));
    (c.r, c.g, c.b, 255)
}

pub fn marker_arrays(trajectory: &Trajectory) -> MarkerArrays {
    let counts = trajectory.matched_features();
    let color_range = (
        counts.iter().copied().min().unwrap_or(0),
        counts.iter().copied().max().unwrap_or(0),
    );
    MarkerArrays {
        sizes: trajectory
            .confidence()
            .iter()
            .map(|c| c * SIZE_SCALE)
            .collect(),
        colors: counts
            .iter()
            .map(|&n| feature_color(n, color_range))
            .collect(),
        color_range,
        hover: trajectory.frames().map(|f| hover_text(&f)).collect(),
    }
}

/// 3-D path through all positions.
#[derive(Debug, Clone)]
pub struct TrajectoryPlot {
    pub trajectory: Arc<Trajectory>,
    pub markers: Arc<MarkerArrays>,
}

impl TrajectoryPlot {
    /// Plotly figure with one `scatter3d` trace.
    pub fn to_plotly(&self) -> Value {
        let t = &self.trajectory;
        let m = &self.markers;
        let (r, g, b, _) = PATH_COLOR;
        let axis = |name: &str| json!({"title": {"text": name}, "showgrid": true, "gridcolor": "#e0e0e0"});
        json!({
            "data": [{
                "type": "scatter3d",
                "mode": "lines+markers",
                "x": t.x(),
                "y": t.y(),
                "z": t.z(),
                "marker": {
                    "size": m.sizes,
                    "color": t.matched_features(),
                    "cmin": m.color_range.0,
                    "cmax": m.color_range.1,
                    "colorscale": "Viridis",
                    "showscale": true,
                    "colorbar": {"title": {"text": FEATURES_LABEL}},
                },
                "line": {"color": format!("rgb({}, {}, {})", r, g, b), "width": PATH_WIDTH},
                "hoverinfo": "text",
                "text": m.hover,
            }],
            "layout": {
                "width": 850,
                "height": 650,
                "title": {"text": "Drone Trajectory", "font": {"size": 24}},
                "paper_bgcolor": "white",
                "plot_bgcolor": "white",
                "scene": {
                    "xaxis": axis("X"),
                    "yaxis": axis("Y"),
                    "zaxis": axis("Z"),
                    "camera": {"eye": {"x": 1.5, "y": 1.5, "z": 1.5}},
                },
            },
        })
    }
}

/// Matched features and confidence against frame index, two vertical axes.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityPlot {
    pub frames: Vec<usize>,
    pub matched_features: Vec<u64>,
    pub confidence_pct: Vec<f64>,
}

impl QualityPlot {
    pub fn from_trajectory(trajectory: &Trajectory) -> QualityPlot {
        QualityPlot {
            frames: (0..trajectory.len()).collect(),
            matched_features: trajectory.matched_features().to_vec(),
            confidence_pct: trajectory.confidence().iter().map(|c| c * 100.0).collect(),
        }
    }

    pub fn to_plotly(&self) -> Value {
        json!({
            "data": [
                {
                    "type": "scatter",
                    "mode": "lines+markers",
                    "x": self.frames,
                    "y": self.matched_features,
                    "name": FEATURES_LABEL,
                },
                {
                    "type": "scatter",
                    "mode": "lines+markers",
                    "x": self.frames,
                    "y": self.confidence_pct,
                    "name": CONFIDENCE_LABEL,
                    "yaxis": "y2",
                },
            ],
            "layout": {
                "width": 850,
                "height": 300,
                "title": {"text": "Feature Matching Quality"},
                "xaxis": {"title": {"text": "Frame"}},
                "yaxis": {"title": {"text": FEATURES_LABEL}},
                "yaxis2": {
                    "title": {"text": CONFIDENCE_LABEL},
                    "overlaying": "y",
                    "side": "right",
                },
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct Charts {
    pub trajectory: TrajectoryPlot,
    /// Present only while the features view is on.
    pub quality: Option<QualityPlot>,
}

/// Builds both charts from scratch.
pub fn render(trajectory: &Arc<Trajectory>, view: &ViewState) -> Charts {
    charts_with(trajectory, Arc::new(marker_arrays(trajectory)), view)
}

fn charts_with(trajectory: &Arc<Trajectory>, markers: Arc<MarkerArrays>, view: &ViewState) -> Charts {
    Charts {
        trajectory: TrajectoryPlot {
            trajectory: trajectory.clone(),
            markers,
        },
        quality: view
            .show_features
            .then(|| QualityPlot::from_trajectory(trajectory)),
    }
}

/// Renders charts, reusing marker arrays while the trajectory stays the same.
#[derive(Debug, Default)]
pub struct Visualizer {
    cached: Option<(Arc<Trajectory>, Arc<MarkerArrays>)>,
}

impl Visualizer {
    pub fn new() -> Visualizer {
        Visualizer::default()
    }

    pub fn markers(&mut self, trajectory: &Arc<Trajectory>) -> Arc<MarkerArrays> {
        if let Some((t, m)) = &self.cached {
            if Arc::ptr_eq(t, trajectory) {
                return m.clone();
            }
        }
        log::trace!("deriving markers for {} frames", trajectory.len());
        let markers = Arc::new(marker_arrays(trajectory));
        self.cached = Some((trajectory.clone(), markers.clone()));
        markers
    }

    pub fn render(&mut self, trajectory: &Arc<Trajectory>, view: &ViewState) -> Charts {
        let markers = self.markers(trajectory);
        charts_with(trajectory, markers, view)
    }
}

/// Logs the charts to a rerun recording under `topic`.
pub fn log_charts(
    recording: &RecordingStream,
    topic: &str,
    charts: &Charts,
) -> Result<(), RecordingStreamError> {
    let plot = &charts.trajectory;
    let positions: Vec<[f32; 3]> = plot
        .trajectory
        .frames()
        .map(|f| f.position.as_vec3().to_array())
        .collect();

    recording.log(
        format!("{}/path", topic),
        &rerun::LineStrips3D::new([positions.clone()])
            .with_colors([PATH_COLOR])
            .with_radii([rerun::Radius::new_ui_points(PATH_WIDTH / 2.0)]),
    )?;
    // plotly sizes are diameters
    let radii: Vec<_> = plot
        .markers
        .sizes
        .iter()
        .map(|s| rerun::Radius::new_ui_points(*s as f32 / 2.0))
        .collect();
    let labels: Vec<_> = plot
        .markers
        .hover
        .iter()
        .map(|h| h.replace("<br>", "\n"))
        .collect();
    recording.log(
        format!("{}/positions", topic),
        &rerun::Points3D::new(positions)
            .with_radii(radii)
            .with_colors(plot.markers.colors.clone())
            .with_labels(labels),
    )?;

    if let Some(quality) = &charts.quality {
        for ((frame, features), confidence) in quality
            .frames
            .iter()
            .zip(&quality.matched_features)
            .zip(&quality.confidence_pct)
        {
            recording.set_time("frame", TimeCell::from_sequence(*frame as i64));
            recording.log(
                format!("{}/quality/matched_features", topic),
                &rerun::Scalars::single(*features as f64),
            )?;
            recording.log(
                format!("{}/quality/confidence_pct", topic),
                &rerun::Scalars::single(*confidence),
            )?;
        }
    }
    Ok(())
}
