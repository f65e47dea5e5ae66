use crate::error::Result;
use crate::types::Trajectory;

pub const CSV_FILE_NAME: &str = "drone_trajectory.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";
pub const CSV_HEADER: [&str; 6] = ["Frame", "X", "Y", "Z", "Confidence", "MatchedFeatures"];

/// A file offered to the operator for download.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl CsvExport {
    pub fn as_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

/// Shortest exact decimal form, with both zeros written as `0`.
fn number_text(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// One header row plus one row per frame, newline separated. The last frame
/// row has no trailing newline; a header-only export keeps its newline.
pub fn trajectory_to_csv(trajectory: &Trajectory) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for f in trajectory.frames() {
        writer.write_record([
            f.index.to_string(),
            number_text(f.position.x),
            number_text(f.position.y),
            number_text(f.position.z),
            number_text(f.confidence),
            f.matched_features.to_string(),
        ])?;
    }
    writer.flush()?;
    let mut bytes = writer.into_inner().map_err(|e| e.into_error())?;
    if !trajectory.is_empty() && bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(bytes)
}

/// Builds the download for the current trajectory, `None` when there is none.
pub fn export_csv(trajectory: Option<&Trajectory>) -> Result<Option<CsvExport>> {
    let Some(trajectory) = trajectory else {
        log::debug!("nothing to export");
        return Ok(None);
    };
    Ok(Some(CsvExport {
        file_name: CSV_FILE_NAME,
        content_type: CSV_CONTENT_TYPE,
        bytes: trajectory_to_csv(trajectory)?,
    }))
}
