use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::export::CsvExport;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Writes an export into `dir` under its own file name, creating `dir` if needed.
pub fn save_export(dir: &Path, export: &CsvExport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export.file_name);
    std::fs::write(&path, &export.bytes)?;
    log::info!(
        "saved {} ({}, {} bytes)",
        path.display(),
        export.content_type,
        export.bytes.len()
    );
    Ok(path)
}
