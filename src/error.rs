use thiserror::Error;

use crate::upload::UploadError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("rerun error: {0}")]
    Recording(#[from] rerun::RecordingStreamError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

pub type Result<T> = std::result::Result<T, Error>;
