pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod io;
pub mod normalizer;
pub mod types;
pub mod upload;
pub mod visualization;

pub use error::{Error, Result};
