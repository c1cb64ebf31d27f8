//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Appliance activation synthesis and calendar placement."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SynthError>;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("no pattern file found in {0}")]
    NotFound(PathBuf),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("pattern file {0} contains no templates")]
    EmptyTemplates(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pattern serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

impl SynthError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SynthError::InvalidArgument(message.into())
    }
}
