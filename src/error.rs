//! Error types for the analysis pipeline.
//!
//! Only I/O and parse failures surface as errors, and only at the
//! per-file boundary; the pipeline driver demotes them to recorded
//! warnings so one bad file never aborts a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: {message}")]
    Parse { file: String, message: String },

    #[error("schema parse failed: {0}")]
    Schema(String),
}

impl AnalyzeError {
    pub fn parse(file: &str, message: impl Into<String>) -> Self {
        AnalyzeError::Parse {
            file: file.to_string(),
            message: message.into(),
        }
    }
}
