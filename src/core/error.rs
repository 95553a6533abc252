use std::path::PathBuf;
use thiserror::Error;

/// Fatal error taxonomy. Parsing and format errors are never recovered from;
/// empty inputs and isolated vertices are ordinary data states and never show up here.
#[derive(Error, Debug)]
pub enum PhyslrError {
    #[error("{}:{line_number}: unexpected header {line:?} (expected {expected})", path.display())]
    UnexpectedHeader {
        path: PathBuf,
        line_number: usize,
        line: String,
        expected: String,
    },

    #[error("{}:{line_number}: unexpected row {line:?} (expected {expected})", path.display())]
    UnexpectedRow {
        path: PathBuf,
        line_number: usize,
        line: String,
        expected: String,
    },

    #[error("{}: unexpected graph format starting with {start:?}", path.display())]
    UnknownInputFormat { path: PathBuf, start: String },

    #[error("unknown graph format: {0} (expected tsv or gv)")]
    UnknownOutputFormat(String),

    #[error("unsupported argument: {0}")]
    UnsupportedArgument(String),

    #[error("self-loop on vertex {0} is not allowed")]
    SelfLoop(String),

    #[error("edge {u} -- {v} has zero weight")]
    ZeroWeightEdge { u: String, v: String },

    #[error("Validation error: {field} is invalid: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl From<config::ConfigError> for PhyslrError {
    fn from(err: config::ConfigError) -> Self {
        PhyslrError::ConfigurationError {
            message: err.to_string(),
        }
    }
}
