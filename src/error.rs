use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures that abort a search.
///
/// Search *outcomes* (no trail below the weight bound, rejected switches, time-outs) are not
/// errors and are reported through the outcome types of the individual computations instead.
///
/// The error carries messages rather than source errors so that it can be cloned and cached
/// inside resumable computation state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid cipher model: {0}")]
    Configuration(String),
    #[error("solver `{program}` failed: {message}")]
    Solver { program: String, message: String },
    #[error("cannot parse solver output: {0}")]
    Parse(String),
    #[error("inconsistent solution count: {0}")]
    InconsistentCount(String),
    #[error("i/o error on `{}`: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl SearchError {
    pub fn io(path: &Path, error: std::io::Error) -> SearchError {
        SearchError::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }

    pub fn solver(program: &str, message: impl Into<String>) -> SearchError {
        SearchError::Solver {
            program: program.to_string(),
            message: message.into(),
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;
