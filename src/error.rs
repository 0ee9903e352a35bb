use std::path::PathBuf;

use thiserror::Error;

/// Every failure the library can report. The binary decides how to present
/// them; nothing below `main` exits the process.
#[derive(Error, Debug)]
pub enum LogsError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Signing error: {0}")]
    Signing(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("I/O error on '{}': {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LogsError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LogsError::LocalIo {
            path: path.into(),
            source,
        }
    }
}
