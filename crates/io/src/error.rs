use std::fmt;

#[derive(Debug)]
pub enum IoError {
    /// Filesystem error (read, write, rename).
    Io(String),
    /// Snapshot (de)serialization error.
    Json(String),
    /// CSV read/write error.
    Csv(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Json(msg) => write!(f, "snapshot error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}
