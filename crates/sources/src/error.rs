use std::fmt;

#[derive(Debug)]
pub enum SourceError {
    /// Transient upstream failure (network, HTTP 5xx, truncated file).
    /// Eligible for retry.
    Upstream(String),
    /// The report no longer looks like what the normalizer expects.
    /// Never retried; the layout will not fix itself.
    Format(String),
    /// A group label with no configured source. Never retried.
    UnknownGroup(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream(msg) => write!(f, "upstream error: {msg}"),
            Self::Format(msg) => write!(f, "report format error: {msg}"),
            Self::UnknownGroup(group) => write!(f, "unknown group: {group}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<consigno_io::IoError> for SourceError {
    fn from(e: consigno_io::IoError) -> Self {
        Self::Upstream(e.to_string())
    }
}
