use std::fmt;

use crate::error::SourceError;

/// Cost fetches involve portal exports and flaky upstreams.
pub const COST_FETCH_ATTEMPTS: u32 = 5;
/// Uploads are cheap and idempotent upstream, so they get more tries.
pub const UPLOAD_ATTEMPTS: u32 = 10;

/// A retried operation that never succeeded, carrying the last
/// underlying failure.
#[derive(Debug)]
pub struct RetryError {
    pub op: String,
    pub attempts: u32,
    pub last: SourceError,
}

impl fmt::Display for RetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempts: {}",
            self.op, self.attempts, self.last
        )
    }
}

impl std::error::Error for RetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}

/// Run `f` up to `attempts` times, immediately, logging each failure.
///
/// Only transient errors are retried: a format or configuration error
/// comes back on the first attempt, wrapped the same way so callers
/// see one error type.
pub fn with_retry<T>(
    op: &str,
    attempts: u32,
    mut f: impl FnMut() -> Result<T, SourceError>,
) -> Result<T, RetryError> {
    let mut tried = 0;
    loop {
        tried += 1;
        match f() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && tried < attempts => {
                eprintln!("warning: {op} attempt {tried}/{attempts} failed: {e}");
            }
            Err(e) => {
                return Err(RetryError {
                    op: op.to_string(),
                    attempts: tried,
                    last: e,
                })
            }
        }
    }
}
