//! CLI Exit Code Registry
//!
//! Single source of truth for all exit codes. Exit codes are part of
//! the shell contract; cron wrappers and notification scripts key on
//! them.
//!
//! | Range | Domain    | Description                                |
//! |-------|-----------|--------------------------------------------|
//! | 0     | Universal | Success                                    |
//! | 1     | Universal | General error (unspecified)                |
//! | 2     | Universal | CLI usage error (bad args, missing file)   |
//! | 3-9   | Local     | Filesystem / parse / config errors         |
//! | 10-19 | Fetch     | Cost-source fetch errors                   |
//! | 20-29 | Upload    | Tracking upload errors                     |
#![allow(dead_code)]

/// Success.
pub const EXIT_SUCCESS: u8 = 0;

/// General error. Avoid; prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Filesystem error reading or writing local state.
pub const EXIT_IO: u8 = 3;

/// Parse error in an input file (trackings CSV, sheet, snapshot).
pub const EXIT_PARSE: u8 = 4;

/// Invalid or incomplete configuration.
pub const EXIT_CONFIG: u8 = 5;

/// Upstream cost source kept failing after retries.
pub const EXIT_FETCH_UPSTREAM: u8 = 10;

/// A cost report no longer matches its expected layout.
pub const EXIT_FETCH_FORMAT: u8 = 11;

/// A group with no configured source where one is required.
pub const EXIT_UNKNOWN_GROUP: u8 = 12;

/// Tracking upload kept failing after retries.
pub const EXIT_UPLOAD: u8 = 20;
