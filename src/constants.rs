//! Shared crate-wide constants for Crossgrade.
//!
//! Centralizes stable identifiers and default locations used across modules.
//! Severity codes live on [`crate::types::Severity`] because they are part of
//! its public contract.

/// Application name used for the lock file (`<lock_dir>/<name>.pid`) and log prefixes.
pub const DEFAULT_APP_NAME: &str = "crossgrade";

/// Runtime directory holding the single-instance PID file.
pub const DEFAULT_LOCK_DIR: &str = "/var/run/lock";

/// Directory where `RestorableFile` keeps copies of files it backs up.
/// Each file lands under a subdirectory named after the SHA-256 of its parent path.
pub const DEFAULT_BACKUP_DIR: &str = "/var/lib/crossgrade/backup";

/// How many times a stale lock file is reclaimed before giving up.
pub const DEFAULT_LOCK_RETRIES: u32 = 2;

/// Result id used when an action finishes without setting a result.
pub const SUCCESS_ID: &str = "SUCCESS";

/// Result id used for actions skipped because a dependency failed.
pub const SKIP_ID: &str = "SKIP";

/// Result id used when an action body returned an unstructured error or panicked.
pub const UNEXPECTED_ERROR_ID: &str = "UNEXPECTED_ERROR";

/// Where users are asked to report unexpected errors.
pub const BUG_REPORT_URL: &str = "https://github.com/crossgrade/crossgrade/issues";

/// Version of the structured facts envelope emitted by `logging::StageLogger`.
pub const FACTS_SCHEMA_VERSION: i64 = 1;

/// Subsystem label attached to every emitted fact.
pub const FACTS_SUBSYSTEM: &str = "crossgrade";
