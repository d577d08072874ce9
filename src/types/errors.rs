//! Error types used across Crossgrade.
//!
//! Structural errors (`EngineError` and the errors it wraps) are programming or
//! configuration defects and always stop the run. Failures of individual
//! actions never surface here; they are carried as `ActionResult` data.
use std::path::PathBuf;

use thiserror::Error;

use super::outcome::CriticalError;

/// Raised when the resolver cannot place every action.
///
/// `unresolved` lists, sorted by id, each action whose dependencies are
/// missing or circular.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Unsatisfied dependencies in these actions: {}", .unresolved.join(", "))]
pub struct DependencyError {
    pub unresolved: Vec<String>,
}

impl DependencyError {
    #[must_use]
    pub fn new(mut unresolved: Vec<String>) -> Self {
        unresolved.sort();
        Self { unresolved }
    }
}

/// An `ActionResult` or `ActionMessage` was built with an inconsistent set of fields.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("an id is required")]
    MissingId,
    #[error("{0} is reserved for messages and cannot be a result")]
    ResultSeverity(&'static str),
    #[error("{0} is not a message level; use INFO or WARNING")]
    MessageSeverity(&'static str),
    #[error("SUCCESS results must not carry {0}")]
    SuccessWithDetail(&'static str),
    #[error("{severity} requires a non-empty {field}")]
    MissingField {
        severity: &'static str,
        field: &'static str,
    },
}

/// Errors raised by a concrete `RestorableChange`.
#[derive(Debug, Error)]
pub enum ChangeError {
    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid change: {0}")]
    Invalid(String),
    #[error(transparent)]
    Critical(#[from] CriticalError),
}

/// Errors raised by the backup controller.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("No backups to restore")]
    NothingToRestore,
    #[error("enabling {change} failed: {source}")]
    Enable {
        change: String,
        #[source]
        source: ChangeError,
    },
    #[error("restoring {change} failed: {source}")]
    Restore {
        change: String,
        #[source]
        source: ChangeError,
    },
}

/// Errors raised while taking or releasing the single-instance lock.
///
/// Every variant except `Io` means another instance owns the lock, or the
/// lock file cannot be trusted; both are treated as locked.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("{} locked by process {pid}", .path.display())]
    HeldBy { path: PathBuf, pid: u32 },
    #[error("{} has invalid contents", .path.display())]
    InvalidContents { path: PathBuf },
    #[error("{} still contended after {attempts} attempts", .path.display())]
    Contended { path: PathBuf, attempts: u32 },
    #[error("lock file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        !matches!(self, LockError::Io { .. })
    }
}

/// Structural errors that stop a run before or instead of producing results.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error("Action {0} has already run")]
    ActionAlreadyRun(String),
    #[error("Stage {0} has already run")]
    StageAlreadyRun(String),
    #[error("Action {id} is registered more than once (again in stage {stage})")]
    DuplicateAction { id: String, stage: String },
    #[error("single-instance lock: {0}")]
    Locked(#[from] LockError),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error("rollback is not possible once {0} has been reached")]
    PastPointOfNoReturn(&'static str),
}

impl EngineError {
    #[must_use]
    pub fn error_id(&self) -> ErrorId {
        match self {
            EngineError::Dependency(_) | EngineError::DuplicateAction { .. } => {
                ErrorId::E_DEPENDENCY
            }
            EngineError::ActionAlreadyRun(_) | EngineError::StageAlreadyRun(_) => {
                ErrorId::E_ALREADY_RUN
            }
            EngineError::Locked(e) if e.is_locked() => ErrorId::E_LOCKED,
            EngineError::Locked(_) => ErrorId::E_LOCK_IO,
            EngineError::Backup(BackupError::NothingToRestore) => ErrorId::E_NOTHING_TO_RESTORE,
            EngineError::Backup(_) => ErrorId::E_RESTORE_FAILED,
            EngineError::PastPointOfNoReturn(_) => ErrorId::E_GENERIC,
        }
    }
}

// Stable identifiers emitted in facts and used for process exit codes.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_DEPENDENCY,
    E_LOCKED,
    E_LOCK_IO,
    E_NOTHING_TO_RESTORE,
    E_RESTORE_FAILED,
    E_ALREADY_RUN,
    E_GENERIC,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_DEPENDENCY => "E_DEPENDENCY",
        ErrorId::E_LOCKED => "E_LOCKED",
        ErrorId::E_LOCK_IO => "E_LOCK_IO",
        ErrorId::E_NOTHING_TO_RESTORE => "E_NOTHING_TO_RESTORE",
        ErrorId::E_RESTORE_FAILED => "E_RESTORE_FAILED",
        ErrorId::E_ALREADY_RUN => "E_ALREADY_RUN",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_DEPENDENCY => 10,
        ErrorId::E_LOCKED => 30,
        ErrorId::E_LOCK_IO => 31,
        ErrorId::E_NOTHING_TO_RESTORE => 60,
        ErrorId::E_RESTORE_FAILED => 70,
        ErrorId::E_ALREADY_RUN => 80,
        ErrorId::E_GENERIC => 1,
    }
}

/// Convenient alias for results returning an `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;
