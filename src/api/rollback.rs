use serde_json::json;

use crate::backup::{BackupController, RollbackFailure};
use crate::logging::StageLogger;
use crate::types::errors::{BackupError, ErrorId};

/// What a rollback sweep restored and what it could not.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Names of the changes processed, newest first.
    pub restored: Vec<String>,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Restore everything on the controller, newest first, emitting one
/// `rollback` fact per change. An empty controller yields an empty report.
pub(crate) fn sweep(backup: &mut BackupController, slog: &StageLogger<'_>) -> RollbackReport {
    let changes = match backup.pop_all() {
        Ok(changes) => changes,
        Err(BackupError::NothingToRestore) => {
            log::info!("No backups to restore");
            return RollbackReport::default();
        }
        Err(e) => {
            // pop_all only fails on an empty stack; keep going as if it were.
            log::warn!("rollback: {e}");
            return RollbackReport::default();
        }
    };
    let failures = backup.rollback_failures().to_vec();
    let mut restored = Vec::with_capacity(changes.len());
    for change in changes {
        let name = change.name();
        let failed = failures.iter().find(|f| f.change == name);
        let fact = slog.rollback().field("change", json!(name));
        match failed {
            Some(f) => fact.field("error", json!(f.error)).emit_failure(),
            None => fact.emit_success(),
        }
        restored.push(name);
    }
    RollbackReport { restored, failures }
}

pub(crate) fn emit_summary(slog: &StageLogger<'_>, report: &RollbackReport) {
    let fact = slog.rollback_summary().field(
        "counts",
        json!({"processed": report.restored.len(), "failed": report.failures.len()}),
    );
    if report.is_clean() {
        fact.emit_success();
    } else {
        let errors: Vec<String> = report.failures.iter().map(ToString::to_string).collect();
        fact.field("rollback_errors", json!(errors))
            .error_id(ErrorId::E_RESTORE_FAILED)
            .emit_failure();
    }
}
