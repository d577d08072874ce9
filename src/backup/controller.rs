use super::RestorableChange;
use crate::actions::boundary::contain;
use crate::types::errors::BackupError;

/// One change that could not be restored during a sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollbackFailure {
    pub change: String,
    pub error: String,
}

impl std::fmt::Display for RollbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.change, self.error)
    }
}

enum Entry {
    Change(Box<dyn RestorableChange>),
    Partition,
}

/// LIFO record of every change applied during a run, newest last.
///
/// Construct exactly one per run and hand it to whatever needs to mutate the
/// host; the engine owns it and lends it to actions.
///
/// A partition marks a recovery point: [`BackupController::pop_to_partition`]
/// restores only the changes pushed after it, so a caller can undo the newer
/// half, run its own restore step, then finish with [`BackupController::pop_all`].
#[derive(Default)]
pub struct BackupController {
    entries: Vec<Entry>,
    rollback_failures: Vec<RollbackFailure>,
}

impl BackupController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `change` and record it. Nothing is recorded if enabling fails.
    ///
    /// # Errors
    /// Returns `BackupError::Enable` carrying the change's error.
    pub fn push(&mut self, mut change: Box<dyn RestorableChange>) -> Result<(), BackupError> {
        let name = change.name();
        change
            .enable()
            .map_err(|source| BackupError::Enable {
                change: name.clone(),
                source,
            })?;
        log::debug!("backup: recorded {name}");
        self.entries.push(Entry::Change(change));
        Ok(())
    }

    /// Mark a recovery point for [`BackupController::pop_to_partition`].
    pub fn push_partition(&mut self) {
        self.entries.push(Entry::Partition);
    }

    /// Restore and return the most recently pushed change.
    ///
    /// Partitions pushed after it are discarded on the way.
    ///
    /// # Errors
    /// `NothingToRestore` when no change is recorded, `Restore` when the
    /// change fails to restore. A change that fails is not put back.
    pub fn pop(&mut self) -> Result<Box<dyn RestorableChange>, BackupError> {
        while let Some(entry) = self.entries.pop() {
            if let Entry::Change(mut change) = entry {
                change.restore().map_err(|source| BackupError::Restore {
                    change: change.name(),
                    source,
                })?;
                return Ok(change);
            }
        }
        Err(BackupError::NothingToRestore)
    }

    /// Restore every recorded change, newest first, continuing past failures.
    ///
    /// Failures are logged and kept in [`BackupController::rollback_failures`].
    /// Returns the changes in the order they were processed.
    ///
    /// # Errors
    /// `NothingToRestore` when the stack is empty or holds only partitions.
    pub fn pop_all(&mut self) -> Result<Vec<Box<dyn RestorableChange>>, BackupError> {
        if !self.has_changes() {
            self.entries.clear();
            return Err(BackupError::NothingToRestore);
        }
        self.rollback_failures.clear();
        let mut processed = Vec::new();
        while let Some(entry) = self.entries.pop() {
            if let Entry::Change(change) = entry {
                processed.push(self.restore_logged(change));
            }
        }
        Ok(processed)
    }

    /// Restore changes newest first until the nearest partition, which is removed.
    ///
    /// Without a partition every change is restored. Failures are handled as
    /// in [`BackupController::pop_all`].
    ///
    /// # Errors
    /// `NothingToRestore` on an empty stack.
    pub fn pop_to_partition(&mut self) -> Result<Vec<Box<dyn RestorableChange>>, BackupError> {
        if self.entries.is_empty() {
            return Err(BackupError::NothingToRestore);
        }
        self.rollback_failures.clear();
        let mut processed = Vec::new();
        while let Some(entry) = self.entries.pop() {
            match entry {
                Entry::Partition => break,
                Entry::Change(change) => processed.push(self.restore_logged(change)),
            }
        }
        Ok(processed)
    }

    /// A restore that errors or panics is recorded and the sweep goes on.
    fn restore_logged(&mut self, mut change: Box<dyn RestorableChange>) -> Box<dyn RestorableChange> {
        let error = match contain(|| change.restore()) {
            Ok(Ok(())) => return change,
            Ok(Err(e)) => e.to_string(),
            Err(caught) => format!("panicked: {}", caught.message),
        };
        let name = change.name();
        log::warn!("Error while rolling back {name}: {error}");
        self.rollback_failures.push(RollbackFailure { change: name, error });
        change
    }

    fn has_changes(&self) -> bool {
        self.entries.iter().any(|e| matches!(e, Entry::Change(_)))
    }

    /// Number of recorded changes, partitions excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Change(_)))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }

    /// Restore errors from the most recent sweep.
    #[must_use]
    pub fn rollback_failures(&self) -> &[RollbackFailure] {
        &self.rollback_failures
    }

    #[must_use]
    pub fn rollback_failed(&self) -> bool {
        !self.rollback_failures.is_empty()
    }
}
