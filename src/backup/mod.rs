//! Reversible system changes and the LIFO controller that restores them.
//!
//! Every mutation an action makes to the host is wrapped in a
//! [`RestorableChange`] and pushed through the run's single
//! [`BackupController`]. Rolling back walks the controller newest first.
pub mod controller;
pub mod files;

pub use controller::{BackupController, RollbackFailure};
pub use files::{MissingFile, RestorableFile};

use crate::types::errors::ChangeError;

/// One reversible mutation of the live system.
///
/// `enable` must remember whatever state `restore` needs to decide whether
/// undoing is necessary at all.
pub trait RestorableChange {
    /// Short human label used in logs and errors.
    fn name(&self) -> String;

    fn enabled(&self) -> bool;

    /// Apply or record the change. Calling it again after success is a no-op.
    ///
    /// # Errors
    /// Returns `ChangeError` when the pre-change state cannot be captured.
    fn enable(&mut self) -> Result<(), ChangeError>;

    /// Undo the change and mark it disabled. A no-op when never enabled.
    ///
    /// # Errors
    /// Returns `ChangeError` when the original state cannot be put back.
    fn restore(&mut self) -> Result<(), ChangeError>;
}
