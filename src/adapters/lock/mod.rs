pub mod file;

pub use file::ApplicationLock;

use crate::types::errors::LockError;

/// Held for as long as the process lock is owned; dropping it releases the lock.
pub trait LockGuard: Send {}

pub trait LockManager: Send + Sync {
    /// Take the single-instance lock.
    /// # Errors
    /// Returns a `LockError` when another live process owns the lock or the
    /// lock file cannot be trusted.
    fn acquire_process_lock(&self) -> Result<Box<dyn LockGuard>, LockError>;
}
