use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use rustix::io::Errno;
use rustix::process::{test_kill_process, Pid};

use super::{LockGuard, LockManager};
use crate::types::errors::LockError;

/// PID-file lock keeping two runs from executing on one host.
///
/// The lock file `<lock_dir>/<name>.pid` holds the owner's process id and a
/// newline. It is created by hard-linking a fully written temporary file, so
/// it never exists half-written. A file naming a dead process is reclaimed,
/// at most `retries` times. Unreadable contents count as locked.
#[derive(Clone, Debug)]
pub struct ApplicationLock {
    name: String,
    pid: u32,
    pidfile: PathBuf,
    retries: u32,
}

enum Holder {
    Us,
    Gone,
    Dead(u32),
    Alive(u32),
}

impl ApplicationLock {
    #[must_use]
    pub fn new(name: &str, lock_dir: &Path, retries: u32) -> Self {
        Self {
            name: name.to_string(),
            pid: std::process::id(),
            pidfile: lock_dir.join(format!("{name}.pid")),
            retries,
        }
    }

    #[must_use]
    pub fn pidfile(&self) -> &Path {
        &self.pidfile
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn io_err(&self, source: std::io::Error) -> LockError {
        LockError::Io {
            path: self.pidfile.clone(),
            source,
        }
    }

    /// Create the lock file. `Ok(false)` when it already exists.
    fn try_create(&self) -> Result<bool, LockError> {
        let dir = self.pidfile.parent().unwrap_or_else(|| Path::new("."));
        let tmp = dir.join(format!(".{}.{}.tmp", self.name, self.pid));
        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&tmp)
            .and_then(|mut f| {
                f.write_all(format!("{}\n", self.pid).as_bytes())?;
                f.sync_all()
            });
        let linked = written.and_then(|()| fs::hard_link(&tmp, &self.pidfile));
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Pid recorded in the lock file, `None` when there is no file. Anything
    /// outside `1..=i32::MAX` cannot name a process and is invalid.
    fn recorded_pid(&self) -> Result<Option<u32>, LockError> {
        let contents = match fs::read_to_string(&self.pidfile) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        match contents.trim_end().parse::<u32>() {
            Ok(pid) if (1..=i32::MAX as u32).contains(&pid) => Ok(Some(pid)),
            _ => Err(LockError::InvalidContents {
                path: self.pidfile.clone(),
            }),
        }
    }

    fn holder(&self) -> Result<Holder, LockError> {
        let Some(pid) = self.recorded_pid()? else {
            return Ok(Holder::Gone);
        };
        if pid == self.pid {
            return Ok(Holder::Us);
        }
        Ok(if process_exists(pid) {
            Holder::Alive(pid)
        } else {
            Holder::Dead(pid)
        })
    }

    /// Take the lock, reclaiming it from dead owners.
    ///
    /// # Errors
    /// `HeldBy` when a live process owns it, `InvalidContents` when the file
    /// cannot be parsed, `Contended` when reclaiming keeps losing races.
    pub fn try_to_lock(&self) -> Result<(), LockError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            if self.try_create()? {
                log::debug!("{self}");
                return Ok(());
            }
            match self.holder()? {
                Holder::Us => return Ok(()),
                Holder::Alive(pid) => {
                    return Err(LockError::HeldBy {
                        path: self.pidfile.clone(),
                        pid,
                    })
                }
                Holder::Dead(pid) => {
                    log::info!(
                        "{} names process {pid}, which no longer exists; reclaiming",
                        self.pidfile.display()
                    );
                    self.safe_unlink()?;
                }
                Holder::Gone => {}
            }
            if attempts > self.retries {
                return Err(LockError::Contended {
                    path: self.pidfile.clone(),
                    attempts,
                });
            }
        }
    }

    /// Whether this process owns the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self.recorded_pid(), Ok(Some(pid)) if pid == self.pid)
    }

    fn safe_unlink(&self) -> Result<(), LockError> {
        match fs::remove_file(&self.pidfile) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Release the lock if this process holds it. Safe to call at any time.
    ///
    /// # Errors
    /// `Io` when the lock file exists but cannot be removed.
    pub fn unlock(&self) -> Result<(), LockError> {
        if !self.is_locked() {
            return Ok(());
        }
        self.safe_unlink()?;
        log::debug!("{self}");
        Ok(())
    }
}

impl fmt::Display for ApplicationLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_locked() { "locked" } else { "unlocked" };
        write!(f, "{} PID {} {status}", self.pidfile.display(), self.pid)
    }
}

/// Signal 0 probe. Only ESRCH means the process is gone; anything else,
/// EPERM included, means it exists.
fn process_exists(pid: u32) -> bool {
    let Some(pid) = i32::try_from(pid).ok().and_then(Pid::from_raw) else {
        return false;
    };
    match test_kill_process(pid) {
        Ok(()) => true,
        Err(e) => e != Errno::SRCH,
    }
}

struct PidFileGuard {
    lock: ApplicationLock,
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            log::warn!("releasing {}: {e}", self.lock.pidfile.display());
        }
    }
}

impl LockGuard for PidFileGuard {}

impl LockManager for ApplicationLock {
    fn acquire_process_lock(&self) -> Result<Box<dyn LockGuard>, LockError> {
        self.try_to_lock()?;
        Ok(Box::new(PidFileGuard { lock: self.clone() }))
    }
}
