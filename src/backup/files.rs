use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::RestorableChange;
use crate::types::errors::ChangeError;
use crate::types::outcome::CriticalError;

fn io_err<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> ChangeError + 'a {
    move |source| ChangeError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}

/// Where `file` is kept under `backup_dir`: a subdirectory named after the
/// SHA-256 of the file's parent path, so equal names in different
/// directories never collide.
#[must_use]
pub fn hashed_backup_path(backup_dir: &Path, file: &Path) -> PathBuf {
    let parent = file.parent().unwrap_or_else(|| Path::new("/"));
    let mut h = Sha256::new();
    h.update(parent.as_os_str().as_bytes());
    let dir = backup_dir.join(hex::encode(h.finalize()));
    match file.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    }
}

/// A file that existed before the conversion and must come back on rollback.
///
/// Enabling copies the file aside; restoring copies it back and removes the
/// copy. A path that does not exist yet is left alone by both.
#[derive(Debug)]
pub struct RestorableFile {
    path: PathBuf,
    backup_dir: PathBuf,
    backup_path: Option<PathBuf>,
    enabled: bool,
}

impl RestorableFile {
    /// # Errors
    /// `ChangeError::Invalid` when `path` is relative or a directory.
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Result<Self, ChangeError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(ChangeError::Invalid(format!(
                "{} needs to be an absolute path",
                path.display()
            )));
        }
        if path.is_dir() {
            return Err(ChangeError::Invalid(format!(
                "{} must be a file, not a directory",
                path.display()
            )));
        }
        Ok(Self {
            path,
            backup_dir: backup_dir.into(),
            backup_path: None,
            enabled: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    fn save(&self) -> std::io::Result<PathBuf> {
        let dest = hashed_backup_path(&self.backup_dir, &self.path);
        if let Some(dir) = dest.parent() {
            fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)?;
        }
        fs::copy(&self.path, &dest)?;
        Ok(dest)
    }
}

impl RestorableChange for RestorableFile {
    fn name(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<(), ChangeError> {
        if self.enabled {
            return Ok(());
        }
        log::info!("Backing up {}.", self.path.display());
        if !self.path.is_file() {
            log::info!("Can't find {}.", self.path.display());
            return Ok(());
        }
        let dest = self.save().map_err(|e| {
            CriticalError::new(
                "FAILED_TO_SAVE_FILE_TO_BACKUP_DIR",
                "Failed to copy file to the backup directory.",
                "Copying the current file has failed. The file could not be restored if the \
                 conversion fails, so it is unsafe to continue.",
            )
            .with_diagnosis(format!("Failed to backup {}: {e}", self.path.display()))
        })?;
        log::debug!("Copied {} to {}.", self.path.display(), dest.display());
        self.backup_path = Some(dest);
        self.enabled = true;
        Ok(())
    }

    fn restore(&mut self) -> Result<(), ChangeError> {
        let Some(backup) = self.backup_path.as_deref().filter(|_| self.enabled) else {
            log::info!("{} hasn't been backed up.", self.path.display());
            return Ok(());
        };
        if !backup.is_file() {
            log::info!("{} hasn't been backed up.", self.path.display());
            return Ok(());
        }
        log::info!("Rollback: Restore {} from backup", self.path.display());
        fs::copy(backup, &self.path).map_err(io_err("copy", &self.path))?;
        fs::remove_file(backup).map_err(io_err("remove", backup))?;
        log::info!("File {} restored.", self.path.display());
        self.backup_path = None;
        self.enabled = false;
        Ok(())
    }
}

/// A file absent before the conversion; rollback removes it if it appeared.
#[derive(Debug)]
pub struct MissingFile {
    path: PathBuf,
    enabled: bool,
}

impl MissingFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: false,
        }
    }
}

impl RestorableChange for MissingFile {
    fn name(&self) -> String {
        format!("missing file {}", self.path.display())
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn enable(&mut self) -> Result<(), ChangeError> {
        if self.enabled {
            return Ok(());
        }
        if self.path.is_file() {
            log::debug!(
                "The file {} is present on the system before conversion, skipping it.",
                self.path.display()
            );
            return Ok(());
        }
        log::info!("Marking file {} as missing on system.", self.path.display());
        self.enabled = true;
        Ok(())
    }

    fn restore(&mut self) -> Result<(), ChangeError> {
        if !self.enabled {
            return Ok(());
        }
        log::info!(
            "Rollback: Remove file created during conversion {}",
            self.path.display()
        );
        if self.path.is_file() {
            fs::remove_file(&self.path).map_err(io_err("remove", &self.path))?;
            log::info!("File {} removed", self.path.display());
        } else {
            log::info!("File {} wasn't created during conversion", self.path.display());
        }
        self.enabled = false;
        Ok(())
    }
}
