use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Recursively delete `dir`. Missing directories are not an error.
pub fn remove_dir_if_exists(dir: &Path) -> Result<bool, PersistError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(PersistError::Io(err)),
    }
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
    create_dir: bool,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            create_dir: true,
        }
    }

    /// Writer that refuses to create `dir`. Used for the pending export tree, which
    /// must not be resurrected by a late write after the batch discarded it.
    pub fn existing_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            create_dir: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        if self.create_dir {
            ensure_output_dir(&self.dir)?;
        } else if !self.dir.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} does not exist",
                self.dir.display()
            )));
        }

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Rename over an existing file so regenerating an item stays idempotent.
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
