use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_error, engine_info};

use crate::error::SwapError;
use crate::persist::{ensure_output_dir, remove_dir_if_exists, AtomicFileWriter, PersistError};

pub const LIVE_DIR_NAME: &str = "worddown-export";
pub const PENDING_DIR_NAME: &str = "worddown-export-pending";

const HTACCESS: &str = ".htaccess";
const HTACCESS_CONTENT: &str = "Options -Indexes\nDeny from all\n";
const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryRole {
    Live,
    Pending,
}

/// The live/pending export roots. New output is built under pending and promoted
/// with a single rename.
#[derive(Debug, Clone)]
pub struct ExportDirectory {
    live: PathBuf,
    pending: PathBuf,
}

impl ExportDirectory {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            live: base_dir.join(LIVE_DIR_NAME),
            pending: base_dir.join(PENDING_DIR_NAME),
        }
    }

    pub fn root(&self, role: DirectoryRole) -> &Path {
        match role {
            DirectoryRole::Live => &self.live,
            DirectoryRole::Pending => &self.pending,
        }
    }

    pub fn type_dir(&self, role: DirectoryRole, item_type: &str) -> PathBuf {
        self.root(role).join(item_type)
    }

    pub fn write_path(&self, role: DirectoryRole, item_type: &str, filename: &str) -> PathBuf {
        self.type_dir(role, item_type).join(filename)
    }

    pub fn setup_live(&self, item_types: &[String]) -> Result<(), PersistError> {
        self.setup(DirectoryRole::Live, item_types)
    }

    /// Idempotently create the pending root and one protected subdirectory per type.
    pub fn setup_pending(&self, item_types: &[String]) -> Result<(), PersistError> {
        self.setup(DirectoryRole::Pending, item_types)
    }

    fn setup(&self, role: DirectoryRole, item_types: &[String]) -> Result<(), PersistError> {
        let root = self.root(role);
        ensure_output_dir(root)?;
        protect(root)?;
        for item_type in item_types {
            let dir = self.type_dir(role, item_type);
            ensure_output_dir(&dir)?;
            protect(&dir)?;
        }
        Ok(())
    }

    /// Promote pending to live: remove live, then rename pending into its place.
    ///
    /// On failure pending is left on disk; live may be absent if the rename failed
    /// after removal.
    pub fn swap(&self) -> Result<(), SwapError> {
        if !self.pending.is_dir() {
            engine_error!("swap aborted: {} missing", self.pending.display());
            return Err(SwapError::PendingMissing(self.pending.clone()));
        }
        match fs::remove_dir_all(&self.live) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                engine_error!("swap failed removing {}: {}", self.live.display(), err);
                return Err(SwapError::RemoveLive(err));
            }
        }
        fs::rename(&self.pending, &self.live).map_err(|err| {
            engine_error!("swap failed renaming pending into place: {}", err);
            SwapError::Rename(err)
        })?;
        engine_info!("published export to {}", self.live.display());
        Ok(())
    }

    /// Remove the pending tree. Missing pending is a no-op.
    pub fn cleanup_pending(&self) -> Result<(), PersistError> {
        if remove_dir_if_exists(&self.pending)? {
            engine_debug!("removed {}", self.pending.display());
        }
        Ok(())
    }
}

fn protect(dir: &Path) -> Result<(), PersistError> {
    let writer = AtomicFileWriter::existing_dir(dir.to_path_buf());
    if !dir.join(HTACCESS).exists() {
        writer.write(HTACCESS, HTACCESS_CONTENT)?;
    }
    if !dir.join(INDEX_FILE).exists() {
        writer.write(INDEX_FILE, "")?;
    }
    Ok(())
}
