//! Advisory run lock
//!
//! Concurrent archival runs against the same archive root must be
//! serialized; overlapping batch cursors for one category would break the
//! write-before-delete discipline. The driver takes this lock for the
//! duration of an archive or cleanup run. It is advisory only: nothing
//! stops a process that does not take it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// Held lock file; removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the named lock under the archive root.
    ///
    /// Fails fast with [`EngineError::Locked`] when the lock file already
    /// exists. A lock left behind by a crashed run must be removed by the
    /// operator; the file records the owning pid to make that call easier.
    pub fn acquire(root: &std::path::Path, name: &str) -> EngineResult<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(format!(".{name}.lock"));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(EngineError::Locked(path.display().to_string()));
            }
            Err(e) => return Err(EngineError::LockIo(e)),
        };
        let _ = writeln!(file, "{}", std::process::id());
        Ok(Self { path })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove run lock");
        }
    }
}
