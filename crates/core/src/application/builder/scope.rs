// Directory Scope - guaranteed-release working directory acquisition
//
// The process working directory is never changed. A scope validates the
// directory, hands it to every step explicitly, and returns to idle when dropped.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Builder state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    DirectoryAcquired,
    Built,
}

/// Acquired build directory
#[derive(Debug)]
pub struct DirectoryScope {
    dir: PathBuf,
    phase: BuildPhase,
}

impl DirectoryScope {
    /// Acquire `dir`; fails if it is not an existing directory
    pub fn acquire(dir: impl AsRef<Path>) -> Result<Self, PathBuf> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(dir.to_path_buf());
        }

        debug!(dir = %dir.display(), "Acquired build directory");
        Ok(Self {
            dir: dir.to_path_buf(),
            phase: BuildPhase::DirectoryAcquired,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Directory of one benchmark inside the build root
    pub fn benchmark_dir(&self, benchmark: &str) -> Result<PathBuf, PathBuf> {
        let path = self.dir.join(benchmark);
        if path.is_dir() {
            Ok(path)
        } else {
            Err(path)
        }
    }

    pub fn mark_built(&mut self) {
        self.phase = BuildPhase::Built;
    }
}

impl Drop for DirectoryScope {
    fn drop(&mut self) {
        debug!(dir = %self.dir.display(), phase = ?self.phase, "Released build directory");
        self.phase = BuildPhase::Idle;
    }
}
