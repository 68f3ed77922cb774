//! Repository root layout and validity.
//!
//! A repository is valid when every directory of its layout exists under
//! the root. Creation is idempotent.

use std::path::{Path, PathBuf};

use ubox_common::constants::{
    BIN_DIR, CONTAINERS_DIR, INSTALL_MARKER, LAYERS_DIR, LIB_DIR, PROTECT_MARKER, REPOS_DIR,
};
use ubox_common::error::{Result, UboxError};

/// Handle on a local repository rooted at `topdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRepository {
    /// Root directory for all stored data.
    topdir: PathBuf,
}

impl LocalRepository {
    /// Creates a handle. Nothing is touched on disk.
    #[must_use]
    pub fn new(topdir: impl Into<PathBuf>) -> Self {
        Self {
            topdir: topdir.into(),
        }
    }

    /// Returns the repository root.
    #[must_use]
    pub fn topdir(&self) -> &Path {
        &self.topdir
    }

    /// Directory holding `repo/tag` image metadata.
    #[must_use]
    pub fn repos_dir(&self) -> PathBuf {
        self.topdir.join(REPOS_DIR)
    }

    /// Directory holding image layers.
    #[must_use]
    pub fn layers_dir(&self) -> PathBuf {
        self.topdir.join(LAYERS_DIR)
    }

    /// Directory holding containers and their names.
    #[must_use]
    pub fn containers_dir(&self) -> PathBuf {
        self.topdir.join(CONTAINERS_DIR)
    }

    /// Directory holding provisioned executables.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.topdir.join(BIN_DIR)
    }

    /// Directory holding provisioned libraries.
    #[must_use]
    pub fn lib_dir(&self) -> PathBuf {
        self.topdir.join(LIB_DIR)
    }

    /// Path of the marker written by a completed install.
    #[must_use]
    pub fn install_marker(&self) -> PathBuf {
        self.lib_dir().join(INSTALL_MARKER)
    }

    fn layout(&self) -> [PathBuf; 5] {
        [
            self.repos_dir(),
            self.layers_dir(),
            self.containers_dir(),
            self.bin_dir(),
            self.lib_dir(),
        ]
    }

    /// Checks whether the root holds a complete repository layout.
    #[must_use]
    pub fn is_repo(&self) -> bool {
        self.layout().iter().all(|dir| dir.is_dir())
    }

    /// Creates the root and every layout directory that is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn create_repo(&self) -> Result<()> {
        tracing::info!(path = %self.topdir.display(), "creating repository");
        for dir in self.layout() {
            std::fs::create_dir_all(&dir).map_err(|e| UboxError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Checks whether `dir` carries a protection marker.
    #[must_use]
    pub fn is_protected(dir: &Path) -> bool {
        dir.join(PROTECT_MARKER).exists()
    }

    /// Marks `dir` as protected.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    pub fn protect(dir: &Path) -> Result<()> {
        let marker = dir.join(PROTECT_MARKER);
        std::fs::write(&marker, b"").map_err(|e| UboxError::io(marker, e))
    }

    /// Removes the protection marker from `dir`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing marker cannot be removed.
    pub fn unprotect(dir: &Path) -> Result<()> {
        let marker = dir.join(PROTECT_MARKER);
        match std::fs::remove_file(&marker) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(UboxError::io(marker, e)),
            _ => Ok(()),
        }
    }

    /// Sums the size of the regular files below `dir`, not following links.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be read.
    pub fn disk_usage(dir: &Path) -> Result<u64> {
        let mut total = 0;
        let entries = std::fs::read_dir(dir).map_err(|e| UboxError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| UboxError::io(dir, e))?;
            let meta = entry
                .path()
                .symlink_metadata()
                .map_err(|e| UboxError::io(entry.path(), e))?;
            if meta.is_dir() {
                total += Self::disk_usage(&entry.path())?;
            } else if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_directory_is_not_a_repo() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!LocalRepository::new(dir.path()).is_repo());
    }

    #[test]
    fn create_repo_makes_it_valid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = LocalRepository::new(dir.path().join("nested/root"));
        repo.create_repo().expect("create");
        assert!(repo.is_repo());
        assert!(repo.containers_dir().is_dir());
    }

    #[test]
    fn create_repo_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = LocalRepository::new(dir.path());
        repo.create_repo().expect("first");
        repo.create_repo().expect("second");
        assert!(repo.is_repo());
    }

    #[test]
    fn partial_layout_is_not_a_repo() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = LocalRepository::new(dir.path());
        repo.create_repo().expect("create");
        std::fs::remove_dir(repo.lib_dir()).expect("rmdir");
        assert!(!repo.is_repo());
    }

    #[test]
    fn protect_and_unprotect_toggle_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        LocalRepository::protect(dir.path()).expect("protect");
        assert!(LocalRepository::is_protected(dir.path()));
        LocalRepository::unprotect(dir.path()).expect("unprotect");
        assert!(!LocalRepository::is_protected(dir.path()));
        LocalRepository::unprotect(dir.path()).expect("unprotect twice");
    }

    #[test]
    fn disk_usage_sums_nested_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("a/b")).expect("mkdir");
        std::fs::write(dir.path().join("a/one"), [0_u8; 10]).expect("write");
        std::fs::write(dir.path().join("a/b/two"), [0_u8; 5]).expect("write");
        assert_eq!(LocalRepository::disk_usage(dir.path()).expect("du"), 15);
    }
}
