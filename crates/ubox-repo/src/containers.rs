//! Container bookkeeping under `containers/`.
//!
//! Each container is a directory named by its id. Names are symbolic links
//! in the same directory pointing at the id.

use std::ffi::OsStr;
use std::os::unix::fs::symlink;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ubox_common::constants::{CONTAINER_METADATA, CONTAINER_ROOTFS, MAX_NAME_LENGTH};
use ubox_common::error::{Result, UboxError};
use ubox_common::types::ContainerId;

use crate::repository::LocalRepository;

/// Persistent metadata of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerMetadata {
    /// Image the container was created from.
    pub image: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A container found in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Container identifier.
    pub id: ContainerId,
    /// Names pointing at the container, sorted.
    pub names: Vec<String>,
    /// Source image, when metadata is present.
    pub image: Option<String>,
    /// Whether the container carries a protection marker.
    pub protected: bool,
    /// Container directory.
    pub path: PathBuf,
}

/// Checks a container name: alphanumeric first character, then
/// alphanumerics, `_`, `.` or `-`.
///
/// # Errors
///
/// Returns [`UboxError::InvalidName`] when the name is rejected.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_NAME_LENGTH
        && chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(UboxError::InvalidName {
            name: name.to_string(),
        })
    }
}

impl LocalRepository {
    /// Returns the directory of a container, whether or not it exists.
    #[must_use]
    pub fn container_dir(&self, id: &ContainerId) -> PathBuf {
        self.containers_dir().join(id.as_str())
    }

    /// Returns the root filesystem directory of a container.
    #[must_use]
    pub fn container_rootfs(&self, id: &ContainerId) -> PathBuf {
        self.container_dir(id).join(CONTAINER_ROOTFS)
    }

    #[cfg(any(test, feature = "test_hooks"))]
    /// Creates a container directory with its metadata and an empty rootfs.
    ///
    /// # Errors
    ///
    /// Returns an error if the container exists or cannot be written.
    pub fn add_container(&self, id: &ContainerId, image: &str) -> Result<PathBuf> {
        let dir = self.container_dir(id);
        if dir.exists() {
            return Err(UboxError::AlreadyExists {
                kind: "container",
                id: id.to_string(),
            });
        }
        let rootfs = self.container_rootfs(id);
        std::fs::create_dir_all(&rootfs).map_err(|e| UboxError::io(&rootfs, e))?;
        let metadata = ContainerMetadata {
            image: image.to_string(),
            created_at: Utc::now(),
        };
        let path = dir.join(CONTAINER_METADATA);
        let json = serde_json::to_vec_pretty(&metadata)?;
        std::fs::write(&path, json).map_err(|e| UboxError::io(path, e))?;
        tracing::info!(id = %id, image, "container registered");
        Ok(dir)
    }

    /// Resolves a container id or name to the id of an existing container.
    #[must_use]
    pub fn resolve_container(&self, id_or_name: &str) -> Option<ContainerId> {
        if id_or_name.is_empty() || id_or_name.contains('/') || id_or_name.starts_with('.') {
            return None;
        }
        let path = self.containers_dir().join(id_or_name);
        let meta = path.symlink_metadata().ok()?;
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&path).ok()?;
            let id = target.file_name()?.to_string_lossy().into_owned();
            self.container_dir(&ContainerId::new(&id))
                .is_dir()
                .then(|| ContainerId::new(id))
        } else if meta.is_dir() {
            Some(ContainerId::new(id_or_name))
        } else {
            None
        }
    }

    /// Reads a container's metadata, `None` when it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata file exists but cannot be parsed.
    pub fn container_metadata(&self, id: &ContainerId) -> Result<Option<ContainerMetadata>> {
        let path = self.container_dir(id).join(CONTAINER_METADATA);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read(&path).map_err(|e| UboxError::io(&path, e))?;
        Ok(Some(serde_json::from_slice(&content)?))
    }

    /// Lists the names pointing at a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the containers directory cannot be read.
    pub fn container_names(&self, id: &ContainerId) -> Result<Vec<String>> {
        let dir = self.containers_dir();
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| UboxError::io(&dir, e))? {
            let path = entry.map_err(|e| UboxError::io(&dir, e))?.path();
            let points_here = std::fs::read_link(&path)
                .ok()
                .is_some_and(|target| target.file_name() == Some(OsStr::new(id.as_str())));
            if points_here {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Lists containers sorted by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the containers directory or a metadata file
    /// cannot be read.
    pub fn list_containers(&self) -> Result<Vec<ContainerEntry>> {
        let dir = self.containers_dir();
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| UboxError::io(&dir, e))? {
            let entry = entry.map_err(|e| UboxError::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| UboxError::io(entry.path(), e))?;
            if !file_type.is_dir() {
                continue;
            }
            let id = ContainerId::new(entry.file_name().to_string_lossy());
            found.push(ContainerEntry {
                names: self.container_names(&id)?,
                image: self.container_metadata(&id)?.map(|m| m.image),
                protected: Self::is_protected(&entry.path()),
                path: entry.path(),
                id,
            });
        }
        found.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(found)
    }

    /// Attaches `name` to a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or taken, or the container
    /// does not exist.
    pub fn set_name(&self, id: &ContainerId, name: &str) -> Result<()> {
        validate_name(name)?;
        if !self.container_dir(id).is_dir() {
            return Err(UboxError::NotFound {
                kind: "container",
                id: id.to_string(),
            });
        }
        let link = self.containers_dir().join(name);
        if link.symlink_metadata().is_ok() {
            return Err(UboxError::AlreadyExists {
                kind: "name",
                id: name.to_string(),
            });
        }
        symlink(id.as_str(), &link).map_err(|e| UboxError::io(link, e))?;
        tracing::debug!(id = %id, name, "container named");
        Ok(())
    }

    /// Removes a container name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not exist or cannot be removed.
    pub fn del_name(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let link = self.containers_dir().join(name);
        let is_link = link
            .symlink_metadata()
            .is_ok_and(|m| m.file_type().is_symlink());
        if !is_link {
            return Err(UboxError::NotFound {
                kind: "name",
                id: name.to_string(),
            });
        }
        std::fs::remove_file(&link).map_err(|e| UboxError::io(link, e))
    }

    /// Deletes a container together with its names.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is missing, protected, or cannot
    /// be removed.
    pub fn del_container(&self, id: &ContainerId) -> Result<()> {
        let dir = self.container_dir(id);
        if !dir.is_dir() {
            return Err(UboxError::NotFound {
                kind: "container",
                id: id.to_string(),
            });
        }
        if Self::is_protected(&dir) {
            return Err(UboxError::Protected {
                kind: "container",
                id: id.to_string(),
            });
        }
        for name in self.container_names(id)? {
            self.del_name(&name)?;
        }
        std::fs::remove_dir_all(&dir).map_err(|e| UboxError::io(dir, e))?;
        tracing::info!(id = %id, "container deleted");
        Ok(())
    }
}
