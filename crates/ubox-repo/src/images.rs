//! Image bookkeeping under `repos/`.
//!
//! An image tag lives in `repos/<name>/<tag>/` and is recognized by its
//! `TAG` marker file. Names may contain `/`, so the tree is walked
//! recursively.

use std::path::{Path, PathBuf};

use ubox_common::constants::TAG_MARKER;
use ubox_common::error::{Result, UboxError};
use ubox_common::types::ImageRef;

use crate::repository::LocalRepository;

/// An image tag found in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Image name and tag.
    pub image: ImageRef,
    /// Tag directory.
    pub path: PathBuf,
    /// Whether the tag carries a protection marker.
    pub protected: bool,
}

impl LocalRepository {
    /// Returns the directory of an image tag, whether or not it exists.
    #[must_use]
    pub fn image_dir(&self, image: &ImageRef) -> PathBuf {
        self.repos_dir().join(&image.name).join(&image.tag)
    }

    /// Returns the tag directory if the image is stored.
    #[must_use]
    pub fn find_image(&self, image: &ImageRef) -> Option<PathBuf> {
        let dir = self.image_dir(image);
        dir.join(TAG_MARKER).is_file().then_some(dir)
    }

    #[cfg(any(test, feature = "test_hooks"))]
    /// Registers an empty image tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag already exists or cannot be created.
    pub fn add_image(&self, image: &ImageRef) -> Result<PathBuf> {
        if self.find_image(image).is_some() {
            return Err(UboxError::AlreadyExists {
                kind: "image",
                id: image.to_string(),
            });
        }
        let dir = self.image_dir(image);
        std::fs::create_dir_all(&dir).map_err(|e| UboxError::io(&dir, e))?;
        let marker = dir.join(TAG_MARKER);
        std::fs::write(&marker, image.to_string()).map_err(|e| UboxError::io(marker, e))?;
        tracing::info!(image = %image, "image registered");
        Ok(dir)
    }

    /// Lists every stored image tag, sorted by name then tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the `repos/` tree cannot be read.
    pub fn list_images(&self) -> Result<Vec<ImageEntry>> {
        let root = self.repos_dir();
        let mut found = Vec::new();
        if root.is_dir() {
            collect_tags(&root, &root, &mut found)?;
        }
        found.sort_by(|a, b| a.image.to_string().cmp(&b.image.to_string()));
        Ok(found)
    }

    /// Deletes an image tag and prunes emptied parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is missing, protected, or cannot be removed.
    pub fn del_image(&self, image: &ImageRef) -> Result<()> {
        let dir = self.find_image(image).ok_or_else(|| UboxError::NotFound {
            kind: "image",
            id: image.to_string(),
        })?;
        if Self::is_protected(&dir) {
            return Err(UboxError::Protected {
                kind: "image",
                id: image.to_string(),
            });
        }
        std::fs::remove_dir_all(&dir).map_err(|e| UboxError::io(&dir, e))?;

        let root = self.repos_dir();
        let mut parent = dir.parent();
        while let Some(p) = parent.filter(|p| *p != root.as_path()) {
            if std::fs::remove_dir(p).is_err() {
                break;
            }
            parent = p.parent();
        }
        tracing::info!(image = %image, "image deleted");
        Ok(())
    }
}

fn collect_tags(root: &Path, dir: &Path, found: &mut Vec<ImageEntry>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| UboxError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| UboxError::io(dir, e))?.path();
        if !path.is_dir() {
            continue;
        }
        if path.join(TAG_MARKER).is_file() {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let tag = relative.file_name().map(|t| t.to_string_lossy().into_owned());
            let name = relative.parent().map(|n| n.to_string_lossy().into_owned());
            if let (Some(name), Some(tag)) = (name.filter(|n| !n.is_empty()), tag) {
                found.push(ImageEntry {
                    image: ImageRef { name, tag },
                    protected: LocalRepository::is_protected(&path),
                    path,
                });
            }
        } else {
            collect_tags(root, &path, found)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> (tempfile::TempDir, LocalRepository) {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = LocalRepository::new(dir.path());
        repo.create_repo().expect("create");
        (dir, repo)
    }

    fn image(spec: &str) -> ImageRef {
        spec.parse().expect("image ref")
    }

    #[test]
    fn list_images_empty_repo() {
        let (_dir, repo) = repo();
        assert!(repo.list_images().expect("list").is_empty());
    }

    #[test]
    fn list_images_finds_nested_names_sorted() {
        let (_dir, repo) = repo();
        let _ = repo.add_image(&image("library/ubuntu:22.04")).expect("add");
        let _ = repo.add_image(&image("alpine")).expect("add");
        let listed: Vec<String> = repo
            .list_images()
            .expect("list")
            .into_iter()
            .map(|e| e.image.to_string())
            .collect();
        assert_eq!(listed, vec!["alpine:latest", "library/ubuntu:22.04"]);
    }

    #[test]
    fn add_image_twice_fails() {
        let (_dir, repo) = repo();
        let _ = repo.add_image(&image("alpine")).expect("add");
        assert!(matches!(
            repo.add_image(&image("alpine")),
            Err(UboxError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn del_image_prunes_empty_parents() {
        let (_dir, repo) = repo();
        let _ = repo.add_image(&image("org/app:1")).expect("add");
        repo.del_image(&image("org/app:1")).expect("delete");
        assert!(!repo.repos_dir().join("org").exists());
        assert!(repo.repos_dir().is_dir());
    }

    #[test]
    fn del_image_refuses_protected() {
        let (_dir, repo) = repo();
        let dir = repo.add_image(&image("alpine")).expect("add");
        LocalRepository::protect(&dir).expect("protect");
        assert!(matches!(
            repo.del_image(&image("alpine")),
            Err(UboxError::Protected { .. })
        ));
        assert!(repo.find_image(&image("alpine")).is_some());
    }

    #[test]
    fn del_image_missing_is_not_found() {
        let (_dir, repo) = repo();
        assert!(matches!(
            repo.del_image(&image("ghost")),
            Err(UboxError::NotFound { .. })
        ));
    }
}
