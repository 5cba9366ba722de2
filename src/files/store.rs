//! Static resource store.
//!
//! # Responsibilities
//! - Map a request target to a file under the root
//! - Reject unlisted extensions before touching the filesystem
//! - Keep every resolved path inside the root, symlinks included
//!
//! # Design Decisions
//! - Query and fragment are not part of the file name
//! - `..` is resolved lexically; climbing above the root is rejected, not clamped
//! - The canonical root is computed once at construction

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs::File;

use crate::config::FilesConfig;
use crate::files::mime::MimeTable;
use crate::http::error::{HttpError, HttpResult};

/// A request target resolved against the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Target as received, for error reports.
    pub target: String,
    /// Normalized path relative to the root.
    pub relative: PathBuf,
    /// Root joined with `relative`.
    pub path: PathBuf,
    pub content_type: String,
}

/// Files under one root, restricted to an extension allow-list.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
    mime: MimeTable,
}

impl ResourceStore {
    /// Open the store; fails if the root does not exist.
    pub fn new(config: &FilesConfig) -> io::Result<Self> {
        let root = std::fs::canonicalize(&config.root)?;
        tracing::info!(root = %root.display(), types = config.mime_types.len(), "Resource store ready");
        Ok(Self {
            root,
            mime: MimeTable::new(config.mime_types.clone()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a target without any filesystem access.
    pub fn resolve(&self, target: &str) -> HttpResult<Resource> {
        let path_part = target.split(['?', '#']).next().unwrap_or_default();

        let content_type = self
            .mime
            .content_type(Path::new(path_part))
            .ok_or_else(|| HttpError::UnsupportedExtension(target.to_string()))?
            .to_string();

        let relative = normalize(path_part).ok_or_else(|| HttpError::PathTraversalRejected(target.to_string()))?;

        Ok(Resource {
            target: target.to_string(),
            path: self.root.join(&relative),
            relative,
            content_type,
        })
    }

    /// Open an existing regular file for reading.
    pub async fn open(&self, resource: &Resource) -> HttpResult<File> {
        let not_found = || HttpError::NotFound(resource.relative.clone());

        let real = tokio::fs::canonicalize(&resource.path).await.map_err(|_| not_found())?;
        self.ensure_contained(&real, resource)?;

        let file = File::open(&real).await.map_err(|_| not_found())?;
        let meta = file.metadata().await.map_err(|_| not_found())?;
        if !meta.is_file() {
            return Err(not_found());
        }
        Ok(file)
    }

    /// Create the parent directories of an upload target.
    pub async fn prepare_upload(&self, resource: &Resource) -> HttpResult<()> {
        let parent = resource.path.parent().unwrap_or(self.root.as_path());
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HttpError::filesystem("create directory", parent, e))?;

        let real_parent = tokio::fs::canonicalize(parent)
            .await
            .map_err(|e| HttpError::filesystem("resolve directory", parent, e))?;
        self.ensure_contained(&real_parent, resource)?;

        // An existing symlink at the target would redirect the write.
        if let Ok(meta) = tokio::fs::symlink_metadata(&resource.path).await {
            if meta.file_type().is_symlink() {
                let real = tokio::fs::canonicalize(&resource.path)
                    .await
                    .map_err(|_| HttpError::PathTraversalRejected(resource.target.clone()))?;
                self.ensure_contained(&real, resource)?;
            }
        }
        Ok(())
    }

    /// Create or truncate the upload target.
    pub async fn create(&self, resource: &Resource) -> HttpResult<File> {
        File::create(&resource.path)
            .await
            .map_err(|e| HttpError::filesystem("create", &resource.path, e))
    }

    /// Remove a partially written upload.
    pub async fn discard(&self, resource: &Resource) {
        if let Err(e) = tokio::fs::remove_file(&resource.path).await {
            tracing::debug!(path = %resource.path.display(), error = %e, "Could not remove partial upload");
        }
    }

    fn ensure_contained(&self, real: &Path, resource: &Resource) -> HttpResult<()> {
        if real.starts_with(&self.root) {
            Ok(())
        } else {
            tracing::warn!(
                request_target = %resource.target,
                resolved = %real.display(),
                "Resolved path escapes the root"
            );
            Err(HttpError::PathTraversalRejected(resource.target.clone()))
        }
    }
}

/// Lexically normalize a URL path into a relative file path.
///
/// Returns `None` when a `..` would climb above the root.
fn normalize(path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> ResourceStore {
        ResourceStore::new(&FilesConfig {
            root: root.to_path_buf(),
            ..FilesConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn normalize_paths() {
        assert_eq!(normalize("/index.html"), Some(PathBuf::from("index.html")));
        assert_eq!(normalize("/a/./b/../c.txt"), Some(PathBuf::from("a/c.txt")));
        assert_eq!(normalize("/../secret.txt"), None);
        assert_eq!(normalize("/a/../../secret.txt"), None);
    }

    #[test]
    fn resolve_checks_extension_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.resolve("/../../etc/shadow").unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedExtension(_)));

        let err = store.resolve("/../../etc/motd.txt").unwrap_err();
        assert!(matches!(err, HttpError::PathTraversalRejected(_)));
    }

    #[test]
    fn resolve_strips_query() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let res = store.resolve("/docs/page.html?v=2#top").unwrap();
        assert_eq!(res.relative, PathBuf::from("docs/page.html"));
        assert_eq!(res.path, store.root().join("docs/page.html"));
        assert_eq!(res.content_type, "text/html");
    }

    #[tokio::test]
    async fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let res = store.resolve("/missing.txt").unwrap();
        assert!(matches!(store.open(&res).await, Err(HttpError::NotFound(_))));
    }

    #[tokio::test]
    async fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("folder.html")).unwrap();
        let store = store(dir.path());

        let res = store.resolve("/folder.html").unwrap();
        assert!(matches!(store.open(&res).await, Err(HttpError::NotFound(_))));
    }

    #[tokio::test]
    async fn prepare_upload_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let res = store.resolve("/up/deep/data.txt").unwrap();
        store.prepare_upload(&res).await.unwrap();
        assert!(dir.path().join("up/deep").is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_out_of_root_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"nope").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("link.txt")).unwrap();
        let store = store(dir.path());

        let res = store.resolve("/link.txt").unwrap();
        assert!(matches!(store.open(&res).await, Err(HttpError::PathTraversalRejected(_))));
        assert!(matches!(
            store.prepare_upload(&res).await,
            Err(HttpError::PathTraversalRejected(_))
        ));
    }
}
