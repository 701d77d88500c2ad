//! Content fetchers.
//!
//! A fetcher pulls file content from a backing store into the virtual file
//! store. The two entry points mirror the two materialization shapes: the
//! structure fetch populates the files that describe the workspace layout
//! (configs, `package.json`, global declarations), and the per-URI fetch
//! populates one file. A fetcher fulfils each URI at most once.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::{ProjectError, Result};
use crate::paths;
use crate::vfs::Vfs;

/// Pulls file content into the VFS on demand.
pub trait ContentFetcher: Send + Sync {
    /// Populates the workspace-structure files (configuration files,
    /// `package.json` files, global ambient declarations).
    fn ensure_structure(&self) -> BoxFuture<'static, Result<()>>;
    /// Populates a single URI.
    fn ensure(&self, uri: &Url) -> BoxFuture<'static, Result<()>>;
}

/// Disk-backed fetcher rooted at the workspace directory.
///
/// `node_modules` and dot-directories are never walked; the editor is
/// expected to notify the manager about anything it opens from there.
pub struct LocalFetcher {
    root: PathBuf,
    vfs: Arc<dyn Vfs>,
    fetched: Arc<Mutex<FxHashSet<Url>>>,
}

impl LocalFetcher {
    /// Creates a fetcher reading from `root` on the local disk.
    pub fn new(root: impl Into<PathBuf>, vfs: Arc<dyn Vfs>) -> Self {
        Self {
            root: root.into(),
            vfs,
            fetched: Arc::new(Mutex::new(FxHashSet::default())),
        }
    }
}

impl ContentFetcher for LocalFetcher {
    fn ensure_structure(&self) -> BoxFuture<'static, Result<()>> {
        let root = self.root.clone();
        let vfs = Arc::clone(&self.vfs);
        let fetched = Arc::clone(&self.fetched);
        async move {
            let workspace_root = paths::normalize_separators(&root.to_string_lossy());
            let files = tokio::task::spawn_blocking(move || {
                let mut files = Vec::new();
                collect_structure_files(&root, &workspace_root, &mut files)?;
                Ok::<_, std::io::Error>(files)
            })
            .await
            .map_err(|err| fetch_error("<structure>", err.to_string()))?
            .map_err(|err| fetch_error("<structure>", err.to_string()))?;

            debug!("structure fetch found {} files", files.len());
            for (uri, content) in files {
                match content {
                    Some(content) => {
                        fetched.lock().insert(uri.clone());
                        vfs.add(&uri, content);
                    }
                    None => vfs.register(&uri),
                }
            }
            Ok(())
        }
        .boxed()
    }

    fn ensure(&self, uri: &Url) -> BoxFuture<'static, Result<()>> {
        let uri = uri.clone();
        let vfs = Arc::clone(&self.vfs);
        let fetched = Arc::clone(&self.fetched);
        async move {
            if fetched.lock().contains(&uri) {
                return Ok(());
            }
            let Some(path) = paths::uri_to_path(&uri) else {
                return Err(fetch_error(uri.as_str(), "not a file URI"));
            };
            let content = tokio::task::spawn_blocking(move || std::fs::read_to_string(path))
                .await
                .map_err(|err| fetch_error(uri.as_str(), err.to_string()))?
                .map_err(|err| fetch_error(uri.as_str(), err.to_string()))?;
            fetched.lock().insert(uri.clone());
            vfs.add(&uri, content);
            Ok(())
        }
        .boxed()
    }
}

fn fetch_error(uri: &str, message: impl Into<String>) -> ProjectError {
    ProjectError::Fetch {
        uri: uri.to_string(),
        message: message.into(),
    }
}

/// Walks the workspace, registering every file it sees and loading content
/// eagerly for the structure files only.
fn collect_structure_files(
    dir: &Path,
    workspace_root: &str,
    out: &mut Vec<(Url, Option<String>)>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if file_type.is_dir() {
            if name == "node_modules" || name.starts_with('.') {
                continue;
            }
            collect_structure_files(&entry.path(), workspace_root, out)?;
            continue;
        }
        let path = paths::normalize_separators(&entry.path().to_string_lossy());
        let Some(uri) = paths::path_to_uri(&path) else {
            continue;
        };
        let is_structure = paths::is_config_file(&path)
            || paths::is_package_json(&path)
            || paths::is_global_declaration(&path, workspace_root);
        if is_structure {
            out.push((uri, Some(std::fs::read_to_string(entry.path())?)));
        } else {
            out.push((uri, None));
        }
    }
    Ok(())
}
