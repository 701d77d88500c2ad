//! Compiler host adapter.
//!
//! Adapts the virtual file store to the analyzer's host contract. The host
//! never enumerates the workspace itself; files enter its list only through
//! [`AnalyzerHost::add_file`], which is how sessions stage files in tiers.

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use url::Url;

use tsls_analyzer::{Analyzer, CompilerOptions, ScriptHost};

use crate::paths;
use crate::vfs::Vfs;

/// Per-session compilation host backed by the shared VFS and version map.
pub struct AnalyzerHost {
    root: String,
    options: CompilerOptions,
    vfs: Arc<dyn Vfs>,
    versions: Arc<RwLock<FxHashMap<Url, u64>>>,
    analyzer: Arc<dyn Analyzer>,
    staged: Mutex<StagedFiles>,
    project_version: AtomicU64,
    complete: AtomicBool,
}

#[derive(Default)]
struct StagedFiles {
    ordered: Vec<String>,
    set: FxHashSet<String>,
}

impl AnalyzerHost {
    /// Creates a host rooted at the session directory.
    pub fn new(
        root: String,
        options: CompilerOptions,
        vfs: Arc<dyn Vfs>,
        versions: Arc<RwLock<FxHashMap<Url, u64>>>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            root,
            options,
            vfs,
            versions,
            analyzer,
            staged: Mutex::new(StagedFiles::default()),
            project_version: AtomicU64::new(1),
            complete: AtomicBool::new(false),
        }
    }

    /// Appends a file to the staged list and bumps the project version.
    /// Callers check [`contains`](Self::contains) first; staged files are
    /// never removed.
    pub fn add_file(&self, path: &str) {
        let mut staged = self.staged.lock();
        staged.ordered.push(path.to_string());
        staged.set.insert(path.to_string());
        drop(staged);
        self.inc_project_version();
    }

    /// True if `path` has been staged into this host.
    pub fn contains(&self, path: &str) -> bool {
        self.staged.lock().set.contains(path)
    }

    /// Bumps the project-version counter, invalidating program caches.
    pub fn inc_project_version(&self) {
        self.project_version.fetch_add(1, Ordering::Relaxed);
    }

    /// True once every expected file has been staged.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Relaxed)
    }

    /// Marks the host complete. Set once, never cleared.
    pub fn set_complete(&self) {
        self.complete.store(true, Ordering::Relaxed);
    }
}

impl ScriptHost for AnalyzerHost {
    fn current_directory(&self) -> String {
        self.root.clone()
    }

    fn compilation_settings(&self) -> CompilerOptions {
        self.options.clone()
    }

    fn script_file_names(&self) -> Vec<String> {
        self.staged.lock().ordered.clone()
    }

    fn script_version(&self, path: &str) -> String {
        let Some(uri) = paths::path_to_uri(path) else {
            return "1".to_string();
        };
        if let Some(version) = self.versions.read().get(&uri) {
            return version.to_string();
        }
        // First sighting: seed the shared map so later bumps invalidate.
        let mut versions = self.versions.write();
        versions.entry(uri).or_insert(1).to_string()
    }

    fn script_snapshot(&self, path: &str) -> Option<Arc<str>> {
        self.vfs.read_file(path).map(Arc::from)
    }

    fn project_version(&self) -> String {
        self.project_version.load(Ordering::Relaxed).to_string()
    }

    fn default_lib_file_name(&self, options: &CompilerOptions) -> String {
        paths::normalize_separators(&self.analyzer.default_lib_path(options))
    }
}
