//! The workspace project manager.
//!
//! Ties the router, the fetch pipelines, and change intake together behind
//! the operations an LSP dispatcher needs. The four ensure-pipelines share
//! one template: a memoized multicast signal per scope, a structure fetch
//! that happens-before any per-URI fetch, and retract-on-error semantics so
//! a failed pipeline is retried by the next caller.

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use tsls_analyzer::{Analyzer, DocumentRegistry, ResolutionHost};

use crate::error::{ProjectError, Result};
use crate::fetcher::ContentFetcher;
use crate::paths::{self, ConfigKind};
use crate::router::ProjectRouter;
use crate::session::ProjectSession;
use crate::signal::{SharedSignal, SignalMap, SignalSlot};
use crate::vfs::Vfs;

/// Default transitive depth for [`ProjectManager::ensure_referenced_files`].
pub const DEFAULT_REFERENCE_DEPTH: u32 = 30;

/// The workspace project manager.
pub struct ProjectManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    root: String,
    vfs: Arc<dyn Vfs>,
    fetcher: Arc<dyn ContentFetcher>,
    analyzer: Arc<dyn Analyzer>,
    router: Arc<ProjectRouter>,
    versions: Arc<RwLock<FxHashMap<Url, u64>>>,
    module_structure: SignalSlot<()>,
    own_files: SignalSlot<()>,
    all_files: SignalSlot<()>,
    referenced_files: SignalMap<Arc<Vec<Url>>>,
}

/// The three workspace-materialization scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    ModuleStructure,
    OwnFiles,
    AllFiles,
}

impl Scope {
    fn name(self) -> &'static str {
        match self {
            Scope::ModuleStructure => "module-structure",
            Scope::OwnFiles => "own-files",
            Scope::AllFiles => "all-files",
        }
    }
}

impl ProjectManager {
    /// Creates a manager over `workspace_root`. The router installs its two
    /// fallback sessions and starts listening for configuration files.
    pub fn new(
        workspace_root: &str,
        vfs: Arc<dyn Vfs>,
        fetcher: Arc<dyn ContentFetcher>,
        analyzer: Arc<dyn Analyzer>,
        trace_resolution: bool,
    ) -> Self {
        let registry = Arc::new(DocumentRegistry::new());
        let versions: Arc<RwLock<FxHashMap<Url, u64>>> =
            Arc::new(RwLock::new(FxHashMap::default()));
        let router = ProjectRouter::new(
            workspace_root,
            Arc::clone(&vfs),
            registry,
            Arc::clone(&analyzer),
            Arc::clone(&versions),
            trace_resolution,
        );
        let root = router.workspace_root().to_string();
        Self {
            inner: Arc::new(ManagerInner {
                root,
                vfs,
                fetcher,
                analyzer,
                router,
                versions,
                module_structure: SignalSlot::new(),
                own_files: SignalSlot::new(),
                all_files: SignalSlot::new(),
                referenced_files: SignalMap::new(),
            }),
        }
    }

    /// The trimmed workspace root.
    pub fn root(&self) -> &str {
        &self.inner.root
    }

    /// The shared virtual file store.
    pub fn fs(&self) -> Arc<dyn Vfs> {
        Arc::clone(&self.inner.vfs)
    }

    /// True if the store knows `path`.
    pub fn has_file(&self, path: &str) -> bool {
        self.inner.vfs.file_exists(path)
    }

    /// Current version of `uri`; zero before any change event.
    pub fn file_version(&self, uri: &Url) -> u64 {
        self.inner.versions.read().get(uri).copied().unwrap_or(0)
    }

    /// Every session, js kind first.
    pub fn configurations(&self) -> Vec<Arc<ProjectSession>> {
        self.inner.router.all_configurations()
    }

    /// The nearest enclosing session for `path`.
    pub fn configuration_for(
        &self,
        path: &str,
        kind: Option<ConfigKind>,
    ) -> Option<Arc<ProjectSession>> {
        self.inner.router.configuration_for(path, kind)
    }

    /// Like [`configuration_for`](Self::configuration_for) but failing with
    /// [`ProjectError::ConfigNotFound`].
    pub fn get_configuration(
        &self,
        path: &str,
        kind: Option<ConfigKind>,
    ) -> Result<Arc<ProjectSession>> {
        self.inner.router.get_configuration(path, kind)
    }

    /// The nearest enclosing session for a document URI.
    pub fn parent_configuration_for(
        &self,
        uri: &Url,
        kind: Option<ConfigKind>,
    ) -> Option<Arc<ProjectSession>> {
        let path = paths::uri_to_path(uri)?;
        self.inner.router.configuration_for(&path, kind)
    }

    /// Every session rooted at or below the directory named by `uri`.
    pub fn child_configurations_under(&self, uri: &Url) -> Vec<Arc<ProjectSession>> {
        match paths::uri_to_path(uri) {
            Some(path) => self.inner.router.child_configurations(&path),
            None => Vec::new(),
        }
    }

    /// Materializes workspace structure: the directory listing plus the
    /// content of every configuration, `package.json`, and global
    /// declaration file. On completion every session is reset and the
    /// referenced-files cache is cleared, so later staging sees the new
    /// layout.
    pub async fn ensure_module_structure(&self) -> Result<()> {
        Arc::clone(&self.inner).scope_signal(Scope::ModuleStructure).await
    }

    /// Materializes every source, configuration, and `package.json` file
    /// outside `node_modules`.
    pub async fn ensure_own_files(&self) -> Result<()> {
        Arc::clone(&self.inner).scope_signal(Scope::OwnFiles).await
    }

    /// Materializes every source, configuration, and `package.json` file in
    /// the workspace, dependencies included.
    pub async fn ensure_all_files(&self) -> Result<()> {
        Arc::clone(&self.inner).scope_signal(Scope::AllFiles).await
    }

    /// Materializes `uri` and everything it transitively references, up to
    /// `max_depth` hops. Returns the discovered URIs. A reference that
    /// fails to resolve is logged and skipped; the walk never aborts
    /// because one import is broken.
    pub async fn ensure_referenced_files(
        &self,
        uri: &Url,
        max_depth: u32,
    ) -> Result<FxHashSet<Url>> {
        self.ensure_module_structure().await?;
        let mut seed = FxHashSet::default();
        seed.insert(uri.clone());
        let visited = Arc::new(Mutex::new(seed));
        Arc::clone(&self.inner)
            .walk_references(uri.clone(), max_depth, Arc::clone(&visited))
            .await;
        let mut discovered = visited.lock().clone();
        discovered.remove(uri);
        Ok(discovered)
    }

    /// Drops the memoized scope signals; the next ensure starts a fresh
    /// pipeline. In-flight pipelines keep running but cannot displace their
    /// successors.
    pub fn invalidate_module_structure(&self) {
        self.inner.module_structure.invalidate();
        self.inner.own_files.invalidate();
        self.inner.all_files.invalidate();
    }

    /// Drops the referenced-files cache for `uri`, or the whole cache when
    /// `uri` is `None`.
    pub fn invalidate_referenced_files(&self, uri: Option<&Url>) {
        match uri {
            Some(uri) => self.inner.referenced_files.remove(uri),
            None => self.inner.referenced_files.clear(),
        }
    }

    /// Editor opened a document. Equivalent to a full-content change.
    pub fn did_open(&self, uri: &Url, text: &str) -> Result<()> {
        self.did_change(uri, text)
    }

    /// Editor changed a document: update the store, bump the version, and
    /// stage the file into its owning session.
    pub fn did_change(&self, uri: &Url, text: &str) -> Result<()> {
        self.inner.vfs.did_change(uri, text);
        self.inner.bump_version(uri);
        let Some(path) = paths::uri_to_path(uri) else {
            return Ok(());
        };
        let Some(session) = self.inner.router.configuration_for(&path, None) else {
            return Ok(());
        };
        session.ensure_config_file()?;
        session.ensure_source_file(&path)?;
        if let Some(host) = session.host() {
            host.inc_project_version();
        }
        Ok(())
    }

    /// Editor closed a document. The file stays staged; only versions move.
    pub fn did_close(&self, uri: &Url) -> Result<()> {
        self.inner.vfs.did_close(uri);
        self.inner.bump_version(uri);
        let Some(path) = paths::uri_to_path(uri) else {
            return Ok(());
        };
        let Some(session) = self.inner.router.configuration_for(&path, None) else {
            return Ok(());
        };
        session.ensure_config_file()?;
        if let Some(host) = session.host() {
            host.inc_project_version();
        }
        Ok(())
    }

    /// Editor saved a document. Forwarded to the store only.
    pub fn did_save(&self, uri: &Url) {
        self.inner.vfs.did_save(uri);
    }

    /// Tears down the router's store subscription.
    pub fn dispose(&self) {
        self.inner.router.dispose();
    }
}

impl ManagerInner {
    fn bump_version(&self, uri: &Url) {
        let mut versions = self.versions.write();
        *versions.entry(uri.clone()).or_insert(0) += 1;
    }

    fn slot(&self, scope: Scope) -> &SignalSlot<()> {
        match scope {
            Scope::ModuleStructure => &self.module_structure,
            Scope::OwnFiles => &self.own_files,
            Scope::AllFiles => &self.all_files,
        }
    }

    fn scope_signal(self: Arc<Self>, scope: Scope) -> SharedSignal<()> {
        self.slot(scope).get_or_install(|generation| {
            let inner = Arc::clone(&self);
            let signal = async move {
                let result = Arc::clone(&inner).run_scope(scope).await;
                if let Err(err) = &result {
                    // Retract before the error reaches any subscriber.
                    inner.slot(scope).evict(generation);
                    error!("{} pipeline failed: {err}", scope.name());
                }
                result
            }
            .boxed()
            .shared();
            detach(signal.clone());
            signal
        })
    }

    async fn run_scope(self: Arc<Self>, scope: Scope) -> Result<()> {
        info!("ensuring {}", scope.name());
        let root = self.root.clone();
        match scope {
            Scope::ModuleStructure => {
                self.fetch_matching(move |path| {
                    paths::is_config_file(path)
                        || paths::is_package_json(path)
                        || paths::is_global_declaration(path, &root)
                })
                .await?;
                // The layout may have changed under the sessions.
                for session in self.router.all_configurations() {
                    session.reset();
                }
                self.referenced_files.clear();
                Ok(())
            }
            Scope::OwnFiles => {
                self.fetch_matching(|path| {
                    !paths::in_node_modules(path)
                        && (paths::is_script_file(path)
                            || paths::is_config_file(path)
                            || paths::is_package_json(path))
                })
                .await
            }
            Scope::AllFiles => {
                self.fetch_matching(|path| {
                    paths::is_script_file(path)
                        || paths::is_config_file(path)
                        || paths::is_package_json(path)
                })
                .await
            }
        }
    }

    /// Structure first, then the matching per-URI fetches concurrently.
    async fn fetch_matching(&self, keep: impl Fn(&str) -> bool) -> Result<()> {
        self.fetcher.ensure_structure().await?;
        let pending: Vec<Url> = self
            .vfs
            .uris()
            .into_iter()
            .filter(|uri| paths::uri_to_path(uri).is_some_and(|path| keep(&path)))
            .collect();
        debug!("fetching {} matching files", pending.len());
        let fetches: Vec<_> = pending.iter().map(|uri| self.fetcher.ensure(uri)).collect();
        for result in future::join_all(fetches).await {
            result?;
        }
        Ok(())
    }

    fn walk_references(
        self: Arc<Self>,
        uri: Url,
        depth: u32,
        visited: Arc<Mutex<FxHashSet<Url>>>,
    ) -> BoxFuture<'static, ()> {
        async move {
            if depth == 0 {
                return;
            }
            let references = match Arc::clone(&self).referenced_signal(&uri).await {
                Ok(references) => references,
                Err(err) => {
                    warn!("skipping references of {uri}: {err}");
                    return;
                }
            };
            let next: Vec<Url> = {
                let mut visited = visited.lock();
                references
                    .iter()
                    .filter(|target| visited.insert((*target).clone()))
                    .cloned()
                    .collect()
            };
            let walks: Vec<_> = next
                .into_iter()
                .map(|target| {
                    Arc::clone(&self).walk_references(target, depth - 1, Arc::clone(&visited))
                })
                .collect();
            future::join_all(walks).await;
        }
        .boxed()
    }

    fn referenced_signal(self: Arc<Self>, uri: &Url) -> SharedSignal<Arc<Vec<Url>>> {
        self.referenced_files.get_or_install(uri, |token| {
            let inner = Arc::clone(&self);
            let uri = uri.clone();
            let signal = async move {
                let result = Arc::clone(&inner).resolve_referenced_files(uri.clone()).await;
                if let Err(err) = &result {
                    inner.referenced_files.evict(&uri, token);
                    warn!("reference resolution for {uri} failed: {err}");
                }
                result
            }
            .boxed()
            .shared();
            detach(signal.clone());
            signal
        })
    }

    /// Fetches `uri`, pre-processes it with the owning session's options,
    /// and resolves its imports and triple-slash references to URIs on the
    /// same peer as `uri`.
    async fn resolve_referenced_files(self: Arc<Self>, uri: Url) -> Result<Arc<Vec<Url>>> {
        self.fetcher.ensure(&uri).await?;
        let path = paths::uri_to_path(&uri).ok_or_else(|| ProjectError::ReferenceResolution {
            uri: uri.to_string(),
            message: "not a file URI".to_string(),
        })?;
        let session = self.router.get_configuration(&path, None)?;
        session.ensure_basic_files()?;
        let content = self
            .vfs
            .get_content(&uri)
            .ok_or_else(|| ProjectError::ReferenceResolution {
                uri: uri.to_string(),
                message: "file has no content in the store".to_string(),
            })?;
        let options = session.options().unwrap_or_default();
        let info = self.analyzer.preprocess_file(&path, &content);
        let resolution_host = VfsResolutionHost {
            vfs: Arc::clone(&self.vfs),
        };

        let mut referenced_paths: Vec<String> = Vec::new();
        for import in &info.imported_files {
            match self.analyzer.resolve_module_name(
                &import.file_name,
                &path,
                &options,
                &resolution_host,
            ) {
                Some(module) => referenced_paths.push(module.resolved_file_name),
                None => debug!("unresolved import '{}' in {path}", import.file_name),
            }
        }
        for reference in &info.referenced_files {
            referenced_paths.push(paths::resolve_reference_path(
                &self.root,
                &path,
                &reference.file_name,
            ));
        }
        for directive in &info.type_reference_directives {
            if let Some(resolved) = self.analyzer.resolve_type_reference_directive(
                &directive.file_name,
                &path,
                &options,
                &resolution_host,
            ) {
                if let Some(file_name) = resolved.resolved_file_name {
                    referenced_paths.push(file_name);
                }
            }
        }

        let mut seen = FxHashSet::default();
        let mut references = Vec::new();
        for referenced in referenced_paths {
            if let Some(target) = paths::uri_with_path(&uri, &referenced) {
                if seen.insert(target.clone()) {
                    references.push(target);
                }
            }
        }
        Ok(Arc::new(references))
    }
}

/// Keeps a pipeline running even if every subscriber drops its handle.
fn detach<T>(signal: SharedSignal<T>)
where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let _ = signal.await;
    });
}

struct VfsResolutionHost {
    vfs: Arc<dyn Vfs>,
}

impl ResolutionHost for VfsResolutionHost {
    fn file_exists(&self, path: &str) -> bool {
        self.vfs.file_exists(path)
    }

    fn read_file(&self, path: &str) -> Option<String> {
        self.vfs.read_file(path)
    }
}
