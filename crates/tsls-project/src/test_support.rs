//! Shared helpers for unit tests.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

use tsls_analyzer::{
    Analyzer, CompilerOptions, DocumentRegistry, FileReference, LanguageService,
    PreprocessedFileInfo, ProgramView, ResolutionHost, ResolvedModule,
    ResolvedTypeReferenceDirective, ScriptHost,
};

use crate::error::{ProjectError, Result};
use crate::fetcher::ContentFetcher;
use crate::paths;
use crate::vfs::{MemoryVfs, Vfs};

/// Builds a [`MemoryVfs`] pre-populated with `(path, content)` pairs.
pub(crate) fn vfs_with(files: &[(&str, &str)]) -> Arc<MemoryVfs> {
    let vfs = Arc::new(MemoryVfs::new());
    for (path, content) in files {
        let uri = paths::path_to_uri(path).expect("test path");
        vfs.add(&uri, (*content).to_string());
    }
    vfs
}

pub(crate) fn uri(path: &str) -> Url {
    paths::path_to_uri(path).expect("test path")
}

/// A line-oriented analyzer good enough to exercise the workspace core:
/// imports and triple-slash directives are scanned textually, and relative
/// specifiers resolve against the resolution host with the usual extension
/// probing.
pub(crate) struct StubAnalyzer;

pub(crate) fn stub_analyzer() -> Arc<dyn Analyzer> {
    Arc::new(StubAnalyzer)
}

impl Analyzer for StubAnalyzer {
    fn create_language_service(
        &self,
        host: Arc<dyn ScriptHost>,
        _registry: Arc<DocumentRegistry>,
    ) -> Arc<dyn LanguageService> {
        Arc::new(StubService { host })
    }

    fn resolve_module_name(
        &self,
        module_name: &str,
        containing_file: &str,
        _options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedModule> {
        if !module_name.starts_with("./") && !module_name.starts_with("../") {
            return None;
        }
        let base = paths::parent_dir(containing_file)?;
        let candidate = paths::join_under(base, module_name);
        for suffix in ["", ".ts", ".tsx", ".d.ts", ".js", ".jsx"] {
            let probed = format!("{candidate}{suffix}");
            if host.file_exists(&probed) {
                return Some(ResolvedModule {
                    resolved_file_name: probed,
                    is_external_library_import: false,
                });
            }
        }
        None
    }

    fn resolve_type_reference_directive(
        &self,
        name: &str,
        containing_file: &str,
        _options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedTypeReferenceDirective> {
        let mut dir = paths::parent_dir(containing_file)?.to_string();
        loop {
            let probed = format!("{dir}/node_modules/@types/{name}/index.d.ts");
            if host.file_exists(&probed) {
                return Some(ResolvedTypeReferenceDirective {
                    resolved_file_name: Some(probed),
                    primary: true,
                });
            }
            match paths::parent_dir(&dir) {
                Some(parent) => dir = parent.to_string(),
                None => return None,
            }
        }
    }

    fn preprocess_file(&self, _file_name: &str, text: &str) -> PreprocessedFileInfo {
        let mut info = PreprocessedFileInfo::default();
        for line in text.lines() {
            let line = line.trim_start();
            if let Some(rest) = line.strip_prefix("///") {
                if rest.contains("<reference") {
                    if let Some(value) = attribute_value(rest, "path") {
                        info.referenced_files.push(FileReference::new(value));
                    }
                    if let Some(value) = attribute_value(rest, "types") {
                        info.type_reference_directives.push(FileReference::new(value));
                    }
                }
                continue;
            }
            let is_import = line.starts_with("import ") || line.starts_with("import'");
            let is_reexport = line.starts_with("export ") && line.contains(" from ");
            if (is_import || is_reexport || line.contains("require(")) && line.contains(['\'', '"'])
            {
                if let Some(specifier) = last_quoted(line) {
                    info.imported_files.push(FileReference::new(specifier));
                }
            }
        }
        info
    }

    fn default_lib_path(&self, _options: &CompilerOptions) -> String {
        "/lib/lib.d.ts".to_string()
    }
}

fn attribute_value(text: &str, attribute: &str) -> Option<String> {
    let needle = format!("{attribute}=\"");
    let start = text.find(&needle)? + needle.len();
    let end = text[start..].find('"')? + start;
    Some(text[start..end].to_string())
}

fn last_quoted(line: &str) -> Option<String> {
    let mut result = None;
    let mut rest = line;
    while let Some(start) = rest.find(['\'', '"']) {
        let quote = rest.as_bytes()[start] as char;
        let tail = &rest[start + 1..];
        let Some(end) = tail.find(quote) else { break };
        result = Some(tail[..end].to_string());
        rest = &tail[end + 1..];
    }
    result
}

/// Fetcher over an in-memory "remote" content map. Counts invocations so
/// tests can observe memoization and retry behavior.
pub(crate) struct StubFetcher {
    root: String,
    vfs: Arc<MemoryVfs>,
    remote: Mutex<FxHashMap<Url, String>>,
    fetched: Mutex<FxHashSet<Url>>,
    failing: Mutex<FxHashSet<Url>>,
    structure_calls: AtomicUsize,
    ensure_calls: Mutex<Vec<Url>>,
}

impl StubFetcher {
    pub(crate) fn new(root: &str, vfs: Arc<MemoryVfs>, files: &[(&str, &str)]) -> Arc<Self> {
        let remote = files
            .iter()
            .map(|(path, content)| (uri(path), (*content).to_string()))
            .collect();
        Arc::new(Self {
            root: paths::trimmed_root(root).to_string(),
            vfs,
            remote: Mutex::new(remote),
            fetched: Mutex::new(FxHashSet::default()),
            failing: Mutex::new(FxHashSet::default()),
            structure_calls: AtomicUsize::new(0),
            ensure_calls: Mutex::new(Vec::new()),
        })
    }

    /// Makes every later `ensure` of `path` fail.
    pub(crate) fn fail_on(&self, path: &str) {
        self.failing.lock().insert(uri(path));
    }

    /// Lets `path` fetch normally again.
    pub(crate) fn recover(&self, path: &str) {
        self.failing.lock().remove(&uri(path));
    }

    pub(crate) fn structure_calls(&self) -> usize {
        self.structure_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_calls(&self) -> usize {
        self.ensure_calls.lock().len()
    }

    fn fulfil(&self, target: &Url) -> Result<()> {
        if self.failing.lock().contains(target) {
            return Err(ProjectError::Fetch {
                uri: target.to_string(),
                message: "injected failure".to_string(),
            });
        }
        if self.fetched.lock().contains(target) {
            return Ok(());
        }
        if self.vfs.get_content(target).is_some() {
            // Editor-populated content needs no remote round trip.
            self.fetched.lock().insert(target.clone());
            return Ok(());
        }
        if let Some(content) = self.remote.lock().get(target).cloned() {
            self.fetched.lock().insert(target.clone());
            self.vfs.add(target, content);
            return Ok(());
        }
        Err(ProjectError::Fetch {
            uri: target.to_string(),
            message: "unknown remote file".to_string(),
        })
    }
}

impl ContentFetcher for StubFetcher {
    fn ensure_structure(&self) -> BoxFuture<'static, Result<()>> {
        self.structure_calls.fetch_add(1, Ordering::SeqCst);
        let known: Vec<Url> = self.remote.lock().keys().cloned().collect();
        for target in &known {
            self.vfs.register(target);
        }
        let structure: Vec<Url> = known
            .into_iter()
            .filter(|target| {
                paths::uri_to_path(target).is_some_and(|path| {
                    paths::is_config_file(&path)
                        || paths::is_package_json(&path)
                        || paths::is_global_declaration(&path, &self.root)
                })
            })
            .collect();
        let results: Vec<Result<()>> = structure.iter().map(|target| self.fulfil(target)).collect();
        async move {
            for result in results {
                result?;
            }
            Ok(())
        }
        .boxed()
    }

    fn ensure(&self, target: &Url) -> BoxFuture<'static, Result<()>> {
        self.ensure_calls.lock().push(target.clone());
        let result = self.fulfil(target);
        async move { result }.boxed()
    }
}

struct StubService {
    host: Arc<dyn ScriptHost>,
}

impl LanguageService for StubService {
    fn program(&self) -> Option<Arc<dyn ProgramView>> {
        Some(Arc::new(StubProgram {
            files: self.host.script_file_names().into_iter().collect(),
        }))
    }
}

struct StubProgram {
    files: FxHashSet<String>,
}

impl ProgramView for StubProgram {
    fn contains_file(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    fn file_names(&self) -> Vec<String> {
        self.files.iter().cloned().collect()
    }
}
