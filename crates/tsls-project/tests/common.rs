//! Shared helpers for workspace integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashSet;
use url::Url;

use tsls_analyzer::{
    Analyzer, CompilerOptions, DocumentRegistry, FileReference, LanguageService,
    PreprocessedFileInfo, ProgramView, ResolutionHost, ResolvedModule,
    ResolvedTypeReferenceDirective, ScriptHost,
};
use tsls_project::{paths, LocalFetcher, MemoryVfs, ProjectManager, Vfs};

/// Creates a scratch workspace on disk from `(relative path, content)`.
pub fn temp_workspace(prefix: &str, files: &[(&str, &str)]) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("{prefix}-{stamp}"));
    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(&path, content).expect("write file");
    }
    fs::create_dir_all(&root).expect("create root");
    root
}

/// Normalized path string of a workspace-relative file.
pub fn path_for(root: &Path, relative: &str) -> String {
    paths::normalize_separators(&root.join(relative).to_string_lossy())
}

/// `file:` URI of a workspace-relative file.
pub fn uri_for(root: &Path, relative: &str) -> Url {
    paths::path_to_uri(&path_for(root, relative)).expect("uri")
}

/// Builds a manager over a disk workspace: in-memory store, local fetcher,
/// line-scanning analyzer.
pub fn manager_for(root: &Path) -> ProjectManager {
    let vfs = Arc::new(MemoryVfs::new());
    let workspace_root = paths::normalize_separators(&root.to_string_lossy());
    let fetcher = Arc::new(LocalFetcher::new(root, Arc::clone(&vfs) as Arc<dyn Vfs>));
    ProjectManager::new(
        &workspace_root,
        vfs,
        fetcher,
        Arc::new(LineAnalyzer),
        false,
    )
}

/// A textual analyzer stand-in: imports and triple-slash directives are
/// scanned line by line, and relative specifiers resolve against the
/// resolution host with extension probing.
pub struct LineAnalyzer;

impl Analyzer for LineAnalyzer {
    fn create_language_service(
        &self,
        host: Arc<dyn ScriptHost>,
        _registry: Arc<DocumentRegistry>,
    ) -> Arc<dyn LanguageService> {
        Arc::new(LineService { host })
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
            let is_import = line.starts_with("import ");
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

struct LineService {
    host: Arc<dyn ScriptHost>,
}

impl LanguageService for LineService {
    fn program(&self) -> Option<Arc<dyn ProgramView>> {
        Some(Arc::new(LineProgram {
            files: self.host.script_file_names().into_iter().collect(),
        }))
    }
}

struct LineProgram {
    files: FxHashSet<String>,
}

impl ProgramView for LineProgram {
    fn contains_file(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    fn file_names(&self) -> Vec<String> {
        self.files.iter().cloned().collect()
    }
}
