//! Per-project compiler sessions.
//!
//! A session wraps one configuration file (or the synthetic fallback) and
//! stages files into its compiler host in three tiers: config only
//! (`ensure_config_file`), globals and declarations (`ensure_basic_files`),
//! and the whole expected file set (`ensure_all_files`). Tier flags and the
//! staged list are monotonic until [`reset`](ProjectSession::reset).

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

use tsls_analyzer::{
    Analyzer, CompilerOptions, DocumentRegistry, LanguageService, ProgramView, ScriptHost,
};

use crate::config::{self, ConfigFileJson};
use crate::error::{ProjectError, Result};
use crate::host::AnalyzerHost;
use crate::paths::{self, ConfigKind};
use crate::vfs::Vfs;

/// One compiler-analysis context scoped to one configuration file.
pub struct ProjectSession {
    vfs: Arc<dyn Vfs>,
    registry: Arc<DocumentRegistry>,
    analyzer: Arc<dyn Analyzer>,
    workspace_root: String,
    root: String,
    config_path: String,
    pre_baked: Option<ConfigFileJson>,
    versions: Arc<RwLock<FxHashMap<Url, u64>>>,
    trace_resolution: bool,
    is_fallback: bool,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for ProjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSession")
            .field("workspace_root", &self.workspace_root)
            .field("root", &self.root)
            .field("config_path", &self.config_path)
            .field("trace_resolution", &self.trace_resolution)
            .field("is_fallback", &self.is_fallback)
            .finish()
    }
}

#[derive(Default)]
struct SessionState {
    initialized: bool,
    ensured_basic_files: bool,
    ensured_all_files: bool,
    host: Option<Arc<AnalyzerHost>>,
    service: Option<Arc<dyn LanguageService>>,
    expected_files: Vec<String>,
    options: CompilerOptions,
}

impl ProjectSession {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        vfs: Arc<dyn Vfs>,
        registry: Arc<DocumentRegistry>,
        analyzer: Arc<dyn Analyzer>,
        workspace_root: String,
        root: String,
        config_path: String,
        pre_baked: Option<ConfigFileJson>,
        versions: Arc<RwLock<FxHashMap<Url, u64>>>,
        trace_resolution: bool,
        is_fallback: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            vfs,
            registry,
            analyzer,
            workspace_root,
            root,
            config_path,
            pre_baked,
            versions,
            trace_resolution,
            is_fallback,
            state: Mutex::new(SessionState::default()),
        })
    }

    /// Directory this session owns.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Path of the configuration file; empty for a fallback.
    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    /// True for the synthetic root session.
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    /// True once the configuration has been parsed and the host built.
    pub fn initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// True once globals and expected declarations have been staged.
    pub fn basic_files_ensured(&self) -> bool {
        self.state.lock().ensured_basic_files
    }

    /// True once the whole expected file set has been staged.
    pub fn all_files_ensured(&self) -> bool {
        self.state.lock().ensured_all_files
    }

    /// Effective compiler options; absent before initialization.
    pub fn options(&self) -> Option<CompilerOptions> {
        let state = self.state.lock();
        state.initialized.then(|| state.options.clone())
    }

    /// Paths the configuration claims via include/exclude.
    pub fn expected_files(&self) -> Vec<String> {
        self.state.lock().expected_files.clone()
    }

    /// The session's compiler host; absent before initialization.
    pub fn host(&self) -> Option<Arc<AnalyzerHost>> {
        self.state.lock().host.clone()
    }

    /// The analyzer's cached program, when available.
    pub fn program(&self) -> Option<Arc<dyn ProgramView>> {
        let state = self.state.lock();
        state.service.as_ref().and_then(|service| service.program())
    }

    /// Idempotent init: parse the configuration, compute the expected file
    /// set, and construct host and language service. A parse failure leaves
    /// the session uninitialized; the next call re-attempts.
    pub fn ensure_config_file(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.init_locked(&mut state)
    }

    /// Stages every global ambient declaration plus the declaration files
    /// in this session's expected file set.
    pub fn ensure_basic_files(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.init_locked(&mut state)?;
        if state.ensured_basic_files {
            return Ok(());
        }
        for uri in self.vfs.uris() {
            let Some(path) = paths::uri_to_path(&uri) else {
                continue;
            };
            if !paths::is_declaration_file(&path) {
                continue;
            }
            if paths::is_global_declaration(&path, &self.workspace_root)
                || state.expected_files.contains(&path)
            {
                stage_locked(&state, &path);
            }
        }
        state.ensured_basic_files = true;
        Ok(())
    }

    /// Stages a single file. Used by change intake.
    pub fn ensure_source_file(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.init_locked(&mut state)?;
        stage_locked(&state, path);
        Ok(())
    }

    /// Stages the whole expected file set and marks the host complete.
    pub fn ensure_all_files(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.init_locked(&mut state)?;
        if state.ensured_all_files {
            return Ok(());
        }
        if state.host.as_ref().is_some_and(|host| host.is_complete()) {
            state.ensured_all_files = true;
            return Ok(());
        }
        let expected = state.expected_files.clone();
        for path in &expected {
            stage_locked(&state, path);
        }
        if let Some(host) = &state.host {
            host.set_complete();
        }
        state.ensured_all_files = true;
        Ok(())
    }

    /// Drops host, language service, and staging state. The session
    /// re-initializes lazily on next use.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        *state = SessionState::default();
        debug!("reset session at {}", self.root);
    }

    fn init_locked(&self, state: &mut SessionState) -> Result<()> {
        if state.initialized {
            return Ok(());
        }

        let json = match &self.pre_baked {
            Some(pre) => pre.clone(),
            None => {
                let text = self.read_config_text()?;
                match config::parse_config_text(&self.config_path, &text) {
                    Ok(json) => json,
                    Err(err) => {
                        error!("{err}");
                        return Err(err);
                    }
                }
            }
        };

        let mut options = json.compiler_options.clone();
        if paths::config_kind_of_config(&self.config_path) == Some(ConfigKind::Js) {
            options.allow_js = Some(true);
        }
        if self.trace_resolution {
            options.trace_resolution = Some(true);
        }

        let known: Vec<String> = self
            .vfs
            .uris()
            .iter()
            .filter_map(paths::uri_to_path)
            .collect();
        let parsed = match config::parse_config_content(&json, &options, &self.root, &known) {
            Ok(parsed) => parsed,
            Err(err) => {
                error!("{err}");
                return Err(err);
            }
        };

        let host = Arc::new(AnalyzerHost::new(
            self.root.clone(),
            options.clone(),
            Arc::clone(&self.vfs),
            Arc::clone(&self.versions),
            Arc::clone(&self.analyzer),
        ));
        let service = self
            .analyzer
            .create_language_service(Arc::clone(&host) as Arc<dyn ScriptHost>, Arc::clone(&self.registry));

        debug!(
            "initialized session at '{}' with {} expected files",
            self.root,
            parsed.file_names.len()
        );
        state.expected_files = parsed.file_names;
        state.options = options;
        state.host = Some(host);
        state.service = Some(service);
        state.initialized = true;
        Ok(())
    }

    fn read_config_text(&self) -> Result<String> {
        let uri = paths::path_to_uri(&self.config_path).ok_or_else(|| {
            ProjectError::ConfigParse {
                path: self.config_path.clone(),
                message: "configuration path is not a valid file path".to_string(),
            }
        })?;
        self.vfs
            .get_content(&uri)
            .ok_or_else(|| ProjectError::ConfigParse {
                path: self.config_path.clone(),
                message: "configuration is not available in the file store".to_string(),
            })
    }
}

/// Stages `path` unless the host or the current program already has it.
fn stage_locked(state: &SessionState, path: &str) {
    let Some(host) = &state.host else {
        return;
    };
    if host.contains(path) {
        return;
    }
    if let Some(program) = state.service.as_ref().and_then(|service| service.program()) {
        if program.contains_file(path) {
            return;
        }
    }
    host.add_file(path);
}
