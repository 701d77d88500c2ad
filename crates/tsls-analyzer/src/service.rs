//! Host and service contracts.

use std::sync::Arc;

use crate::options::CompilerOptions;
use crate::preprocess::PreprocessedFileInfo;
use crate::registry::DocumentRegistry;
use crate::resolve::{ResolutionHost, ResolvedModule, ResolvedTypeReferenceDirective};

/// The contract a compilation host implements so the analyzer can drive an
/// incremental program over it.
///
/// All methods are infallible; a file unknown to the backing store surfaces
/// as an absent snapshot, not an error.
pub trait ScriptHost: Send + Sync {
    /// Root directory of the compilation.
    fn current_directory(&self) -> String;
    /// Effective compiler options, immutable after session init.
    fn compilation_settings(&self) -> CompilerOptions;
    /// Ordered list of file paths staged into the program so far.
    fn script_file_names(&self) -> Vec<String>;
    /// Version string for one file; bumping it invalidates the analyzer's
    /// cached parse of that file.
    fn script_version(&self, path: &str) -> String;
    /// Content snapshot, or `None` when the backing store lacks the file.
    fn script_snapshot(&self, path: &str) -> Option<Arc<str>>;
    /// Version string covering the whole project; bumping it invalidates
    /// program-level caches.
    fn project_version(&self) -> String;
    /// Newline sequence used for synthesized text.
    fn newline(&self) -> &'static str {
        "\n"
    }
    /// Path of the default standard library for `options`.
    fn default_lib_file_name(&self, options: &CompilerOptions) -> String;
}

/// Read-only view of the analyzer's current program.
pub trait ProgramView: Send + Sync {
    /// Returns true if the program contains `path` as a root or dependency.
    fn contains_file(&self, path: &str) -> bool;
    /// All file paths in the program.
    fn file_names(&self) -> Vec<String>;
}

/// A language-service handle created over a [`ScriptHost`].
pub trait LanguageService: Send + Sync {
    /// The current program, or `None` if the analyzer declines to build one.
    fn program(&self) -> Option<Arc<dyn ProgramView>>;
}

/// Factory and resolution entry points of the external analyzer.
pub trait Analyzer: Send + Sync {
    /// Creates a language service over `host`, sharing parsed documents
    /// through `registry`.
    fn create_language_service(
        &self,
        host: Arc<dyn ScriptHost>,
        registry: Arc<DocumentRegistry>,
    ) -> Arc<dyn LanguageService>;

    /// Resolves one import specifier relative to `containing_file`.
    fn resolve_module_name(
        &self,
        module_name: &str,
        containing_file: &str,
        options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedModule>;

    /// Resolves one `/// <reference types="..." />` directive.
    fn resolve_type_reference_directive(
        &self,
        name: &str,
        containing_file: &str,
        options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedTypeReferenceDirective>;

    /// Extracts imports and triple-slash references without a full parse.
    fn preprocess_file(&self, file_name: &str, text: &str) -> PreprocessedFileInfo;

    /// Path of the default standard library for `options`.
    fn default_lib_path(&self, options: &CompilerOptions) -> String;
}
