//! Module and type-reference resolution contracts.

/// Host interface the analyzer consults while resolving a module name.
///
/// The workspace core passes its virtual file store here so resolution sees
/// exactly the files that have been materialized, never the local disk.
pub trait ResolutionHost: Send + Sync {
    /// Returns true if the store knows `path`.
    fn file_exists(&self, path: &str) -> bool;
    /// Reads the content of `path`, if known.
    fn read_file(&self, path: &str) -> Option<String>;
}

/// A successfully resolved module import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Absolute path of the file the specifier resolved to.
    pub resolved_file_name: String,
    /// True when the resolution landed inside `node_modules`.
    pub is_external_library_import: bool,
}

/// A resolved `/// <reference types="..." />` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTypeReferenceDirective {
    /// Absolute path of the declaration file, when found.
    pub resolved_file_name: Option<String>,
    /// True when resolved from the primary (`@types`) location.
    pub primary: bool,
}
