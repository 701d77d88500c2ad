//! Output of the analyzer's lightweight source pre-processor.

/// A single file reference extracted from source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// The referenced name as written: a module specifier for imports, a
    /// relative path for `/// <reference path>`, a package name for
    /// `/// <reference types>`.
    pub file_name: String,
}

impl FileReference {
    /// Creates a reference from any string-ish name.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

/// The three reference sequences the pre-processor extracts without running
/// a full parse: imported module specifiers, triple-slash path references,
/// and triple-slash type-reference directives.
#[derive(Debug, Clone, Default)]
pub struct PreprocessedFileInfo {
    /// `import` / `export from` / `require` specifiers.
    pub imported_files: Vec<FileReference>,
    /// `/// <reference path="..." />` directives.
    pub referenced_files: Vec<FileReference>,
    /// `/// <reference types="..." />` directives.
    pub type_reference_directives: Vec<FileReference>,
}
