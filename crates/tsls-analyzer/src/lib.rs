//! `tsls-analyzer` - Contract between the workspace core and the analysis engine.
//!
//! The workspace project manager does not analyze source code itself. It
//! feeds files to an external incremental analyzer through the interfaces
//! defined here:
//!
//! - **Options**: compiler option types parsed out of `tsconfig.json` /
//!   `jsconfig.json` files
//! - **Host**: the [`ScriptHost`] contract a compilation host implements so
//!   the analyzer can enumerate files, read snapshots, and observe versions
//! - **Service**: the [`LanguageService`] / [`ProgramView`] handles the
//!   analyzer hands back
//! - **Resolution**: module and type-reference resolution entry points plus
//!   the lightweight source pre-processor
//! - **Registry**: a [`DocumentRegistry`] that de-duplicates document
//!   snapshots across compilation sessions by content hash

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod options;
mod preprocess;
mod registry;
mod resolve;
mod service;

pub use options::{CompilerOptions, JsxEmit, ModuleKind, ScriptTarget};
pub use preprocess::{FileReference, PreprocessedFileInfo};
pub use registry::DocumentRegistry;
pub use resolve::{ResolutionHost, ResolvedModule, ResolvedTypeReferenceDirective};
pub use service::{Analyzer, LanguageService, ProgramView, ScriptHost};
