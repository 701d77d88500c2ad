//! Compiler option types.
//!
//! These mirror the `compilerOptions` object of a `tsconfig.json` /
//! `jsconfig.json` file. Only the options the workspace core inspects or
//! forwards are modeled; unknown keys are ignored during deserialization.

use serde::Deserialize;

/// Module system the analyzer should assume when resolving imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ModuleKind {
    /// No module system; all files are scripts.
    #[serde(alias = "none")]
    None,
    /// CommonJS (`require` / `module.exports`).
    #[serde(alias = "commonjs", alias = "CommonJS")]
    CommonJs,
    /// Asynchronous module definition.
    #[serde(alias = "amd", alias = "AMD")]
    Amd,
    /// Universal module definition.
    #[serde(alias = "umd", alias = "UMD")]
    Umd,
    /// SystemJS.
    #[serde(alias = "system", alias = "System")]
    System,
    /// ECMAScript 2015 modules.
    #[serde(alias = "es2015", alias = "es6", alias = "ES2015", alias = "ES6")]
    Es2015,
    /// Latest ECMAScript module semantics.
    #[serde(alias = "esnext", alias = "ESNext")]
    EsNext,
}

/// Emit target for the analyzer's standard library selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ScriptTarget {
    /// ECMAScript 3.
    #[serde(alias = "es3", alias = "ES3")]
    Es3,
    /// ECMAScript 5.
    #[serde(alias = "es5", alias = "ES5")]
    Es5,
    /// ECMAScript 2015.
    #[serde(alias = "es2015", alias = "es6", alias = "ES2015", alias = "ES6")]
    Es2015,
    /// ECMAScript 2016.
    #[serde(alias = "es2016", alias = "ES2016")]
    Es2016,
    /// ECMAScript 2017.
    #[serde(alias = "es2017", alias = "ES2017")]
    Es2017,
    /// Latest ECMAScript.
    #[serde(alias = "esnext", alias = "ESNext")]
    EsNext,
}

/// JSX emit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum JsxEmit {
    /// Keep JSX as-is in the output.
    #[serde(alias = "preserve")]
    Preserve,
    /// Emit `React.createElement` calls.
    #[serde(alias = "react")]
    React,
    /// Emit React Native-compatible output.
    #[serde(alias = "react-native", alias = "reactNative")]
    ReactNative,
}

/// Effective compiler options for one compilation session.
///
/// All fields are optional; `None` means "analyzer default". The struct is
/// immutable once a session finishes initializing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    /// Include `.js` / `.jsx` files in the program.
    pub allow_js: Option<bool>,
    /// Type-check JavaScript files.
    pub check_js: Option<bool>,
    /// Module system for import resolution.
    pub module: Option<ModuleKind>,
    /// Emit target; drives default-library selection.
    pub target: Option<ScriptTarget>,
    /// JSX handling.
    pub jsx: Option<JsxEmit>,
    /// Emit declaration files.
    pub declaration: Option<bool>,
    /// Base directory for non-relative module names.
    pub base_url: Option<String>,
    /// Root directory of input files.
    pub root_dir: Option<String>,
    /// Output directory; excluded from the expected file set.
    pub out_dir: Option<String>,
    /// Enable all strict checks.
    pub strict: Option<bool>,
    /// Error on implicitly-`any` expressions.
    pub no_implicit_any: Option<bool>,
    /// Interop between CommonJS and ES modules.
    pub es_module_interop: Option<bool>,
    /// Standard library names to load instead of the target default.
    pub lib: Option<Vec<String>>,
    /// Type packages to include from `node_modules/@types`.
    pub types: Option<Vec<String>>,
    /// Log module resolution steps.
    pub trace_resolution: Option<bool>,
}
