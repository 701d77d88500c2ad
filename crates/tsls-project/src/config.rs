//! Project configuration files.
//!
//! `tsconfig.json` / `jsconfig.json` files are JSON with comments and
//! trailing commas, so the text-to-JSON step goes through `json5`. The
//! parsed content is then expanded against the virtual file store's known
//! files to compute the expected file set the configuration claims.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use tsls_analyzer::{CompilerOptions, ModuleKind};

use crate::error::{ProjectError, Result};
use crate::paths::{self, ConfigKind};

/// Default excludes applied when a configuration names none.
const DEFAULT_EXCLUDES: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// Raw shape of a configuration file, before expansion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFileJson {
    /// The `compilerOptions` object.
    pub compiler_options: CompilerOptions,
    /// Include patterns, relative to the config's directory.
    pub include: Option<Vec<String>>,
    /// Exclude patterns, relative to the config's directory.
    pub exclude: Option<Vec<String>>,
    /// Explicit file list; bypasses include/exclude matching.
    pub files: Option<Vec<String>>,
}

/// A fully expanded project configuration.
#[derive(Debug, Clone)]
pub struct ParsedProjectConfig {
    /// Effective compiler options.
    pub options: CompilerOptions,
    /// The expected file set: absolute paths the configuration claims.
    pub file_names: Vec<String>,
    /// Directory containing the configuration file (or the workspace root
    /// for a fallback).
    pub root: String,
}

/// Parses configuration text into its raw JSON shape.
///
/// Empty or whitespace-only text is a valid empty configuration.
pub fn parse_config_text(path: &str, text: &str) -> Result<ConfigFileJson> {
    if text.trim().is_empty() {
        return Ok(ConfigFileJson::default());
    }
    json5::from_str(text).map_err(|err| ProjectError::ConfigParse {
        path: path.to_string(),
        message: err.to_string(),
    })
}

/// Expands a raw configuration against the store's known files.
///
/// `known_files` are absolute normalized paths; only those under `root`
/// participate. Matching runs on root-relative paths, so patterns behave
/// the same wherever the project sits in the workspace.
pub fn parse_config_content(
    json: &ConfigFileJson,
    options: &CompilerOptions,
    root: &str,
    known_files: &[String],
) -> Result<ParsedProjectConfig> {
    let root = paths::trimmed_root(root);
    let allow_js = options.allow_js.unwrap_or(false);

    let mut file_names = Vec::new();
    if let Some(files) = &json.files {
        for file in files {
            file_names.push(paths::join_under(root, file));
        }
    }

    let default_include = ["**/*".to_string()];
    let include_patterns = json.include.as_deref().unwrap_or(&default_include);
    let include = build_matcher(root, include_patterns.iter())?;
    let exclude_list = exclude_patterns(json, options);
    let exclude = build_matcher(root, exclude_list.iter())?;

    for file in known_files {
        let Some(relative) = relative_to(root, file) else {
            continue;
        };
        if !wanted_extension(file, allow_js) {
            continue;
        }
        if exclude.is_match(relative) || !include.is_match(relative) {
            continue;
        }
        if !file_names.contains(file) {
            file_names.push(file.clone());
        }
    }
    file_names.sort();

    Ok(ParsedProjectConfig {
        options: options.clone(),
        file_names,
        root: root.to_string(),
    })
}

/// The synthetic configuration installed at the workspace root so files
/// outside any real project still route somewhere.
pub fn fallback_config(kind: ConfigKind) -> ConfigFileJson {
    let (include, allow_js) = match kind {
        ConfigKind::Js => ("**/*.{js,jsx}", Some(true)),
        ConfigKind::Ts => ("**/*.{ts,tsx}", None),
    };
    ConfigFileJson {
        compiler_options: CompilerOptions {
            module: Some(ModuleKind::CommonJs),
            allow_js,
            ..CompilerOptions::default()
        },
        include: Some(vec![include.to_string()]),
        exclude: None,
        files: None,
    }
}

fn exclude_patterns(json: &ConfigFileJson, options: &CompilerOptions) -> Vec<String> {
    let mut patterns: Vec<String> = match &json.exclude {
        Some(exclude) => exclude.clone(),
        None => DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect(),
    };
    if let Some(out_dir) = &options.out_dir {
        patterns.push(out_dir.clone());
    }
    patterns
}

fn wanted_extension(path: &str, allow_js: bool) -> bool {
    paths::is_ts_file(path) || (allow_js && paths::is_js_file(path))
}

fn relative_to<'a>(root: &str, file: &'a str) -> Option<&'a str> {
    if root.is_empty() {
        return Some(file.trim_start_matches('/'));
    }
    file.strip_prefix(root)
        .and_then(|rest| rest.strip_prefix('/'))
}

fn build_matcher<'a>(
    root: &str,
    patterns: impl Iterator<Item = &'a String>,
) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let expanded = expand_pattern(pattern);
        let glob = GlobBuilder::new(&expanded)
            .literal_separator(true)
            .build()
            .map_err(|err| ProjectError::ConfigParse {
                path: root.to_string(),
                message: format!("invalid pattern '{pattern}': {err}"),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| ProjectError::ConfigParse {
        path: root.to_string(),
        message: err.to_string(),
    })
}

/// A bare directory name matches everything beneath it.
fn expand_pattern(pattern: &str) -> String {
    let mut expanded = paths::normalize_separators(pattern);
    if let Some(rest) = expanded.strip_prefix("./") {
        expanded = rest.to_string();
    }
    let has_meta = expanded.contains(['*', '?', '{', '[']);
    if !has_meta && !paths::base_name(&expanded).contains('.') {
        expanded = format!("{}/**", expanded.trim_end_matches('/'));
    }
    expanded
}
