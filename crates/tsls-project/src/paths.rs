//! Path and URI handling.
//!
//! Internally the workspace core works on absolute forward-slash path
//! strings; URIs appear only at the public API boundary. Conversions are
//! lossy-tolerant: a URI that is not a `file:` URI simply has no path.

use percent_encoding::percent_decode_str;
use url::Url;

/// Project configuration kind, determined by file naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    /// TypeScript (`tsconfig.json`, `.ts` / `.tsx` sources).
    Ts,
    /// JavaScript (`jsconfig.json`, `.js` / `.jsx` sources).
    Js,
}

/// Replaces backslashes with forward slashes.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Trims trailing slashes; the filesystem root becomes the empty string.
pub fn trimmed_root(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// Parent directory by string truncation. Returns `Some("")` for files
/// directly under the filesystem root and `None` for relative paths.
pub fn parent_dir(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    trimmed.rfind('/').map(|idx| &trimmed[..idx])
}

/// Final path segment.
pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// True for `tsconfig.json` / `jsconfig.json` at any depth.
pub fn is_config_file(path: &str) -> bool {
    config_kind_of_config(path).is_some()
}

/// The kind a configuration file declares, by basename.
pub fn config_kind_of_config(path: &str) -> Option<ConfigKind> {
    match base_name(path) {
        "tsconfig.json" => Some(ConfigKind::Ts),
        "jsconfig.json" => Some(ConfigKind::Js),
        _ => None,
    }
}

/// The kind implied by a path: config basename when present, source
/// extension otherwise (`.js` / `.jsx` are JS, everything else TS).
pub fn kind_of_path(path: &str) -> ConfigKind {
    if let Some(kind) = config_kind_of_config(path) {
        return kind;
    }
    if is_js_file(path) {
        ConfigKind::Js
    } else {
        ConfigKind::Ts
    }
}

/// True for `.d.ts` / `.d.tsx` declaration files.
pub fn is_declaration_file(path: &str) -> bool {
    path.ends_with(".d.ts") || path.ends_with(".d.tsx")
}

/// True for `.js` / `.jsx` sources.
pub fn is_js_file(path: &str) -> bool {
    path.ends_with(".js") || path.ends_with(".jsx")
}

/// True for `.ts` / `.tsx` sources (declaration files included).
pub fn is_ts_file(path: &str) -> bool {
    path.ends_with(".ts") || path.ends_with(".tsx")
}

/// True for any JS/TS source the workspace tracks.
pub fn is_script_file(path: &str) -> bool {
    is_ts_file(path) || is_js_file(path)
}

/// True for `package.json` at any depth.
pub fn is_package_json(path: &str) -> bool {
    base_name(path) == "package.json"
}

/// A declaration file directly under the workspace root is visible to every
/// session as a global ambient-declarations file.
pub fn is_global_declaration(path: &str, workspace_root: &str) -> bool {
    is_declaration_file(path) && parent_dir(path) == Some(trimmed_root(workspace_root))
}

/// True when any path segment is `node_modules`.
pub fn in_node_modules(path: &str) -> bool {
    path.split('/').any(|segment| segment == "node_modules")
}

/// Converts a `file:` URI to a forward-slash path string.
pub fn uri_to_path(uri: &Url) -> Option<String> {
    if uri.scheme() != "file" {
        return None;
    }
    let raw = uri.path();
    if raw.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let mut path = decoded.replace('\\', "/");
    // "file:///c:/..." decodes to "/c:/..."; drop the synthetic slash.
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        path.remove(0);
    }
    Some(path)
}

/// Converts an absolute path string to a `file:` URI.
pub fn path_to_uri(path: &str) -> Option<Url> {
    let mut raw = normalize_separators(path);
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        raw.insert(0, '/');
    }
    if !raw.starts_with('/') {
        return None;
    }
    Url::parse(&format!("file://{raw}")).ok()
}

/// Rebuilds `path` as a URI with the scheme and host of `template`, so
/// resolved references stay on the same remote peer as their referencing
/// file.
pub fn uri_with_path(template: &Url, path: &str) -> Option<Url> {
    let mut url = template.clone();
    let mut raw = normalize_separators(path);
    if !raw.starts_with('/') {
        raw.insert(0, '/');
    }
    url.set_path(&raw);
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

/// Joins a root-relative entry under `root`, collapsing dot segments.
pub fn join_under(root: &str, relative: &str) -> String {
    let root = trimmed_root(root);
    let joined = join_segments(&[root, &normalize_separators(relative)], '/');
    if root.is_empty() && !joined.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Resolves a triple-slash `path` reference.
///
/// The reference is joined against the workspace root concatenated with the
/// referencing file's directory, which doubles the root for workspace-local
/// files. Wire compatibility requires this exact shape, so it is preserved
/// rather than corrected. Windows-style joining is used when the
/// referencing path contains a backslash.
pub fn resolve_reference_path(workspace_root: &str, referencing: &str, reference: &str) -> String {
    if referencing.contains('\\') {
        let dir = windows_parent_dir(referencing);
        join_segments(&[workspace_root, &dir, reference], '\\')
    } else {
        let dir = parent_dir(referencing).unwrap_or("");
        join_segments(&[workspace_root, dir, reference], '/')
    }
}

fn windows_parent_dir(path: &str) -> String {
    let normalized = normalize_separators(path);
    parent_dir(&normalized).unwrap_or("").replace('/', "\\")
}

/// Joins segments with `separator` and collapses `.` / `..` components,
/// matching path-join semantics of the surrounding tooling.
fn join_segments(segments: &[&str], separator: char) -> String {
    let joined = segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(&separator.to_string());
    let normalized = if separator == '\\' {
        normalize_separators(&joined)
    } else {
        joined
    };

    let absolute = normalized.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut result = parts.join("/");
    if absolute {
        result.insert(0, '/');
    }
    if separator == '\\' {
        result = result.replace('/', "\\");
    }
    result
}
