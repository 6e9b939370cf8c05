//! Module identifier paths.
//!
//! Module identifiers are vault-relative POSIX paths (`notes/schema.otl`).
//! They never start with `/` and never contain `.` or `..` segments once
//! normalized, so they can be used directly as cache keys.

/// Directory part of a module identifier (`""` for top-level files).
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Join `path` onto `base`. An absolute `path` replaces the base.
pub fn join(base: &str, path: &str) -> String {
    if path.starts_with('/') || base.is_empty() {
        return path.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Collapse `.`, `..` and duplicate separators.
///
/// `..` above the vault root is dropped: identifiers cannot escape the vault.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Whether `path` is relative to the importing module (`./x`, `../x`).
#[inline]
pub fn is_relative(path: &str) -> bool {
    path.starts_with('.')
}

/// Whether `path` ends with `.<ext>` for one of `extensions`.
pub fn has_extension(path: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| {
        path.len() > ext.len() + 1
            && path.ends_with(ext.as_str())
            && path.as_bytes()[path.len() - ext.len() - 1] == b'.'
    })
}
