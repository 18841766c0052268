//! Path and filter utilities

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Check if a file should be excluded based on OS-specific hidden files
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" | "desktop.ini" => true,
            // Linux
            ".directory" => true,
            _ => {
                // macOS resource forks and Linux trash folders
                name.starts_with("._") || name.starts_with(".Trash-")
            }
        }
    } else {
        false
    }
}

/// True if the file name matches one of `reserved` (case-insensitive).
pub fn is_reserved_name(path: &Path, reserved: &[String]) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| reserved.iter().any(|r| r.eq_ignore_ascii_case(name)))
}

/// Returns true if a local file should be handed to the scanner (not reserved, hidden or excluded).
pub fn should_scan(path: &Path, reserved: &[String], exclude_patterns: &[String]) -> bool {
    if is_reserved_name(path, reserved) || is_os_hidden_file(path) {
        return false;
    }
    if exclude_patterns.is_empty() {
        return true;
    }
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return true,
    };
    !exclude_patterns
        .iter()
        .any(|pattern| glob_match(pattern, name))
}

/// Simple glob pattern matching (supports * and ?)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_chars(&pattern, &text)
}

fn glob_match_chars(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((&'*', rest)) => {
            if rest.is_empty() {
                return true; // trailing * matches everything
            }
            (0..=text.len()).any(|skip| glob_match_chars(rest, &text[skip..]))
        }
        Some((&'?', rest)) => !text.is_empty() && glob_match_chars(rest, &text[1..]),
        Some((p, rest)) => text.first() == Some(p) && glob_match_chars(rest, &text[1..]),
    }
}

/// Canonicalize `path` and require it to be an existing directory.
pub fn canonical_dir(path: &Path) -> Result<PathBuf> {
    let path = path
        .canonicalize()
        .with_context(|| format!("canonicalize {}", path.display()))?;
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(path)
}

/// Canonicalize `path` and require it to be an existing file inside a directory.
/// Returns `(directory, file)`.
pub fn canonical_file(path: &Path) -> Result<(PathBuf, PathBuf)> {
    let file = path
        .canonicalize()
        .with_context(|| format!("canonicalize {}", path.display()))?;
    if !file.is_file() {
        bail!("{} is not a file", file.display());
    }
    let dir = file
        .parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("{} has no parent directory", file.display()))?;
    Ok((dir, file))
}

/// Short label for log lines: the path relative to `root`, or the full path outside it.
pub fn display_rel(path: &Path, root: &Path) -> String {
    match path_relative_to(path, root) {
        Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Some(rel) => rel.display().to_string(),
        None => path.display().to_string(),
    }
}
