//! Filesystem helpers: source expansion, relativization and timestamps.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Expand source patterns relative to a base directory.
///
/// A pattern naming a directory contributes every file beneath it; anything
/// else is treated as a glob. The result is sorted and deduplicated so the
/// visit order is stable across runs.
pub fn expand_sources(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full = base.join(pattern);
        if full.is_dir() {
            for entry in WalkDir::new(&full).sort_by_file_name() {
                let entry = entry
                    .with_context(|| format!("failed to walk directory: {}", full.display()))?;
                if entry.file_type().is_file() {
                    results.push(entry.into_path());
                }
            }
            continue;
        }

        let pattern_str = full.to_string_lossy();
        for entry in
            glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Canonical form of `path`, or `path` unchanged when it does not exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Relative path from `base` to `path` as a forward-slash string.
///
/// Both sides are canonicalized first so records written on one machine
/// compare equal on another with the same tree layout.
pub fn portable_relative(base: &Path, path: &Path) -> String {
    let rel = relative_path(&normalize_path(base), &normalize_path(path));
    rel.to_string_lossy().replace('\\', "/")
}

/// Last-modified time in milliseconds since the Unix epoch.
///
/// Missing or unreadable files report `None`.
pub fn modified_millis(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let since = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(since.as_millis() as i64)
}

/// Quote a file name containing a space.
pub fn quote_filename(filename: &str) -> String {
    if filename.contains(' ') {
        format!("\"{}\"", filename)
    } else {
        filename.to_string()
    }
}
