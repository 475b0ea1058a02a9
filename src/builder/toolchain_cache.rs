//! Memoized toolchain metadata.
//!
//! Probing a toolchain means running it: `gcc -dumpversion`,
//! `g++ -print-search-dirs`, `g++ -print-file-name=libstdc++.a`. The answers
//! do not change during a build, so a build session owns one cache and
//! passes it to every configuration it creates. Two threads racing on the
//! first lookup may both probe; the results are identical.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::builder::runner::CommandRunner;

const LIBRARIES_PREFIX: &str = "libraries: =";

/// Per-session toolchain metadata cache.
#[derive(Debug, Default)]
pub struct ToolchainCache {
    identifiers: Mutex<HashMap<Vec<String>, String>>,
    search_dirs: Mutex<HashMap<String, Vec<PathBuf>>>,
    runtime_libraries: Mutex<HashMap<String, Option<String>>>,
}

impl ToolchainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identify a tool by the first line it prints for `argv`.
    ///
    /// Falls back to `fallback` when the tool prints nothing and to
    /// `fallback:<error>` when it cannot be run.
    pub fn identifier(&self, runner: &dyn CommandRunner, argv: &[String], fallback: &str) -> String {
        if let Some(found) = lock(&self.identifiers).get(argv) {
            return found.clone();
        }

        let identifier = match runner.run(argv, None, false) {
            Ok(out) => out
                .stdout
                .into_iter()
                .map(|l| l.trim().to_string())
                .find(|l| !l.is_empty())
                .unwrap_or_else(|| fallback.to_string()),
            Err(e) => format!("{}:{}", fallback, e),
        };

        lock(&self.identifiers).insert(argv.to_vec(), identifier.clone());
        identifier
    }

    /// Library directories reported by `<driver> -print-search-dirs`.
    ///
    /// Only directories that exist are returned.
    pub fn library_search_path(&self, runner: &dyn CommandRunner, driver: &str) -> Vec<PathBuf> {
        if let Some(found) = lock(&self.search_dirs).get(driver) {
            return found.clone();
        }

        let argv = vec![driver.to_string(), "-print-search-dirs".to_string()];
        let dirs = match runner.run(&argv, None, false) {
            Ok(out) => parse_search_dirs(&out.stdout),
            Err(e) => {
                tracing::debug!("could not query {} search dirs: {}", driver, e);
                Vec::new()
            }
        };
        let dirs: Vec<PathBuf> = dirs.into_iter().filter(|d| d.is_dir()).collect();

        lock(&self.search_dirs).insert(driver.to_string(), dirs.clone());
        dirs
    }

    /// Path of the static C++ runtime as reported by
    /// `<driver> -print-file-name=libstdc++.a`.
    pub fn static_runtime_library(&self, runner: &dyn CommandRunner, driver: &str) -> Option<String> {
        if let Some(found) = lock(&self.runtime_libraries).get(driver) {
            return found.clone();
        }

        let argv = vec![
            driver.to_string(),
            "-print-file-name=libstdc++.a".to_string(),
        ];
        let library = runner
            .run(&argv, None, false)
            .ok()
            .and_then(|out| out.stdout.into_iter().next())
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        lock(&self.runtime_libraries).insert(driver.to_string(), library.clone());
        library
    }

    /// Drop everything, forcing the next lookup to probe again.
    pub fn invalidate(&self) {
        lock(&self.identifiers).clear();
        lock(&self.search_dirs).clear();
        lock(&self.runtime_libraries).clear();
    }
}

/// Lock a cache map, recovering from a panicked holder.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Parse the `libraries: =` entry of `-print-search-dirs` output.
///
/// Entries are separated by `;` when the line contains one (Windows-hosted
/// drivers), otherwise by `:`. Lines after the entry are continuation lines.
pub fn parse_search_dirs(lines: &[String]) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let Some(start) = lines.iter().position(|l| l.contains(LIBRARIES_PREFIX)) else {
        return dirs;
    };

    let first = &lines[start];
    let idx = first.find(LIBRARIES_PREFIX).unwrap_or(0) + LIBRARIES_PREFIX.len();
    let list = &first[idx..];
    let sep = if list.contains(';') { ';' } else { ':' };
    dirs.extend(
        list.split(sep)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from),
    );
    dirs.extend(
        lines[start + 1..]
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(PathBuf::from),
    );
    dirs
}
