//! Include dependency analysis and the persisted dependency table.
//!
//! The analyzer turns one source file into a [`DependencyInfo`]: the
//! includes it names, resolved against the file's own directory, the
//! declared include path, the system include path and the environment
//! include path, in that order. An include found nowhere raises the
//! record's timestamp so the file is rebuilt rather than trusted.
//!
//! The table keeps those records between runs together with the
//! configuration identifier each target was last built with.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::include_parser::IncludeParser;
use crate::core::dependency_info::{DependencyInfo, UNRESOLVED_INCLUDE_PENALTY_MS};
use crate::util::fs::{modified_millis, normalize_path, portable_relative};

/// Search paths consulted after the source file's own directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSearch {
    pub include: Vec<PathBuf>,
    pub sys: Vec<PathBuf>,
    pub env: Vec<PathBuf>,
}

/// Whether a file can hold include directives at all.
///
/// Binary artifacts with a three-letter `.dll`, `.tlb` or `.res`
/// extension are skipped.
pub fn can_parse(source: &Path) -> bool {
    let name = source.to_string_lossy();
    match name.rfind('.') {
        Some(dot) if dot + 4 == name.len() => {
            let ext = name[dot..].to_uppercase();
            !matches!(ext.as_str(), ".DLL" | ".TLB" | ".RES")
        }
        _ => true,
    }
}

/// Builds dependency records for one include-path configuration.
pub struct DependencyAnalyzer<'a> {
    parser: &'a dyn IncludeParser,
    search: &'a IncludeSearch,
    base_dir: PathBuf,
    include_path_identifier: &'a str,
}

impl<'a> DependencyAnalyzer<'a> {
    pub fn new(
        parser: &'a dyn IncludeParser,
        search: &'a IncludeSearch,
        base_dir: &Path,
        include_path_identifier: &'a str,
    ) -> Self {
        DependencyAnalyzer {
            parser,
            search,
            base_dir: normalize_path(base_dir),
            include_path_identifier,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn include_path_identifier(&self) -> &str {
        self.include_path_identifier
    }

    /// Produce the dependency record for `source`.
    ///
    /// Unreadable files are logged and treated as having no includes.
    pub fn analyze(&self, source: &Path) -> DependencyInfo {
        let mut timestamp = modified_millis(source).unwrap_or(0);
        let relative_source = portable_relative(&self.base_dir, source);

        let names = if can_parse(source) {
            match std::fs::read(source) {
                Ok(bytes) => self.parser.parse(&String::from_utf8_lossy(&bytes)),
                Err(e) => {
                    tracing::warn!("Error parsing {}: {}", source.display(), e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let local_dir = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut on_include_path = Vec::new();
        let mut on_sys_include_path = Vec::new();

        for name in &names {
            if let Some(found) = resolve(name, std::slice::from_ref(&local_dir))
                .or_else(|| resolve(name, &self.search.include))
            {
                on_include_path.push(found);
            } else if let Some(found) = resolve(name, &self.search.sys)
                .or_else(|| resolve(name, &self.search.env))
            {
                on_sys_include_path.push(found);
            } else {
                tracing::debug!(
                    "unresolved include \"{}\" in {}",
                    name,
                    source.display()
                );
                timestamp += UNRESOLVED_INCLUDE_PENALTY_MS;
            }
        }

        let relativize = |paths: Vec<PathBuf>| -> Vec<String> {
            paths
                .iter()
                .map(|p| portable_relative(&self.base_dir, p))
                .collect()
        };

        DependencyInfo::new(
            self.include_path_identifier,
            relative_source,
            timestamp,
            relativize(on_include_path),
            relativize(on_sys_include_path),
        )
    }
}

/// First directory in `dirs` that contains `name`.
fn resolve(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().map(|dir| dir.join(name)).find(|p| p.exists())
}

/// Why a target has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    MissingOutput,
    RebuildRequested,
    ConfigurationChanged,
    NewerInput,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

/// Persisted dependency records and build history.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DependencyTable {
    /// Records by relative source, then include-path identifier
    #[serde(default)]
    records: BTreeMap<String, BTreeMap<String, DependencyInfo>>,

    /// Configuration identifier each target was last built with
    #[serde(default)]
    history: BTreeMap<String, String>,
}

impl DependencyTable {
    /// Load the table from a file. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(DependencyTable::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dependency table: {}", path.display()))?;
        let table: DependencyTable = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dependency table: {}", path.display()))?;
        Ok(table)
    }

    /// Load the table, starting fresh when the file is corrupt.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("{:#}; rebuilding dependency table", e);
            DependencyTable::default()
        })
    }

    /// Save the table to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        crate::util::fs::write_string(path, &content)
    }

    pub fn get(&self, source: &str, include_path_identifier: &str) -> Option<&DependencyInfo> {
        self.records
            .get(source)
            .and_then(|by_id| by_id.get(include_path_identifier))
    }

    pub fn insert(&mut self, info: DependencyInfo) {
        self.records
            .entry(info.source().to_string())
            .or_default()
            .insert(info.include_path_identifier().to_string(), info);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The record for `source`, reusing the stored one while the file is unchanged.
    pub fn record_for(&mut self, analyzer: &DependencyAnalyzer<'_>, source: &Path) -> DependencyInfo {
        let relative = portable_relative(analyzer.base_dir(), source);
        if let (Some(stored), Some(mtime)) = (
            self.get(&relative, analyzer.include_path_identifier()),
            modified_millis(source),
        ) {
            if stored.timestamp() == mtime {
                return stored.clone();
            }
        }

        let info = analyzer.analyze(source);
        self.insert(info.clone());
        info
    }

    /// Newest timestamp over `source` and everything it includes through
    /// project include paths.
    ///
    /// A stored record naming an include that no longer exists is analyzed
    /// again, since the header may have moved to another search directory.
    /// A file that is still missing reports `i64::MAX`.
    pub fn newest_dependency(&mut self, analyzer: &DependencyAnalyzer<'_>, source: &Path) -> i64 {
        let mut newest = i64::MIN;
        let mut visited = HashSet::new();
        let mut stack = vec![normalize_path(source)];

        while let Some(file) = stack.pop() {
            if !visited.insert(file.clone()) {
                continue;
            }
            if !file.exists() {
                return i64::MAX;
            }
            let mut info = self.record_for(analyzer, &file);
            let vanished = info
                .includes()
                .iter()
                .any(|include| !analyzer.base_dir().join(include).exists());
            if vanished {
                tracing::debug!("re-analyzing {}: an include has moved", file.display());
                info = analyzer.analyze(&file);
                self.insert(info.clone());
            }
            newest = newest.max(info.timestamp());
            for include in info.includes() {
                stack.push(normalize_path(&analyzer.base_dir().join(include)));
            }
        }

        newest
    }

    /// Configuration identifier a target was last built with.
    pub fn history(&self, target: &str) -> Option<&str> {
        self.history.get(target).map(String::as_str)
    }

    pub fn record_history(&mut self, target: impl Into<String>, configuration: impl Into<String>) {
        self.history.insert(target.into(), configuration.into());
    }

    /// Decide whether `output` must be rebuilt.
    pub fn decide(
        &self,
        target: &str,
        output: &Path,
        configuration: &str,
        rebuild: bool,
        newest_input: i64,
    ) -> Staleness {
        let Some(output_time) = modified_millis(output) else {
            return Staleness::MissingOutput;
        };
        if rebuild {
            return Staleness::RebuildRequested;
        }
        if self.history(target) != Some(configuration) {
            return Staleness::ConfigurationChanged;
        }
        if newest_input > output_time {
            return Staleness::NewerInput;
        }
        Staleness::Fresh
    }
}
