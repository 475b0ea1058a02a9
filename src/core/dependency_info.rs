//! Per-source dependency records.

use serde::{Deserialize, Serialize};

/// Filesystem timestamp resolution tolerance, in milliseconds.
pub const FILETIME_EPSILON_MS: i64 = 500;

/// Amount a record's timestamp is raised for each include that could not be
/// resolved on any search path.
pub const UNRESOLVED_INCLUDE_PENALTY_MS: i64 = 2 * FILETIME_EPSILON_MS;

/// Resolved includes of one source file under one include-path set.
///
/// Paths are stored relative to the base directory the record was built
/// against, with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyInfo {
    include_path_identifier: String,
    source: String,
    timestamp: i64,
    includes: Vec<String>,
    sys_includes: Vec<String>,
}

impl DependencyInfo {
    pub fn new(
        include_path_identifier: impl Into<String>,
        source: impl Into<String>,
        timestamp: i64,
        includes: Vec<String>,
        sys_includes: Vec<String>,
    ) -> Self {
        DependencyInfo {
            include_path_identifier: include_path_identifier.into(),
            source: source.into(),
            timestamp,
            includes,
            sys_includes,
        }
    }

    /// Identifier of the include-path configuration the record was built with.
    pub fn include_path_identifier(&self) -> &str {
        &self.include_path_identifier
    }

    /// Source path relative to the base directory.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Effective staleness timestamp in milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Includes found next to the source or on the declared include path.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Includes found on the system or environment include path.
    pub fn sys_includes(&self) -> &[String] {
        &self.sys_includes
    }

    /// Lookup key: (relative source, include-path identifier).
    pub fn key(&self) -> (String, String) {
        (self.source.clone(), self.include_path_identifier.clone())
    }
}
