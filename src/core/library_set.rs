//! Library sets: named libraries in a directory, linked with a given type.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a library set is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryType {
    Static,
    #[serde(alias = "dynamic")]
    Shared,
    /// Darwin framework bundle; treated as shared elsewhere
    Framework,
}

impl LibraryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryType::Static => "static",
            LibraryType::Shared => "shared",
            LibraryType::Framework => "framework",
        }
    }
}

/// A group of libraries sharing a directory and link type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibrarySet {
    /// Directory holding the libraries, relative to the project root
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Library names without prefix or extension
    #[serde(default)]
    pub libs: Vec<String>,

    /// Link type; `None` accepts both static and shared archives
    #[serde(default, rename = "type")]
    pub lib_type: Option<LibraryType>,

    /// OS/390 dataset name
    #[serde(default)]
    pub dataset: Option<String>,
}

impl LibrarySet {
    /// Create a set from library names.
    pub fn new<I, S>(libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LibrarySet {
            libs: libs.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_type(mut self, lib_type: LibraryType) -> Self {
        self.lib_type = Some(lib_type);
        self
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Resolve the set directory against a base directory.
    pub fn dir_in(&self, base: &Path) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| {
            if d.is_absolute() {
                d.clone()
            } else {
                base.join(d)
            }
        })
    }

    /// Whether this set names frameworks.
    pub fn is_framework(&self) -> bool {
        self.lib_type == Some(LibraryType::Framework)
    }
}
