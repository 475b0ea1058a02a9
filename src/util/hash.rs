//! Digests naming sets of search directories.
//!
//! Dependency records are keyed by the include path they were resolved
//! against, so two configurations with the same directories share records.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::util::fs::portable_relative;

/// Hex characters kept from the full digest.
const DIGEST_LEN: usize = 16;

/// Incremental digest over labelled groups of directories.
///
/// Directories are hashed relative to a base directory, so moving a
/// project tree keeps its digests.
pub struct PathSetDigest<'a> {
    base_dir: &'a Path,
    hasher: Sha256,
}

impl<'a> PathSetDigest<'a> {
    pub fn new(base_dir: &'a Path) -> Self {
        PathSetDigest {
            base_dir,
            hasher: Sha256::new(),
        }
    }

    /// Start a group of directories.
    pub fn group(&mut self, label: &str) -> &mut Self {
        self.write(label);
        self
    }

    pub fn dirs<'p>(&mut self, dirs: impl IntoIterator<Item = &'p Path>) -> &mut Self {
        for dir in dirs {
            let relative = portable_relative(self.base_dir, dir);
            self.write(&relative);
        }
        self
    }

    fn write(&mut self, component: &str) {
        self.hasher.update(component.as_bytes());
        self.hasher.update(b"\0");
    }

    pub fn finish(self) -> String {
        let mut digest = hex::encode(self.hasher.finalize());
        digest.truncate(DIGEST_LEN);
        digest
    }
}
