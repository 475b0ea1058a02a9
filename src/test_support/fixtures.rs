//! Test fixtures for common test scenarios.
//!
//! Project fixtures write a `Cinder.toml` and its sources into a directory,
//! usually a `tempfile::TempDir`.

use std::path::{Path, PathBuf};

/// Fixture for a complete project tree.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Project name.
    pub name: String,
    /// Cinder.toml content.
    pub manifest: String,
    /// Files (path relative to project root, content).
    pub files: Vec<(PathBuf, String)>,
}

impl ProjectFixture {
    /// Create a new empty project fixture.
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: String::new(),
            files: Vec::new(),
        }
    }

    /// A C executable: `src/main.c` including `util.h` from `include/`,
    /// and `src/util.c`.
    pub fn c_executable(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = manifests::c_project(&name, "executable");
        ProjectFixture::new(name)
            .with_manifest(manifest)
            .with_file(
                "src/main.c",
                "#include \"util.h\"\n#include <stdio.h>\n\nint main(void) {\n    return util();\n}\n",
            )
            .with_file(
                "src/util.c",
                "#include \"util.h\"\n\nint util(void) {\n    return 0;\n}\n",
            )
            .with_file("include/util.h", "int util(void);\n")
    }

    /// Set the manifest content.
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Add a file.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Write the fixture under `base_path`, returning the project root.
    pub fn write_to(&self, base_path: &Path) -> std::io::Result<PathBuf> {
        let root = base_path.join(&self.name);
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join("Cinder.toml"), &self.manifest)?;

        for (path, content) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }

        Ok(root)
    }
}

/// Manifest templates.
pub mod manifests {
    /// A gcc-compiled, gcc-linked project producing `outtype`.
    pub fn c_project(name: &str, outtype: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
outtype = "{outtype}"
sources = ["src"]
objdir = "build/obj"
outdir = "build"

[[compiler]]
name = "cc"
kind = "gcc"
includepath = ["include"]

[[linker]]
name = "link"
kind = "gcc"
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_c_executable() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("hello").write_to(tmp.path()).unwrap();
        assert!(root.join("Cinder.toml").exists());
        assert!(root.join("src/main.c").exists());
        assert!(root.join("include/util.h").exists());
        let manifest = std::fs::read_to_string(root.join("Cinder.toml")).unwrap();
        assert!(manifest.contains("name = \"hello\""));
    }
}
