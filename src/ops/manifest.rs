//! Cinder.toml project description.
//!
//! A manifest names the project's sources and output, and lists the
//! compiler and linker definitions the build is configured from.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::definition::{concrete, CompilerDef, LinkerDef};
use crate::core::link_type::{LinkType, OutputType, Runtime, Subsystem};
use crate::util::errors::BuildError;
use crate::util::fs::{expand_sources, normalize_path};

/// File name of a project description.
pub const MANIFEST_NAME: &str = "Cinder.toml";

/// A loaded project description.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub project: ProjectSection,
    pub compilers: Vec<CompilerDef>,
    pub linkers: Vec<LinkerDef>,
    /// Directory containing the manifest
    root: PathBuf,
}

/// The `[project]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    pub name: String,
    pub outtype: OutputType,
    pub runtime: Runtime,
    pub subsystem: Subsystem,
    /// Directories or globs, relative to the project root
    pub sources: Vec<String>,
    pub objdir: PathBuf,
    pub outdir: PathBuf,
    /// Base name of the linked output; defaults to the project name
    pub outfile: Option<String>,
    /// Build static libraries with the compiler driver instead of `ar`
    #[serde(rename = "high-level-tool", alias = "high_level_tool")]
    pub high_level_tool: bool,
    /// Run the `libtool` flavour of linkers that have one
    pub libtool: bool,
    /// OS/390 dataset for dataset linkers
    pub dataset: Option<String>,
    pub precompile: Option<PrecompileSection>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        ProjectSection {
            name: String::new(),
            outtype: OutputType::default(),
            runtime: Runtime::default(),
            subsystem: Subsystem::default(),
            sources: vec!["src".to_string()],
            objdir: PathBuf::from("obj"),
            outdir: PathBuf::from("."),
            outfile: None,
            high_level_tool: false,
            libtool: false,
            dataset: None,
            precompile: None,
        }
    }
}

/// The `[project.precompile]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecompileSection {
    /// Source whose last include marks the end of the precompiled headers
    pub prototype: PathBuf,
    /// Sources compiled without the precompiled header
    #[serde(default)]
    pub except: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    project: Option<ProjectSection>,
    #[serde(default, rename = "compiler")]
    compilers: Vec<CompilerDef>,
    #[serde(default, rename = "linker")]
    linkers: Vec<LinkerDef>,
}

impl Manifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse manifest content read from `path`.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let Some(project) = raw.project else {
            bail!("manifest at {} has no [project] section", path.display());
        };
        if project.name.trim().is_empty() {
            bail!("manifest at {} has an empty project name", path.display());
        }
        if raw.compilers.is_empty() {
            bail!(
                "manifest at {} defines no [[compiler]]",
                path.display()
            );
        }

        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        Ok(Manifest {
            project,
            compilers: raw.compilers,
            linkers: raw.linkers,
            root: normalize_path(&root),
        })
    }

    /// Find the manifest in `start` or one of its ancestors.
    pub fn find(start: &Path) -> Result<PathBuf> {
        let mut dir = Some(start);
        while let Some(current) = dir {
            let candidate = current.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            dir = current.parent();
        }
        bail!(
            "could not find {} in {} or any parent directory",
            MANIFEST_NAME,
            start.display()
        )
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn obj_dir(&self) -> PathBuf {
        self.root.join(&self.project.objdir)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.project.outdir)
    }

    /// Base name of the linked output.
    pub fn output_base(&self) -> &str {
        self.project.outfile.as_deref().unwrap_or(&self.project.name)
    }

    pub fn link_type(&self) -> LinkType {
        LinkType::new(self.project.outtype)
            .with_runtime(self.project.runtime)
            .with_subsystem(self.project.subsystem)
            .with_high_level_tool(self.project.high_level_tool)
    }

    /// Every source file, sorted.
    pub fn source_files(&self) -> Result<Vec<PathBuf>> {
        let files = expand_sources(&self.root, &self.project.sources)?;
        Ok(files.iter().map(|f| normalize_path(f)).collect())
    }

    /// Non-abstract compiler definitions in declaration order.
    pub fn active_compilers(&self) -> Vec<&CompilerDef> {
        concrete(&self.compilers).collect()
    }

    /// The single non-abstract linker definition, if any.
    pub fn active_linker(&self) -> Result<Option<&LinkerDef>, BuildError> {
        let active: Vec<&LinkerDef> = concrete(&self.linkers).collect();
        match active.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(one)),
            many => Err(BuildError::MultipleLinkers {
                names: many.iter().map(|l| l.name.clone()).collect(),
            }),
        }
    }

    /// Precompiled-header prototype and except list, resolved against the root.
    pub fn precompile(&self) -> Option<(PathBuf, Vec<PathBuf>)> {
        self.project.precompile.as_ref().map(|pch| {
            let resolve = |p: &PathBuf| normalize_path(&self.root.join(p));
            (
                resolve(&pch.prototype),
                pch.except.iter().map(resolve).collect(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{manifests, ProjectFixture};
    use tempfile::TempDir;

    #[test]
    fn test_parse_fixture_manifest() {
        let content = manifests::c_project("hello", "shared");
        let manifest = Manifest::parse(&content, Path::new("/proj/Cinder.toml")).unwrap();

        assert_eq!(manifest.project.name, "hello");
        assert_eq!(manifest.project.outtype, OutputType::Shared);
        assert_eq!(manifest.output_base(), "hello");
        assert_eq!(manifest.obj_dir(), PathBuf::from("/proj/build/obj"));
        assert_eq!(manifest.compilers.len(), 1);
        assert_eq!(manifest.compilers[0].includepath, vec![PathBuf::from("include")]);
        assert_eq!(manifest.active_linker().unwrap().map(|l| l.name.as_str()), Some("link"));
    }

    #[test]
    fn test_defaults_and_options() {
        let content = r#"
[project]
name = "tool"
outfile = "mytool"
runtime = "static"
high-level-tool = true

[project.precompile]
prototype = "src/pch.c"
except = ["src/legacy.c"]

[[compiler]]
name = "base"
abstract = true
defines = ["BASE"]

[[compiler]]
name = "cc"
extends = "base"
args = [{ value = "-O2", location = "pre" }]

[[linker]]
name = "link"
kind = "g++"
stack = 65536
libsets = [{ libs = ["m", "pthread"] }, { dir = "lib", libs = ["z"], type = "static" }]
"#;
        let manifest = Manifest::parse(content, Path::new("/p/Cinder.toml")).unwrap();
        assert_eq!(manifest.project.sources, vec!["src"]);
        assert_eq!(manifest.output_base(), "mytool");
        assert!(manifest.link_type().is_static_runtime());
        assert!(manifest.link_type().use_high_level_tool());
        assert_eq!(manifest.active_compilers().len(), 1);

        let linker = manifest.active_linker().unwrap().unwrap();
        assert_eq!(linker.stack, Some(65536));
        assert_eq!(linker.libsets.len(), 2);
        assert_eq!(linker.libsets[1].libs, vec!["z"]);

        let (prototype, except) = manifest.precompile().unwrap();
        assert_eq!(prototype, PathBuf::from("/p/src/pch.c"));
        assert_eq!(except, vec![PathBuf::from("/p/src/legacy.c")]);
    }

    #[test]
    fn test_multiple_linkers_rejected() {
        let content = r#"
[project]
name = "x"

[[compiler]]
name = "cc"

[[linker]]
name = "a"

[[linker]]
name = "b"
"#;
        let manifest = Manifest::parse(content, Path::new("Cinder.toml")).unwrap();
        let err = manifest.active_linker().unwrap_err();
        assert!(matches!(err, BuildError::MultipleLinkers { ref names } if names == &["a", "b"]));
    }

    #[test]
    fn test_missing_sections() {
        assert!(Manifest::parse("[[compiler]]\nname = \"cc\"\n", Path::new("Cinder.toml")).is_err());
        assert!(Manifest::parse("[project]\nname = \"x\"\n", Path::new("Cinder.toml")).is_err());
        assert!(Manifest::parse("[project]\nname = \"\"\n[[compiler]]\nname = \"cc\"\n", Path::new("Cinder.toml")).is_err());
    }

    #[test]
    fn test_find_and_sources() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();

        let found = Manifest::find(&root.join("src")).unwrap();
        assert_eq!(found, root.join(MANIFEST_NAME));

        let manifest = Manifest::load(&found).unwrap();
        let files = manifest.source_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["main.c", "util.c"]);
    }
}
