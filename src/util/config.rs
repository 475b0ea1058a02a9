//! Configuration file support for Cinder.
//!
//! Cinder supports two configuration file locations:
//! - Global: `~/.cinder/config.toml` - User-wide defaults
//! - Project: `.cinder/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::linker::table::{Driver, Wrapper};
use crate::core::platform::OsFamily;

/// Default file name of the persisted dependency table.
pub const DEFAULT_HISTORY: &str = "dependencies.json";

/// Cinder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Toolchain selection
    pub toolchain: ToolchainSettings,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Number of parallel compile jobs (None = 1)
    pub jobs: Option<usize>,

    /// Keep compiling after a failed source and report every failure
    #[serde(default)]
    pub relentless: bool,

    /// File name of the dependency table inside the object directory
    pub history: Option<String>,
}

/// Toolchain selection used when resolving linker variants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Compiler driver flavour (`gcc` or `clang`)
    pub driver: Option<String>,

    /// Wrap Darwin invocations with `xcrun`
    #[serde(default)]
    pub xcode: bool,

    /// Cross-compilation prefix, e.g. `arm-none-eabi`
    pub target: Option<String>,

    /// Override the detected operating system
    pub os: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if other.build.relentless {
            self.build.relentless = true;
        }
        if other.build.history.is_some() {
            self.build.history = other.build.history;
        }

        if other.toolchain.driver.is_some() {
            self.toolchain.driver = other.toolchain.driver;
        }
        if other.toolchain.xcode {
            self.toolchain.xcode = true;
        }
        if other.toolchain.target.is_some() {
            self.toolchain.target = other.toolchain.target;
        }
        if other.toolchain.os.is_some() {
            self.toolchain.os = other.toolchain.os;
        }
    }

    /// Parallel compile jobs, at least one.
    pub fn jobs(&self) -> usize {
        self.build.jobs.unwrap_or(1).max(1)
    }

    /// Dependency table file name.
    pub fn history(&self) -> &str {
        self.build.history.as_deref().unwrap_or(DEFAULT_HISTORY)
    }

    /// Parse driver flavour from config string.
    pub fn driver(&self) -> Option<Driver> {
        self.toolchain.driver.as_ref().and_then(|s| s.parse().ok())
    }

    /// Wrapper flavour implied by the `xcode` switch.
    pub fn wrapper(&self) -> Wrapper {
        if self.toolchain.xcode {
            Wrapper::Xcode
        } else {
            Wrapper::Native
        }
    }

    /// Parse the OS override.
    pub fn os(&self) -> Option<OsFamily> {
        self.toolchain.os.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.cinder/config.toml)
/// 2. Global config (~/.cinder/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        let global = Config::load_or_default(global_path);
        config.merge(global);
    }

    if project_path.exists() {
        let project = Config::load_or_default(project_path);
        config.merge(project);
    }

    config
}

/// Get the global cinder config directory (~/.cinder).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".cinder"))
}

/// Get the global config path (~/.cinder/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.cinder/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".cinder").join("config.toml")
}

/// Load the configuration that applies to a project root.
pub fn load_for_project(project_root: &Path) -> Config {
    let project = project_config_path(project_root);
    match global_config_path() {
        Some(global) => load_config(&global, &project),
        None => load_config(Path::new(""), &project),
    }
}
