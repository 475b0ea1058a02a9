//! Linker configurations.
//!
//! A [`LinkerConfiguration`] is built once per build from layered linker
//! definitions. It picks a concrete variant from the decision table,
//! synthesizes pre, mid and end arguments in that fixed order, and turns
//! them into a command line for a given output and inputs.

pub mod decorate;
pub mod flags;
pub mod table;

use std::path::{Path, PathBuf};

use crate::builder::command::{self, CommandLine};
use crate::builder::processor::Processor;
use crate::builder::runner::CommandRunner;
use crate::builder::toolchain_cache::ToolchainCache;
use crate::core::definition::{find_param, Layered, LinkerDef, Param};
use crate::core::link_type::LinkType;
use crate::core::platform::Platform;
use crate::util::errors::{BuildError, BuildResult};
use crate::util::fs::{normalize_path, quote_filename};

pub use self::flags::{FlagContext, LinkSettings};
pub use self::table::{Decoration, Driver, Family, FlagStyle, LinkKind, LinkerVariant, OsClass, VariantKey, Wrapper};

/// Where a link input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Found among the project's files
    Visited,
    /// Resolved from a library set
    LibrarySet,
}

/// One file handed to the linker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkInput {
    pub path: PathBuf,
    pub origin: Origin,
}

impl LinkInput {
    pub fn visited(path: impl Into<PathBuf>) -> Self {
        LinkInput {
            path: path.into(),
            origin: Origin::Visited,
        }
    }

    pub fn library(path: impl Into<PathBuf>) -> Self {
        LinkInput {
            path: path.into(),
            origin: Origin::LibrarySet,
        }
    }
}

/// Everything outside the definitions that shapes a linker configuration.
pub struct LinkerContext<'a> {
    pub platform: Platform,
    pub link_type: LinkType,
    /// Driver flavour when the linker kind does not imply one
    pub driver: Driver,
    pub wrapper: Wrapper,
    /// Cross prefix when no `target` parameter is given
    pub target: Option<String>,
    /// Run the `libtool` flavour where one exists
    pub libtool: bool,
    /// OS/390 dataset the output goes into
    pub dataset: Option<String>,
    /// Directory relative paths in definitions are resolved against
    pub base_dir: PathBuf,
    /// Directory the output is written to
    pub output_dir: PathBuf,
    /// Library path from the environment, for families that use it
    pub env_library_path: Vec<PathBuf>,
    pub cache: &'a ToolchainCache,
    pub runner: &'a dyn CommandRunner,
}

/// An immutable, comparable linker configuration.
#[derive(Debug, Clone)]
pub struct LinkerConfiguration {
    name: String,
    variant: LinkerVariant,
    platform: Platform,
    command: String,
    use_libtool: bool,
    dataset: Option<String>,
    identifier: String,
    pre_args: Vec<String>,
    end_args: Vec<String>,
    params: Vec<Param>,
    library_names: Vec<String>,
    libraries: Vec<PathBuf>,
    rebuild: bool,
    debug: bool,
    map: bool,
}

impl PartialEq for LinkerConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for LinkerConfiguration {}

impl LinkerConfiguration {
    /// Build the configuration for the most specific definition in `layered`.
    pub fn create(layered: &Layered<'_, LinkerDef>, ctx: &LinkerContext<'_>) -> BuildResult<Self> {
        let kind = layered
            .first(|d| d.kind.clone())
            .unwrap_or_else(|| "gcc".to_string());
        let (family, implied_driver) =
            Family::parse_kind(&kind).ok_or_else(|| BuildError::InvalidValue {
                what: "linker kind",
                value: kind.clone(),
            })?;

        let key = VariantKey {
            family,
            kind: LinkKind::from(&ctx.link_type),
            os: OsClass::of(&ctx.platform),
            driver: implied_driver.unwrap_or(ctx.driver),
            wrapper: ctx.wrapper,
        };
        let variant = table::lookup(&key)?;
        let effective = variant.family;

        let params = layered.params();
        let target = find_param(&params, "target")
            .map(str::to_string)
            .or_else(|| ctx.target.clone());
        let prefixed = |tool: &str| match (&target, effective.is_cross()) {
            (Some(t), true) => format!("{}-{}", t, tool),
            _ => tool.to_string(),
        };
        let command = prefixed(variant.command);

        let identifier_argv = vec![command.clone(), effective.identifier_arg().to_string()];
        let tool_identifier = ctx.cache.identifier(ctx.runner, &identifier_argv, &command);

        let settings = LinkSettings {
            debug: layered.first(|d| d.debug).unwrap_or(false),
            incremental: layered.first(|d| d.incremental).unwrap_or(false),
            fixed: layered.first(|d| d.fixed).unwrap_or(false),
            map: layered.first(|d| d.map).unwrap_or(false),
            base: layered.first(|d| d.base).unwrap_or(-1),
            stack: layered.first(|d| d.stack).unwrap_or(0),
            entry: layered.first(|d| d.entry.clone()),
        };
        let rebuild = layered.first(|d| d.rebuild).unwrap_or(false);

        let output_dir = normalize_path(&ctx.output_dir);
        let flag_ctx = FlagContext {
            platform: &ctx.platform,
            link_type: &ctx.link_type,
            identifier: &tool_identifier,
            output_dir: Some(&output_dir),
            base_dir: &ctx.base_dir,
        };

        let mut buckets = layered.arg_buckets();
        buckets
            .pre
            .extend(flags::implied_args(effective, &flag_ctx, &settings));

        let libsets = layered.collect_base_first(|d| &d.libsets);
        let library_names = if libsets.is_empty() {
            Vec::new()
        } else {
            flags::library_set_args(effective, &flag_ctx, &libsets, &mut buckets)
        };

        if effective.cxx_runtime() {
            let runtime = if ctx.link_type.is_static_runtime() {
                ctx.cache
                    .static_runtime_library(ctx.runner, &prefixed("g++"))
            } else {
                Some("-lstdc++".to_string())
            };
            buckets.end.extend(runtime);
        }

        let search_path = match (effective.search_path_driver(), effective.style()) {
            (Some(driver), _) => ctx.cache.library_search_path(ctx.runner, &prefixed(driver)),
            (None, FlagStyle::Os390 | FlagStyle::C89) => ctx.env_library_path.clone(),
            (None, _) => Vec::new(),
        };
        let libraries = flags::resolve_libraries(
            effective,
            &ctx.platform,
            &libsets,
            &ctx.base_dir,
            &search_path,
        );

        let mut identifier = tool_identifier;
        for arg in buckets.iter() {
            identifier.push(' ');
            identifier.push_str(arg);
        }

        let mut pre_args = buckets.pre;
        pre_args.extend(buckets.mid);

        tracing::debug!(
            "linker `{}` resolved to {} ({})",
            layered.specific().name,
            variant.command,
            key
        );

        Ok(LinkerConfiguration {
            name: layered.specific().name.clone(),
            variant,
            platform: ctx.platform.clone(),
            command,
            use_libtool: ctx.libtool && variant.libtool,
            dataset: ctx.dataset.clone(),
            identifier,
            pre_args,
            end_args: buckets.end,
            params,
            library_names,
            libraries,
            rebuild,
            debug: settings.debug,
            map: settings.map,
        })
    }

    /// Definition name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variant(&self) -> &LinkerVariant {
        &self.variant
    }

    pub fn family(&self) -> Family {
        self.variant.family
    }

    /// Tool command, including any cross prefix.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Canonical identifier: tool version plus every argument.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Pre and mid arguments, in order.
    pub fn pre_args(&self) -> &[String] {
        &self.pre_args
    }

    pub fn end_args(&self) -> &[String] {
        &self.end_args
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        find_param(&self.params, name)
    }

    /// Library names already spelled by library set arguments.
    pub fn library_names(&self) -> &[String] {
        &self.library_names
    }

    /// Library files resolved from library sets.
    pub fn libraries(&self) -> &[PathBuf] {
        &self.libraries
    }

    pub fn rebuild(&self) -> bool {
        self.rebuild
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn map(&self) -> bool {
        self.map
    }

    /// Output file name for a base name, e.g. `libfoo.so` for `foo`.
    pub fn output_file_name(&self, base: &str) -> String {
        self.variant.output_file_name(base)
    }

    /// Library set inputs are dropped when the arguments already name them.
    pub fn link_inputs<'a>(&self, inputs: &'a [LinkInput]) -> impl Iterator<Item = &'a LinkInput> {
        let drop_libraries = self.variant.family.spells_library_sets();
        inputs
            .iter()
            .filter(move |i| !(drop_libraries && i.origin == Origin::LibrarySet))
    }

    /// The file the tool actually writes. The dataset linker drops
    /// everything from the first `.` of the name.
    pub fn effective_output(&self, output: &Path) -> PathBuf {
        if self.variant.family != Family::Os390Dataset {
            return output.to_path_buf();
        }
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match name.find('.') {
            Some(p) => output.with_file_name(&name[..p]),
            None => output.to_path_buf(),
        }
    }

    fn output_switch(&self, output_name: &str) -> Vec<String> {
        match self.variant.family.style() {
            FlagStyle::Archive => vec!["rvs".to_string(), quote_filename(output_name)],
            FlagStyle::GnuLd => vec!["-o".to_string(), quote_filename(output_name)],
            FlagStyle::Os390 => {
                let name = match (&self.dataset, self.variant.family) {
                    (Some(ds), Family::Os390Dataset) => format!("//'{}({})'", ds, output_name),
                    _ => output_name.to_string(),
                };
                vec!["-o".to_string(), name]
            }
            FlagStyle::C89 => vec!["-o".to_string(), output_name.to_string()],
        }
    }

    /// The full command line for linking `inputs` into `output`, before
    /// any response-file fallback.
    pub fn link_command(&self, output: &Path, inputs: &[LinkInput]) -> CommandLine {
        let output = self.effective_output(output);
        let output_dir = command::output_dir(&output);
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut prefix = Vec::new();
        if self.use_libtool {
            prefix.push("libtool".to_string());
        }
        if self.variant.xcrun {
            prefix.push("xcrun".to_string());
        }
        prefix.push(self.command.clone());

        let decoration = self.variant.family.decoration();
        CommandLine::new(prefix)
            .args(decorate::decorate_all(decoration, &self.platform, &self.pre_args))
            .args(self.output_switch(&output_name))
            .args(
                self.link_inputs(inputs)
                    .map(|i| command::prepare_filename(&output_dir, &i.path)),
            )
            .args(decorate::decorate_all(decoration, &self.platform, &self.end_args))
    }

    /// The command line that will actually run, writing a response file
    /// beside the output when the line is too long.
    pub fn prepare(&self, output: &Path, inputs: &[LinkInput]) -> BuildResult<CommandLine> {
        let output = self.effective_output(output);
        let family = self.variant.family;
        self.link_command(&output, inputs).fit(
            family.max_command_length(&self.platform),
            family.response_switch(),
            &command::response_file_path(&output),
        )
    }

    /// Link `inputs` into `output`.
    pub fn link(&self, runner: &dyn CommandRunner, output: &Path, inputs: &[LinkInput]) -> BuildResult<()> {
        let family = self.variant.family;
        let output = self.effective_output(output);
        let output_dir = command::output_dir(&output);

        if family == Family::Ar && output.exists() {
            std::fs::remove_file(&output).map_err(|source| BuildError::Io {
                context: format!("Unable to delete {}", output.display()),
                source,
            })?;
        }

        let cmd = self.prepare(&output, inputs)?;
        command::execute(runner, &self.command, cmd.argv(), &output_dir, false)?;

        if family == Family::Os390Dataset {
            let marker = || -> std::io::Result<()> {
                if output.exists() {
                    std::fs::remove_file(&output)?;
                }
                std::fs::File::create(&output).map(|_| ())
            };
            marker().map_err(|source| BuildError::Io {
                context: format!("failed to create {}", output.display()),
                source,
            })?;
        }

        Ok(())
    }
}

impl Processor for LinkerConfiguration {
    fn bid(&self, filename: &str) -> u32 {
        self.variant.family.extensions().linker_bid(filename)
    }
}
