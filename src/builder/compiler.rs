//! Compiler configurations.
//!
//! A [`CompilerKind`] names one of the supported tools and carries its
//! static traits: extensions, include grammar, command-line style and
//! precompiled-header language. A [`CompilerConfiguration`] binds a kind to
//! the settings of a layered compiler definition and synthesizes compile
//! command lines from them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::builder::command::{self, CommandLine, ResponseSwitch};
use crate::builder::dependency::{DependencyAnalyzer, IncludeSearch};
use crate::builder::include_parser::{AsmParser, CParser, IncludeParser, NullParser};
use crate::builder::linker::Wrapper;
use crate::builder::processor::{base_output_name, Compiler, Extensions, Processor, BID_NONE};
use crate::builder::runner::CommandRunner;
use crate::builder::toolchain_cache::ToolchainCache;
use crate::core::definition::{find_param, CompilerDef, Layered, Param};
use crate::core::platform::Platform;
use crate::util::errors::{BuildError, BuildResult};
use crate::util::fs::{normalize_path, portable_relative, quote_filename};
use crate::util::hash::PathSetDigest;

/// Suffix of every object file a compiler produces.
pub const OBJECT_SUFFIX: &str = ".o";

const C_SOURCES: &[&str] = &[".c", ".i", ".m"];
const CXX_SOURCES: &[&str] = &[".cc", ".cpp", ".cxx", ".c++", ".ii", ".mm"];
const C_HEADERS: &[&str] = &[".h", ".hh", ".hpp", ".hxx", ".inl"];
const ASM_SOURCES: &[&str] = &[".s", ".sx", ".asm"];
const ASM_HEADERS: &[&str] = &[".inc"];
const RC_SOURCES: &[&str] = &[".rc"];
const RC_HEADERS: &[&str] = &[".h", ".rh"];

/// Supported compiler tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerKind {
    Gcc,
    Gpp,
    Clang,
    ClangPp,
    /// GNU assembler
    As,
    /// GNU resource compiler
    Windres,
}

/// How a tool's command line is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStyle {
    /// `cc -c [-g] -D.. -U.. -I.. -isystem .. args -o obj src`
    Driver,
    /// `as [-g] -I.. args -o obj src`
    Assembler,
    /// `windres -D.. -U.. -I.. args -o obj -i src`
    Resource,
}

impl CompilerKind {
    pub const ALL: [CompilerKind; 6] = [
        CompilerKind::Gcc,
        CompilerKind::Gpp,
        CompilerKind::Clang,
        CompilerKind::ClangPp,
        CompilerKind::As,
        CompilerKind::Windres,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerKind::Gcc => "gcc",
            CompilerKind::Gpp => "g++",
            CompilerKind::Clang => "clang",
            CompilerKind::ClangPp => "clang++",
            CompilerKind::As => "as",
            CompilerKind::Windres => "windres",
        }
    }

    /// Tool command before any cross prefix.
    pub fn command(&self) -> &'static str {
        self.as_str()
    }

    pub fn extensions(&self) -> Extensions {
        match self {
            CompilerKind::Gcc | CompilerKind::Clang => Extensions::new(C_SOURCES, C_HEADERS),
            CompilerKind::Gpp | CompilerKind::ClangPp => Extensions::new(CXX_SOURCES, C_HEADERS),
            CompilerKind::As => Extensions::new(ASM_SOURCES, ASM_HEADERS),
            CompilerKind::Windres => Extensions::new(RC_SOURCES, RC_HEADERS),
        }
    }

    /// Grammar used to find include directives in sources.
    pub fn parser(&self) -> &'static dyn IncludeParser {
        match self {
            CompilerKind::As => &AsmParser,
            CompilerKind::Windres => &NullParser,
            _ => &CParser,
        }
    }

    /// Argument that makes the tool print its version.
    pub fn identifier_arg(&self) -> &'static str {
        match self.style() {
            CompileStyle::Driver => "-dumpversion",
            CompileStyle::Assembler | CompileStyle::Resource => "--version",
        }
    }

    pub fn style(&self) -> CompileStyle {
        match self {
            CompilerKind::As => CompileStyle::Assembler,
            CompilerKind::Windres => CompileStyle::Resource,
            _ => CompileStyle::Driver,
        }
    }

    /// Language passed to `-x <lang>-header` when precompiling, if the
    /// tool can precompile at all.
    pub fn precompile_language(&self) -> Option<&'static str> {
        match self {
            CompilerKind::Gcc | CompilerKind::Clang => Some("c"),
            CompilerKind::Gpp | CompilerKind::ClangPp => Some("c++"),
            CompilerKind::As | CompilerKind::Windres => None,
        }
    }

    /// Clang selects cross targets with `--target` instead of a prefixed command.
    pub fn is_clang(&self) -> bool {
        matches!(self, CompilerKind::Clang | CompilerKind::ClangPp)
    }

    /// Maximum command length before falling back to a response file.
    pub fn max_command_length(&self, platform: &Platform) -> usize {
        match self.style() {
            CompileStyle::Driver if platform.is_windows() => 32000,
            _ => usize::MAX,
        }
    }
}

impl FromStr for CompilerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" | "cc" => Ok(CompilerKind::Gcc),
            "g++" | "gpp" | "c++" => Ok(CompilerKind::Gpp),
            "clang" => Ok(CompilerKind::Clang),
            "clang++" => Ok(CompilerKind::ClangPp),
            "as" | "gas" => Ok(CompilerKind::As),
            "windres" => Ok(CompilerKind::Windres),
            _ => Err(format!("unknown compiler kind: {}", s)),
        }
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything outside the definitions that shapes a compiler configuration.
pub struct CompilerContext<'a> {
    pub platform: Platform,
    pub wrapper: Wrapper,
    /// Cross prefix when no `target` parameter is given
    pub target: Option<String>,
    /// Directory relative paths in definitions are resolved against
    pub base_dir: PathBuf,
    /// Include path from the environment; searched for dependencies only
    pub env_include_path: Vec<PathBuf>,
    pub cache: &'a ToolchainCache,
    pub runner: &'a dyn CommandRunner,
}

/// An immutable, comparable compiler configuration.
#[derive(Debug, Clone)]
pub struct CompilerConfiguration {
    name: String,
    kind: CompilerKind,
    platform: Platform,
    command: String,
    xcrun: bool,
    identifier: String,
    include_path_identifier: String,
    search: IncludeSearch,
    base_dir: PathBuf,
    debug: bool,
    defines: Vec<String>,
    undefines: Vec<String>,
    pre_args: Vec<String>,
    end_args: Vec<String>,
    params: Vec<Param>,
    rebuild: bool,
    except: Vec<PathBuf>,
    precompile_generation: bool,
}

impl PartialEq for CompilerConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for CompilerConfiguration {}

/// The two configurations a precompiled-header build is split into.
#[derive(Debug, Clone)]
pub struct PrecompileSplit {
    /// Compiles the boundary header into the precompiled artifact
    pub generation: CompilerConfiguration,
    /// Compiles every other source against the precompiled artifact
    pub consumer: CompilerConfiguration,
    /// The header named by the prototype's last include
    pub header: PathBuf,
    /// Where the precompiled artifact is written
    pub output: PathBuf,
}

impl CompilerConfiguration {
    /// Build the configuration for the most specific definition in `layered`.
    pub fn create(layered: &Layered<'_, CompilerDef>, ctx: &CompilerContext<'_>) -> BuildResult<Self> {
        let kind_name = layered
            .first(|d| d.kind.clone())
            .unwrap_or_else(|| "gcc".to_string());
        let kind: CompilerKind = kind_name.parse().map_err(|_| BuildError::InvalidValue {
            what: "compiler kind",
            value: kind_name.clone(),
        })?;

        let params = layered.params();
        let target = find_param(&params, "target")
            .map(str::to_string)
            .or_else(|| ctx.target.clone());

        let mut buckets = layered.arg_buckets();
        let command = match &target {
            Some(t) if kind.is_clang() => {
                buckets.pre.insert(0, format!("--target={}", t));
                kind.command().to_string()
            }
            Some(t) => format!("{}-{}", t, kind.command()),
            None => kind.command().to_string(),
        };
        let xcrun = kind.is_clang() && ctx.wrapper == Wrapper::Xcode && ctx.platform.is_darwin();

        let resolve = |paths: Vec<PathBuf>| -> Vec<PathBuf> {
            paths
                .into_iter()
                .map(|p| normalize_path(&ctx.base_dir.join(p)))
                .collect()
        };
        let search = IncludeSearch {
            include: resolve(layered.collect_base_first(|d| &d.includepath)),
            sys: resolve(layered.collect_base_first(|d| &d.sysincludepath)),
            env: ctx.env_include_path.clone(),
        };

        let version_argv = vec![command.clone(), kind.identifier_arg().to_string()];
        let version = ctx.cache.identifier(ctx.runner, &version_argv, &command);

        let mut pre_args = buckets.pre;
        pre_args.extend(buckets.mid);

        let mut config = CompilerConfiguration {
            name: layered.specific().name.clone(),
            kind,
            platform: ctx.platform.clone(),
            command,
            xcrun,
            identifier: String::new(),
            include_path_identifier: include_path_identifier(&ctx.base_dir, &search),
            search,
            base_dir: normalize_path(&ctx.base_dir),
            debug: layered.first(|d| d.debug).unwrap_or(false),
            defines: layered.collect_base_first(|d| &d.defines),
            undefines: layered.collect_base_first(|d| &d.undefines),
            pre_args,
            end_args: buckets.end,
            params,
            rebuild: layered.first(|d| d.rebuild).unwrap_or(false),
            except: Vec::new(),
            precompile_generation: false,
        };
        config.identifier = config.compose_identifier(&version);

        tracing::debug!(
            "compiler `{}` resolved to {} ({})",
            config.name,
            config.command,
            version
        );
        Ok(config)
    }

    /// Tool, version and every flag, with paths relative to the base directory.
    fn compose_identifier(&self, version: &str) -> String {
        let mut parts = vec![self.command.clone(), version.to_string()];
        parts.extend(self.flag_args(|p| portable_relative(&self.base_dir, p)));
        parts.extend(self.pre_args.iter().cloned());
        parts.extend(self.end_args.iter().cloned());
        parts.join(" ")
    }

    /// Debug, define and include flags in command-line order.
    fn flag_args(&self, render: impl Fn(&Path) -> String) -> Vec<String> {
        let style = self.kind.style();
        let mut args = Vec::new();

        if self.debug && style != CompileStyle::Resource {
            args.push("-g".to_string());
        }
        if style != CompileStyle::Assembler {
            args.extend(self.defines.iter().map(|d| format!("-D{}", d)));
            args.extend(self.undefines.iter().map(|u| format!("-U{}", u)));
        }
        args.extend(self.search.include.iter().map(|p| format!("-I{}", render(p))));
        for dir in &self.search.sys {
            if style == CompileStyle::Driver {
                args.push("-isystem".to_string());
                args.push(render(dir));
            } else {
                args.push(format!("-I{}", render(dir)));
            }
        }
        args
    }

    /// Definition name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CompilerKind {
        self.kind
    }

    /// Tool command, including any cross prefix.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Canonical identifier: tool, version and every argument.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Identifier of the include and system include paths, so records
    /// built under different paths are kept apart.
    pub fn include_path_identifier(&self) -> &str {
        &self.include_path_identifier
    }

    pub fn include_search(&self) -> &IncludeSearch {
        &self.search
    }

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

    pub fn rebuild(&self) -> bool {
        self.rebuild
    }

    /// Files this configuration refuses to bid on.
    pub fn except(&self) -> &[PathBuf] {
        &self.except
    }

    /// Whether this configuration produces a precompiled header.
    pub fn is_precompile_generation(&self) -> bool {
        self.precompile_generation
    }

    /// Output file names for `input`; empty for files the tool does not
    /// compile, such as headers.
    pub fn output_file_names(&self, input: &str) -> Vec<String> {
        if self.kind.extensions().bid(input) > 1 {
            vec![format!("{}{}", base_output_name(input), OBJECT_SUFFIX)]
        } else {
            Vec::new()
        }
    }

    /// Dependency analyzer for sources compiled by this configuration.
    pub fn analyzer(&self) -> DependencyAnalyzer<'_> {
        DependencyAnalyzer::new(
            self.kind.parser(),
            &self.search,
            &self.base_dir,
            &self.include_path_identifier,
        )
    }

    /// The compile command for `source`, run from `output`'s directory.
    pub fn compile_command(&self, source: &Path, output: &Path) -> CommandLine {
        let cwd = command::output_dir(output);
        let rel = |p: &Path| command::prepare_filename(&cwd, p);
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut prefix = Vec::new();
        if self.xcrun {
            prefix.push("xcrun".to_string());
        }
        prefix.push(self.command.clone());

        let mut cmd = CommandLine::new(prefix);
        if self.kind.style() == CompileStyle::Driver {
            cmd = cmd.arg("-c");
        }
        cmd = cmd
            .args(self.flag_args(|p| rel(p)))
            .args(self.pre_args.iter().cloned())
            .arg("-o")
            .arg(quote_filename(&output_name));
        if self.kind.style() == CompileStyle::Resource {
            cmd = cmd.arg("-i");
        }
        cmd.arg(rel(source)).args(self.end_args.iter().cloned())
    }

    /// The command line that will actually run, with the response-file
    /// fallback applied.
    pub fn prepare(&self, source: &Path, output: &Path) -> BuildResult<CommandLine> {
        self.compile_command(source, output).fit(
            self.kind.max_command_length(&self.platform),
            ResponseSwitch::At,
            &command::response_file_path(output),
        )
    }

    /// Compile `source` into `output`.
    pub fn compile(&self, runner: &dyn CommandRunner, source: &Path, output: &Path) -> BuildResult<()> {
        let cmd = self.prepare(source, output)?;
        command::execute(runner, &self.command, cmd.argv(), &command::output_dir(output), false)?;
        Ok(())
    }

    /// Split into a configuration that precompiles the headers included by
    /// `prototype` and one that compiles everything else against them.
    ///
    /// The last include in the prototype marks the boundary. Files in
    /// `except` are left to other configurations. Returns `None` when the
    /// compiler cannot precompile headers.
    pub fn precompile(
        &self,
        prototype: &Path,
        except: &[PathBuf],
        obj_dir: &Path,
    ) -> BuildResult<Option<PrecompileSplit>> {
        let Some(language) = self.kind.precompile_language() else {
            return Ok(None);
        };

        let text = std::fs::read(prototype).map_err(|source| BuildError::Io {
            context: format!(
                "failed to read precompiled header prototype {}",
                prototype.display()
            ),
            source,
        })?;
        let boundary = self
            .kind
            .parser()
            .parse(&String::from_utf8_lossy(&text))
            .pop()
            .ok_or_else(|| BuildError::PrecompileNoBoundary {
                prototype: prototype.to_path_buf(),
            })?;

        let local = prototype
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let header = std::iter::once(&local)
            .chain(&self.search.include)
            .map(|dir| dir.join(&boundary))
            .find(|p| p.exists())
            .unwrap_or_else(|| local.join(&boundary));
        let obj_dir = normalize_path(obj_dir);
        let output = obj_dir.join(format!("{}.gch", boundary));

        let mut generation = self.clone();
        generation.pre_args.push("-x".to_string());
        generation.pre_args.push(format!("{}-header", language));
        generation.identifier = format!("{} -x {}-header", self.identifier, language);
        generation.precompile_generation = true;

        let mut consumer = self.clone();
        consumer.search.include.insert(0, obj_dir);
        consumer.include_path_identifier =
            include_path_identifier(&self.base_dir, &consumer.search);
        consumer.pre_args.push("-include".to_string());
        consumer.pre_args.push(boundary.clone());
        consumer.identifier = format!("{} -include {}", self.identifier, boundary);
        consumer.except = except.to_vec();

        tracing::debug!(
            "precompiling {} from {} into {}",
            boundary,
            prototype.display(),
            output.display()
        );

        Ok(Some(PrecompileSplit {
            generation,
            consumer,
            header,
            output,
        }))
    }
}

impl Processor for CompilerConfiguration {
    fn bid(&self, filename: &str) -> u32 {
        let bid = self.kind.extensions().bid(filename);
        if bid > BID_NONE && self.except.iter().any(|e| e.as_path() == Path::new(filename)) {
            return BID_NONE;
        }
        bid
    }
}

impl Compiler for CompilerConfiguration {
    fn output_file_names(&self, input: &str) -> Vec<String> {
        CompilerConfiguration::output_file_names(self, input)
    }

    fn rebuild(&self) -> bool {
        self.rebuild
    }
}

/// Short hash of the include and system include paths.
fn include_path_identifier(base_dir: &Path, search: &IncludeSearch) -> String {
    let mut digest = PathSetDigest::new(base_dir);
    digest
        .group("include")
        .dirs(search.include.iter().map(PathBuf::as_path))
        .group("sysinclude")
        .dirs(search.sys.iter().map(PathBuf::as_path));
    digest.finish()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::processor::{BID_DISCARD, BID_PROCESS};
    use crate::core::definition::{ArgLocation, DefArg};
    use crate::core::platform::OsFamily;
    use crate::test_support::RecordingRunner;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        cache: ToolchainCache,
        runner: RecordingRunner,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            for dir in ["src", "include", "obj"] {
                fs::create_dir_all(tmp.path().join(dir)).unwrap();
            }
            Fixture {
                tmp,
                cache: ToolchainCache::new(),
                runner: RecordingRunner::new().with_stdout(&["13.1.0"]),
            }
        }

        fn root(&self) -> PathBuf {
            normalize_path(self.tmp.path())
        }

        fn ctx(&self) -> CompilerContext<'_> {
            CompilerContext {
                platform: Platform::new(OsFamily::Linux, "x86_64"),
                wrapper: Wrapper::Native,
                target: None,
                base_dir: self.root(),
                env_include_path: Vec::new(),
                cache: &self.cache,
                runner: &self.runner,
            }
        }
    }

    fn def(kind: &str) -> CompilerDef {
        CompilerDef {
            name: "cc".to_string(),
            kind: Some(kind.to_string()),
            ..Default::default()
        }
    }

    fn create(d: &CompilerDef, ctx: &CompilerContext<'_>) -> CompilerConfiguration {
        let all = vec![d.clone()];
        let layered = Layered::resolve(&all[0], &all).unwrap();
        CompilerConfiguration::create(&layered, ctx).unwrap()
    }

    #[test]
    fn test_bids() {
        let f = Fixture::new();
        let cc = create(&def("gcc"), &f.ctx());
        assert_eq!(cc.bid("src/main.c"), BID_PROCESS);
        assert_eq!(cc.bid("SRC/MAIN.C"), BID_PROCESS);
        assert_eq!(cc.bid("include/util.h"), BID_DISCARD);
        assert_eq!(cc.bid("lib.o"), BID_NONE);

        let cxx = create(&def("g++"), &f.ctx());
        assert_eq!(cxx.bid("a.cpp"), BID_PROCESS);
        assert_eq!(cxx.bid("a.c"), BID_NONE);

        let rc = create(&def("windres"), &f.ctx());
        assert_eq!(rc.bid("app.rc"), BID_PROCESS);
    }

    #[test]
    fn test_output_names() {
        let f = Fixture::new();
        let cc = create(&def("gcc"), &f.ctx());
        assert_eq!(cc.output_file_names("src/main.c"), vec!["main.o"]);
        assert_eq!(cc.output_file_names("src\\win.c"), vec!["win.o"]);
        assert!(cc.output_file_names("util.h").is_empty());
        assert!(cc.output_file_names("notes.txt").is_empty());
    }

    #[test]
    fn test_compile_argv_order() {
        let f = Fixture::new();
        let mut d = def("gcc");
        d.debug = Some(true);
        d.defines = vec!["NDEBUG".to_string(), "LEVEL=2".to_string()];
        d.undefines = vec!["TRACE".to_string()];
        d.includepath = vec![PathBuf::from("include")];
        d.args = vec![
            DefArg::new("-lm", ArgLocation::End),
            DefArg::new("-Wall", ArgLocation::Mid),
            DefArg::new("-O2", ArgLocation::Pre),
        ];
        let cc = create(&d, &f.ctx());

        let root = f.root();
        let argv = cc
            .compile_command(&root.join("src/main.c"), &root.join("obj/main.o"))
            .into_argv();
        assert_eq!(
            argv,
            vec![
                "gcc",
                "-c",
                "-g",
                "-DNDEBUG",
                "-DLEVEL=2",
                "-UTRACE",
                "-I../include",
                "-O2",
                "-Wall",
                "-o",
                "main.o",
                "../src/main.c",
                "-lm"
            ]
        );
        assert_eq!(
            cc.identifier(),
            "gcc 13.1.0 -g -DNDEBUG -DLEVEL=2 -UTRACE -Iinclude -O2 -Wall -lm"
        );
        assert_eq!(f.runner.calls()[0], vec!["gcc", "-dumpversion"]);
    }

    #[test]
    fn test_sys_include_spelling_per_style() {
        let f = Fixture::new();
        let mut d = def("gcc");
        d.sysincludepath = vec![PathBuf::from("include")];
        let cc = create(&d, &f.ctx());
        let root = f.root();
        let argv = cc
            .compile_command(&root.join("src/a.c"), &root.join("obj/a.o"))
            .into_argv();
        assert!(argv.windows(2).any(|w| w == ["-isystem", "../include"]));

        let mut d = def("as");
        d.sysincludepath = vec![PathBuf::from("include")];
        d.debug = Some(true);
        d.defines = vec!["X".to_string()];
        let asm = create(&d, &f.ctx());
        let argv = asm
            .compile_command(&root.join("src/start.s"), &root.join("obj/start.o"))
            .into_argv();
        assert_eq!(argv, vec!["as", "-g", "-I../include", "-o", "start.o", "../src/start.s"]);
    }

    #[test]
    fn test_windres_layout() {
        let f = Fixture::new();
        let mut d = def("windres");
        d.defines = vec!["RC".to_string()];
        d.debug = Some(true);
        let rc = create(&d, &f.ctx());
        let root = f.root();
        let argv = rc
            .compile_command(&root.join("src/app.rc"), &root.join("obj/app.o"))
            .into_argv();
        assert_eq!(argv, vec!["windres", "-DRC", "-o", "app.o", "-i", "../src/app.rc"]);
        assert_eq!(f.runner.calls()[0], vec!["windres", "--version"]);
    }

    #[test]
    fn test_cross_target() {
        let f = Fixture::new();
        let mut d = def("gcc");
        d.params = vec![Param {
            name: "target".to_string(),
            value: "arm-none-eabi".to_string(),
        }];
        let cc = create(&d, &f.ctx());
        assert_eq!(cc.command(), "arm-none-eabi-gcc");

        let mut ctx = f.ctx();
        ctx.target = Some("aarch64-linux-gnu".to_string());
        let clang = create(&def("clang"), &ctx);
        assert_eq!(clang.command(), "clang");
        assert_eq!(clang.pre_args(), &["--target=aarch64-linux-gnu"]);
    }

    #[test]
    fn test_xcrun_only_for_clang_on_darwin() {
        let f = Fixture::new();
        let mut ctx = f.ctx();
        ctx.platform = Platform::new(OsFamily::Darwin, "arm64");
        ctx.wrapper = Wrapper::Xcode;
        let root = f.root();
        let clang = create(&def("clang"), &ctx);
        let argv = clang
            .compile_command(&root.join("src/a.c"), &root.join("obj/a.o"))
            .into_argv();
        assert_eq!(&argv[..3], &["xcrun", "clang", "-c"]);

        let gcc = create(&def("gcc"), &ctx);
        let argv = gcc
            .compile_command(&root.join("src/a.c"), &root.join("obj/a.o"))
            .into_argv();
        assert_eq!(argv[0], "gcc");
    }

    #[test]
    fn test_include_path_identifier_tracks_paths() {
        let f = Fixture::new();
        let plain = create(&def("gcc"), &f.ctx());
        let mut d = def("gcc");
        d.includepath = vec![PathBuf::from("include")];
        let with_include = create(&d, &f.ctx());
        assert_ne!(
            plain.include_path_identifier(),
            with_include.include_path_identifier()
        );
        assert_eq!(
            with_include.include_path_identifier(),
            create(&d, &f.ctx()).include_path_identifier()
        );
    }

    #[test]
    fn test_unknown_kind() {
        let f = Fixture::new();
        let all = vec![def("msvc")];
        let layered = Layered::resolve(&all[0], &all).unwrap();
        let err = CompilerConfiguration::create(&layered, &f.ctx()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { what: "compiler kind", .. }));
    }

    #[test]
    fn test_compile_failure_reports_tool() {
        let f = Fixture::new();
        let cc = create(&def("gcc"), &f.ctx());
        let root = f.root();
        let runner = RecordingRunner::new().with_exit_code(1);
        let err = cc
            .compile(&runner, &root.join("src/a.c"), &root.join("obj/a.o"))
            .unwrap_err();
        assert!(matches!(err, BuildError::ToolFailed { ref tool, code: 1, .. } if tool == "gcc"));
        assert_eq!(runner.cwds(), vec![Some(root.join("obj"))]);
    }

    #[test]
    fn test_analyzer_uses_kind_grammar() {
        let f = Fixture::new();
        let root = f.root();
        fs::write(root.join("include/util.h"), "").unwrap();
        fs::write(root.join("src/main.c"), "#include \"util.h\"\n#include <stdio.h>\n").unwrap();
        let mut d = def("gcc");
        d.includepath = vec![PathBuf::from("include")];
        let cc = create(&d, &f.ctx());

        let info = cc.analyzer().analyze(&root.join("src/main.c"));
        assert_eq!(info.source(), "src/main.c");
        assert_eq!(info.includes(), &["include/util.h".to_string()]);
        assert_eq!(info.include_path_identifier(), cc.include_path_identifier());
    }

    #[test]
    fn test_precompile_split() {
        let f = Fixture::new();
        let root = f.root();
        fs::write(root.join("include/pch.h"), "").unwrap();
        fs::write(
            root.join("src/pch.c"),
            "#include <stddef.h>\n#include \"pch.h\"\n",
        )
        .unwrap();
        let mut d = def("gcc");
        d.includepath = vec![PathBuf::from("include")];
        let cc = create(&d, &f.ctx());

        let except = vec![root.join("src/legacy.c")];
        let split = cc
            .precompile(&root.join("src/pch.c"), &except, &root.join("obj"))
            .unwrap()
            .unwrap();
        assert_eq!(split.header, root.join("include/pch.h"));
        assert_eq!(split.output, root.join("obj/pch.h.gch"));

        assert!(split.generation.is_precompile_generation());
        let argv = split
            .generation
            .compile_command(&split.header, &split.output)
            .into_argv();
        assert!(argv.windows(2).any(|w| w == ["-x", "c-header"]));
        assert_eq!(argv.last().map(String::as_str), Some("../include/pch.h"));

        let consumer = &split.consumer;
        assert_eq!(consumer.bid(&root.join("src/legacy.c").to_string_lossy()), BID_NONE);
        assert_eq!(consumer.bid(&root.join("src/main.c").to_string_lossy()), BID_PROCESS);
        let argv = consumer
            .compile_command(&root.join("src/main.c"), &root.join("obj/main.o"))
            .into_argv();
        assert!(argv.windows(2).any(|w| w == ["-include", "pch.h"]));
        let first_include = argv.iter().find(|a| a.starts_with("-I")).unwrap();
        assert_eq!(first_include, "-I.");
        assert_ne!(consumer.identifier(), cc.identifier());
        assert_ne!(consumer.identifier(), split.generation.identifier());
        assert_ne!(consumer.include_path_identifier(), cc.include_path_identifier());
        assert_eq!(
            split.generation.include_path_identifier(),
            cc.include_path_identifier()
        );
    }

    #[test]
    fn test_precompile_errors() {
        let f = Fixture::new();
        let root = f.root();
        fs::write(root.join("src/empty.c"), "int x;\n").unwrap();
        let cc = create(&def("gcc"), &f.ctx());
        let err = cc
            .precompile(&root.join("src/empty.c"), &[], &root.join("obj"))
            .unwrap_err();
        assert!(matches!(err, BuildError::PrecompileNoBoundary { .. }));

        let asm = create(&def("as"), &f.ctx());
        let split = asm
            .precompile(&root.join("src/empty.c"), &[], &root.join("obj"))
            .unwrap();
        assert!(split.is_none());
    }
}
