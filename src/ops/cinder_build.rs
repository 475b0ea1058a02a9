//! Implementation of `cinder build`, `cinder classify` and `cinder deps`.
//!
//! A [`BuildSession`] turns a loaded manifest into compiler and linker
//! configurations once, then answers classification, dependency and build
//! requests against them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::builder::matcher;
use crate::builder::{
    Classification, CommandRunner, CompilerConfiguration, CompilerContext, DependencyTable,
    LinkInput, LinkerConfiguration, LinkerContext, PrecompileSplit, Processor, ToolchainCache,
    BID_NONE,
};
use crate::core::definition::Layered;
use crate::core::dependency_info::DependencyInfo;
use crate::core::platform::Platform;
use crate::ops::manifest::Manifest;
use crate::util::config::Config;
use crate::util::errors::{BuildError, BuildResult};
use crate::util::fs::{ensure_dir, modified_millis, normalize_path};

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Print the command lines instead of running them
    pub dry_run: bool,

    /// Number of parallel compile jobs (None = configured value)
    pub jobs: Option<usize>,

    /// Keep compiling after a failure
    pub relentless: bool,

    /// Show a progress bar over compile steps
    pub progress: bool,
}

/// Search paths taken from the process environment.
#[derive(Debug, Clone, Default)]
pub struct ToolEnvironment {
    /// `CPATH`
    pub include_path: Vec<PathBuf>,
    /// `LIBPATH`
    pub library_path: Vec<PathBuf>,
}

impl ToolEnvironment {
    pub fn from_env() -> Self {
        ToolEnvironment {
            include_path: split_env("CPATH"),
            library_path: split_env("LIBPATH"),
        }
    }
}

fn split_env(name: &str) -> Vec<PathBuf> {
    std::env::var_os(name)
        .map(|value| {
            std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// What a build did.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Targets compiled, in build order
    pub compiled: Vec<String>,
    /// Targets that were already fresh
    pub up_to_date: usize,
    /// The linked output, when the link step ran
    pub linked: Option<PathBuf>,
    /// Command lines printed by a dry run
    pub commands: Vec<Vec<String>>,
}

struct CompileJob {
    name: String,
    source: PathBuf,
    output: PathBuf,
    config: Arc<CompilerConfiguration>,
}

/// Configurations for one project, ready to build.
pub struct BuildSession<'a> {
    manifest: Manifest,
    config: Config,
    platform: Platform,
    runner: &'a dyn CommandRunner,
    cache: ToolchainCache,
    compilers: Vec<Arc<CompilerConfiguration>>,
    linker: Option<LinkerConfiguration>,
    precompile: Option<PrecompileSplit>,
}

impl<'a> BuildSession<'a> {
    /// Configure every active compiler and the linker of `manifest`.
    pub fn new(
        manifest: Manifest,
        config: Config,
        env: &ToolEnvironment,
        runner: &'a dyn CommandRunner,
    ) -> Result<Self> {
        let platform = match config.os() {
            Some(os) => Platform::current().with_os(os),
            None => Platform::current(),
        };
        let cache = ToolchainCache::new();
        let base_dir = manifest.root().to_path_buf();

        let compiler_ctx = CompilerContext {
            platform: platform.clone(),
            wrapper: config.wrapper(),
            target: config.toolchain.target.clone(),
            base_dir: base_dir.clone(),
            env_include_path: env.include_path.clone(),
            cache: &cache,
            runner,
        };
        let mut compilers = Vec::new();
        for def in manifest.active_compilers() {
            let layered = Layered::resolve(def, &manifest.compilers)?;
            let compiler = CompilerConfiguration::create(&layered, &compiler_ctx)
                .with_context(|| format!("failed to configure compiler `{}`", def.name))?;
            tracing::debug!("compiler `{}`: {}", compiler.name(), compiler.identifier());
            compilers.push(Arc::new(compiler));
        }

        let linker = match manifest.active_linker()? {
            Some(def) => {
                let linker_ctx = LinkerContext {
                    platform: platform.clone(),
                    link_type: manifest.link_type(),
                    driver: config.driver().unwrap_or_default(),
                    wrapper: config.wrapper(),
                    target: config.toolchain.target.clone(),
                    libtool: manifest.project.libtool,
                    dataset: manifest.project.dataset.clone(),
                    base_dir: base_dir.clone(),
                    output_dir: normalize_path(&manifest.out_dir()),
                    env_library_path: env.library_path.clone(),
                    cache: &cache,
                    runner,
                };
                let layered = Layered::resolve(def, &manifest.linkers)?;
                let linker = LinkerConfiguration::create(&layered, &linker_ctx)
                    .with_context(|| format!("failed to configure linker `{}`", def.name))?;
                tracing::debug!("linker `{}`: {}", linker.name(), linker.identifier());
                Some(linker)
            }
            None => None,
        };

        let precompile = match manifest.precompile() {
            Some((prototype, except)) => {
                let index = best_bidder(&compilers, &prototype).ok_or_else(|| {
                    anyhow!(
                        "no compiler accepts precompiled header prototype {}",
                        prototype.display()
                    )
                })?;
                let split = compilers[index]
                    .precompile(&prototype, &except, &manifest.obj_dir())?
                    .ok_or_else(|| BuildError::PrecompileUnsupported {
                        compiler: compilers[index].name().to_string(),
                    })?;
                compilers.insert(index, Arc::new(split.consumer.clone()));
                Some(split)
            }
            None => None,
        };

        Ok(BuildSession {
            manifest,
            config,
            platform,
            runner,
            cache,
            compilers,
            linker,
            precompile,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Compilers in bidding order.
    pub fn compilers(&self) -> &[Arc<CompilerConfiguration>] {
        &self.compilers
    }

    pub fn linker(&self) -> Option<&LinkerConfiguration> {
        self.linker.as_ref()
    }

    /// Forget memoized toolchain probes.
    pub fn invalidate_toolchain(&self) {
        self.cache.invalidate();
    }

    fn obj_dir(&self) -> PathBuf {
        normalize_path(&self.manifest.obj_dir())
    }

    fn out_dir(&self) -> PathBuf {
        normalize_path(&self.manifest.out_dir())
    }

    fn history_path(&self) -> PathBuf {
        self.obj_dir().join(self.config.history())
    }

    /// Match every project source against the compilers and the linker.
    pub fn classify(&self) -> Result<Classification<CompilerConfiguration>> {
        let files = self.manifest.source_files()?;
        let linker = self.linker.as_ref().map(|l| l as &dyn Processor);
        let classification = matcher::classify(
            &self.compilers,
            linker,
            &self.obj_dir(),
            files.iter().map(PathBuf::as_path),
        )?;
        Ok(classification)
    }

    /// Parse the includes of `file` with the compiler that would build it.
    pub fn dependencies(&self, file: &Path) -> Result<DependencyInfo> {
        let file = normalize_path(file);
        let index = best_bidder(&self.compilers, &file)
            .ok_or_else(|| anyhow!("no compiler accepts {}", file.display()))?;
        if !file.is_file() {
            return Err(anyhow!("{} does not exist", file.display()));
        }
        Ok(self.compilers[index].analyzer().analyze(&file))
    }

    /// Compile every stale target, then link when needed.
    pub fn build(&self, options: &BuildOptions) -> Result<BuildReport> {
        let classification = self.classify()?;
        let history_path = self.history_path();
        let mut table = DependencyTable::load_or_default(&history_path);
        let mut report = BuildReport::default();

        if let Some(split) = &self.precompile {
            let config = Arc::new(split.generation.clone());
            let name = split
                .output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let newest = table.newest_dependency(&config.analyzer(), &split.header);
            let staleness =
                table.decide(&name, &split.output, config.identifier(), config.rebuild(), newest);
            if staleness.is_stale() {
                tracing::debug!("{}: {:?}", name, staleness);
                let job = CompileJob {
                    name,
                    source: split.header.clone(),
                    output: split.output.clone(),
                    config,
                };
                self.compile_jobs(&[job], options, &mut table, &mut report, &history_path)?;
            } else {
                report.up_to_date += 1;
            }
        }

        let mut jobs = Vec::new();
        for (name, target) in &classification.targets {
            let Some(source) = target.first_source() else {
                continue;
            };
            let config = target.config();
            let newest = table.newest_dependency(&config.analyzer(), source);
            let staleness =
                table.decide(name, target.output(), config.identifier(), target.rebuild(), newest);
            if staleness.is_stale() {
                tracing::debug!("{}: {:?}", name, staleness);
                jobs.push(CompileJob {
                    name: name.clone(),
                    source: source.to_path_buf(),
                    output: target.output().to_path_buf(),
                    config: Arc::clone(config),
                });
            } else {
                report.up_to_date += 1;
            }
        }

        if !jobs.is_empty() {
            tracing::info!(
                "Compiling {} of {} target(s)",
                jobs.len(),
                classification.targets.len()
            );
            self.compile_jobs(&jobs, options, &mut table, &mut report, &history_path)?;
        }

        if let Some(linker) = &self.linker {
            self.link(linker, &classification, options, &mut table, &mut report)?;
        }

        if !options.dry_run {
            table.save(&history_path)?;
        }

        Ok(report)
    }

    fn compile_jobs(
        &self,
        jobs: &[CompileJob],
        options: &BuildOptions,
        table: &mut DependencyTable,
        report: &mut BuildReport,
        history_path: &Path,
    ) -> Result<()> {
        if options.dry_run {
            for job in jobs {
                let cmd = job.config.compile_command(&job.source, &job.output);
                report.commands.push(cmd.into_argv());
            }
            return Ok(());
        }

        ensure_dir(&self.obj_dir())?;
        for job in jobs {
            if let Some(parent) = job.output.parent() {
                ensure_dir(parent)?;
            }
        }
        let results = self.run_compiles(jobs, options)?;

        let mut failures = Vec::new();
        for (job, result) in jobs.iter().zip(results) {
            match result {
                Ok(()) => {
                    table.record_history(job.name.as_str(), job.config.identifier());
                    report.compiled.push(job.name.clone());
                }
                Err(e) => failures.push((job.name.clone(), e)),
            }
        }

        if failures.is_empty() {
            return Ok(());
        }

        table.save(history_path)?;
        let count = failures.len();
        for (name, err) in failures.iter().skip(1) {
            tracing::error!("failed to compile {}: {}", name, err);
        }
        let (name, err) = failures.swap_remove(0);
        let message = if count == 1 {
            format!("failed to compile {}", name)
        } else {
            format!("failed to compile {} and {} other target(s)", name, count - 1)
        };
        Err(anyhow::Error::new(err).context(message))
    }

    /// Run compile jobs, in parallel when more than one job is allowed.
    ///
    /// Serial runs stop at the first failure unless relentless; parallel
    /// runs always attempt every job.
    fn run_compiles(&self, jobs: &[CompileJob], options: &BuildOptions) -> Result<Vec<BuildResult<()>>> {
        let progress = progress_bar(jobs.len(), options.progress);
        let compile = |job: &CompileJob| {
            progress.set_message(job.name.clone());
            let result = job.config.compile(self.runner, &job.source, &job.output);
            progress.inc(1);
            result
        };

        let parallel = options.jobs.unwrap_or_else(|| self.config.jobs()).max(1);
        let relentless = options.relentless || self.config.build.relentless;

        let results = if parallel > 1 && jobs.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(parallel)
                .build()
                .context("failed to start compile workers")?;
            pool.install(|| jobs.par_iter().map(compile).collect())
        } else {
            let mut results = Vec::with_capacity(jobs.len());
            for job in jobs {
                let result = compile(job);
                let failed = result.is_err();
                results.push(result);
                if failed && !relentless {
                    break;
                }
            }
            results
        };

        progress.finish_and_clear();
        Ok(results)
    }

    fn link(
        &self,
        linker: &LinkerConfiguration,
        classification: &Classification<CompilerConfiguration>,
        options: &BuildOptions,
        table: &mut DependencyTable,
        report: &mut BuildReport,
    ) -> Result<()> {
        let out_dir = self.out_dir();
        let name = linker.output_file_name(self.manifest.output_base());
        let output = out_dir.join(&name);

        let mut inputs: Vec<LinkInput> = classification
            .targets
            .values()
            .map(|t| LinkInput::visited(t.output()))
            .collect();
        inputs.extend(classification.objects.iter().map(LinkInput::visited));
        inputs.extend(linker.libraries().iter().map(LinkInput::library));

        if inputs.is_empty() {
            tracing::warn!("nothing to link for {}", name);
            return Ok(());
        }

        let newest = inputs
            .iter()
            .map(|i| modified_millis(&i.path).unwrap_or(i64::MAX))
            .max()
            .unwrap_or(i64::MIN);
        let staleness = table.decide(&name, &output, linker.identifier(), linker.rebuild(), newest);
        if !staleness.is_stale() {
            tracing::info!("{} is up to date", name);
            return Ok(());
        }
        tracing::debug!("{}: {:?}", name, staleness);

        if options.dry_run {
            report
                .commands
                .push(linker.link_command(&output, &inputs).into_argv());
            return Ok(());
        }

        tracing::info!("Linking {}", name);
        ensure_dir(&out_dir)?;
        linker
            .link(self.runner, &output, &inputs)
            .with_context(|| format!("failed to link {}", name))?;
        table.record_history(name.as_str(), linker.identifier());
        report.linked = Some(output);
        Ok(())
    }
}

/// Index of the highest-bidding compiler, the first one winning ties.
fn best_bidder(compilers: &[Arc<CompilerConfiguration>], file: &Path) -> Option<usize> {
    let filename = file.to_string_lossy();
    let mut best = None;
    let mut best_bid = BID_NONE;
    for (index, compiler) in compilers.iter().enumerate() {
        let bid = compiler.bid(&filename);
        if bid > best_bid {
            best_bid = bid;
            best = Some(index);
        }
    }
    best
}

fn progress_bar(total: usize, enabled: bool) -> ProgressBar {
    if !enabled || total < 2 {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::manifest::MANIFEST_NAME;
    use crate::test_support::{manifests, ProjectFixture, RecordingRunner};
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn linux_config() -> Config {
        let mut config = Config::default();
        config.toolchain.os = Some("linux".to_string());
        config
    }

    fn session<'r>(root: &Path, runner: &'r RecordingRunner) -> BuildSession<'r> {
        let manifest = Manifest::load(&root.join(MANIFEST_NAME)).unwrap();
        BuildSession::new(manifest, linux_config(), &ToolEnvironment::default(), runner).unwrap()
    }

    fn compile_calls(runner: &RecordingRunner) -> usize {
        runner
            .calls()
            .iter()
            .filter(|argv| argv.iter().any(|a| a == "-c"))
            .count()
    }

    fn touch_future(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = fs::File::create(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    #[test]
    fn test_classify_project() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();
        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let session = session(&root, &runner);

        let classification = session.classify().unwrap();
        let names: Vec<_> = classification.targets.keys().cloned().collect();
        assert_eq!(names, vec!["main.o", "util.o"]);
        assert!(classification.objects.is_empty());
        assert!(classification.targets["main.o"]
            .output()
            .ends_with("build/obj/main.o"));
    }

    #[test]
    fn test_dry_run_prints_commands_only() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();
        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let session = session(&root, &runner);

        let options = BuildOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = session.build(&options).unwrap();

        assert_eq!(report.commands.len(), 3);
        assert_eq!(&report.commands[0][..2], &["gcc", "-c"]);
        assert!(report.commands[0].iter().any(|a| a == "main.o"));
        assert!(report.commands[2].iter().any(|a| a == "app"));
        assert!(report.compiled.is_empty());
        assert_eq!(compile_calls(&runner), 0);
        assert!(!root.join("build").exists());
    }

    #[test]
    fn test_second_build_is_fresh() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();

        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let report = session(&root, &runner)
            .build(&BuildOptions::default())
            .unwrap();
        assert_eq!(report.compiled, vec!["main.o", "util.o"]);
        assert!(report.linked.is_some());
        assert_eq!(compile_calls(&runner), 2);
        assert!(root.join("build/obj/dependencies.json").exists());

        // The recording runner writes nothing, so stand in for the tools.
        for output in ["build/obj/main.o", "build/obj/util.o", "build/app"] {
            touch_future(&root.join(output));
        }

        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let report = session(&root, &runner)
            .build(&BuildOptions::default())
            .unwrap();
        assert!(report.compiled.is_empty());
        assert_eq!(report.up_to_date, 2);
        assert!(report.linked.is_none());
        assert_eq!(compile_calls(&runner), 0);
    }

    #[test]
    fn test_changed_configuration_rebuilds() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();

        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        session(&root, &runner).build(&BuildOptions::default()).unwrap();
        for output in ["build/obj/main.o", "build/obj/util.o", "build/app"] {
            touch_future(&root.join(output));
        }

        let runner = RecordingRunner::new().with_stdout(&["13.1.0"]);
        let report = session(&root, &runner)
            .build(&BuildOptions::default())
            .unwrap();
        assert_eq!(report.compiled.len(), 2);
        assert!(report.linked.is_some());
    }

    #[test]
    fn test_failed_compile_stops_unless_relentless() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();

        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]).with_exit_code(1);
        let err = session(&root, &runner)
            .build(&BuildOptions::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to compile main.o"));
        assert_eq!(compile_calls(&runner), 1);

        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]).with_exit_code(1);
        let options = BuildOptions {
            relentless: true,
            ..Default::default()
        };
        let err = session(&root, &runner).build(&options).unwrap_err();
        assert!(format!("{:#}", err).contains("and 1 other target(s)"));
        assert_eq!(compile_calls(&runner), 2);
    }

    #[test]
    fn test_parallel_build_compiles_everything() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();
        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let options = BuildOptions {
            jobs: Some(4),
            ..Default::default()
        };
        let report = session(&root, &runner).build(&options).unwrap();
        assert_eq!(report.compiled.len(), 2);
        assert_eq!(compile_calls(&runner), 2);
    }

    #[test]
    fn test_precompiled_header_build_order() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifests::c_project("app", "executable").replace(
            "[[compiler]]",
            "[project.precompile]\nprototype = \"src/pch.c\"\nexcept = [\"src/util.c\"]\n\n[[compiler]]",
        );
        let root = ProjectFixture::c_executable("app")
            .with_manifest(manifest)
            .with_file("src/pch.c", "#include \"util.h\"\n")
            .write_to(tmp.path())
            .unwrap();
        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let session = session(&root, &runner);

        let options = BuildOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = session.build(&options).unwrap();

        // gch, main.o, pch.o, util.o, link
        assert_eq!(report.commands.len(), 5);
        let generation = &report.commands[0];
        assert!(generation.windows(2).any(|w| w == ["-x", "c-header"]));
        assert!(generation.iter().any(|a| a == "util.h.gch"));

        let uses_pch = |argv: &Vec<String>| argv.windows(2).any(|w| w == ["-include", "util.h"]);
        assert!(uses_pch(&report.commands[1]));
        assert!(uses_pch(&report.commands[2]));
        assert!(!uses_pch(&report.commands[3]));
    }

    #[test]
    fn test_precompiled_header_in_subdirectory() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifests::c_project("app", "executable").replace(
            "[[compiler]]",
            "[project.precompile]\nprototype = \"src/pch.c\"\n\n[[compiler]]",
        );
        let root = ProjectFixture::c_executable("app")
            .with_manifest(manifest)
            .with_file("include/pch/all.h", "#include \"../util.h\"\n")
            .with_file("src/pch.c", "#include \"pch/all.h\"\n")
            .write_to(tmp.path())
            .unwrap();
        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let report = session(&root, &runner)
            .build(&BuildOptions::default())
            .unwrap();

        assert!(root.join("build/obj/pch").is_dir());
        assert_eq!(report.compiled[0], "all.h.gch");
        let generation = runner
            .calls()
            .into_iter()
            .find(|argv| argv.iter().any(|a| a == "c-header"))
            .unwrap();
        assert!(generation.iter().any(|a| a == "all.h.gch"));
    }

    #[test]
    fn test_precompile_on_assembler_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let manifest = manifests::c_project("app", "executable")
            .replace("kind = \"gcc\"\nincludepath", "kind = \"as\"\nincludepath")
            .replace(
                "[[compiler]]",
                "[project.precompile]\nprototype = \"src/start.s\"\n\n[[compiler]]",
            );
        let root = ProjectFixture::c_executable("app")
            .with_manifest(manifest)
            .with_file("src/start.s", ".include \"defs.inc\"\n")
            .write_to(tmp.path())
            .unwrap();
        let runner = RecordingRunner::new().with_stdout(&["2.40"]);
        let manifest = Manifest::load(&root.join(MANIFEST_NAME)).unwrap();
        let err = BuildSession::new(manifest, linux_config(), &ToolEnvironment::default(), &runner)
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("does not support precompiled headers"));
    }

    #[test]
    fn test_dependencies_of_source() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::c_executable("app").write_to(tmp.path()).unwrap();
        let runner = RecordingRunner::new().with_stdout(&["12.2.0"]);
        let session = session(&root, &runner);

        let info = session.dependencies(&root.join("src/main.c")).unwrap();
        assert_eq!(info.source(), "src/main.c");
        assert_eq!(info.includes(), &["include/util.h"]);

        assert!(session.dependencies(&root.join("notes.txt")).is_err());
        assert!(session.dependencies(&root.join("src/missing.c")).is_err());
    }
}
