//! Target matching: routing visited files to compilers or the linker.
//!
//! Every compiler bids on each file and the highest bid wins, the first
//! compiler seen winning ties. A file no compiler wants is offered to the
//! linker, which either passes it through as an object or drops it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::processor::{Compiler, Processor, BID_DISCARD, BID_NONE};
use crate::core::target_info::TargetInfo;
use crate::util::errors::{BuildError, BuildResult};

/// Result of matching a set of files.
#[derive(Debug)]
pub struct Classification<C> {
    /// Compile targets by output file name
    pub targets: BTreeMap<String, TargetInfo<C>>,
    /// Files passed straight to the link step, in visit order
    pub objects: Vec<PathBuf>,
    /// Files nobody wanted
    pub dropped: Vec<PathBuf>,
}

impl<C> Default for Classification<C> {
    fn default() -> Self {
        Classification {
            targets: BTreeMap::new(),
            objects: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

/// Assigns files to compilers, collecting compile targets and link objects.
pub struct TargetMatcher<'a, C> {
    compilers: &'a [Arc<C>],
    linker: Option<&'a dyn Processor>,
    output_dir: PathBuf,
    result: Classification<C>,
}

impl<'a, C: Compiler> TargetMatcher<'a, C> {
    /// Match against `compilers` in order, writing outputs to `output_dir`.
    pub fn new(compilers: &'a [Arc<C>], linker: Option<&'a dyn Processor>, output_dir: &Path) -> Self {
        TargetMatcher {
            compilers,
            linker,
            output_dir: output_dir.to_path_buf(),
            result: Classification::default(),
        }
    }

    /// Route one file.
    pub fn visit(&mut self, file: &Path) -> BuildResult<()> {
        let filename = file.to_string_lossy();

        let mut best_bid = BID_NONE;
        let mut best: Option<&Arc<C>> = None;
        for compiler in self.compilers {
            let bid = compiler.bid(&filename);
            if bid > best_bid {
                best_bid = bid;
                best = Some(compiler);
            }
        }

        let Some(compiler) = best else {
            self.forward_to_linker(file, &filename);
            return Ok(());
        };

        for name in compiler.output_file_names(&filename) {
            match self.result.targets.get(&name) {
                Some(existing) => {
                    let first = existing.first_source().unwrap_or(Path::new(""));
                    if first != file {
                        return Err(BuildError::OutputCollision {
                            output: name,
                            first: first.to_path_buf(),
                            second: file.to_path_buf(),
                        });
                    }
                }
                None => {
                    let target = TargetInfo::new(
                        name.clone(),
                        vec![file.to_path_buf()],
                        self.output_dir.join(&name),
                        Arc::clone(compiler),
                        compiler.rebuild(),
                    );
                    self.result.targets.insert(name, target);
                }
            }
        }

        Ok(())
    }

    /// Route every file in order, stopping at the first collision.
    pub fn visit_all<'p>(&mut self, files: impl IntoIterator<Item = &'p Path>) -> BuildResult<()> {
        for file in files {
            self.visit(file)?;
        }
        Ok(())
    }

    fn forward_to_linker(&mut self, file: &Path, filename: &str) {
        let bid = self.linker.map_or(BID_NONE, |l| l.bid(filename));
        if bid == BID_NONE {
            tracing::trace!("ignoring {}", file.display());
            self.result.dropped.push(file.to_path_buf());
            return;
        }
        if bid == BID_DISCARD {
            tracing::warn!(
                "Unrecognized file type {} will be passed to linker",
                file.display()
            );
        }
        if !self.result.objects.iter().any(|o| o == file) {
            self.result.objects.push(file.to_path_buf());
        }
    }

    pub fn finish(self) -> Classification<C> {
        self.result
    }
}

/// Match `files` against `compilers` and `linker` in one pass.
pub fn classify<'p, C: Compiler>(
    compilers: &[Arc<C>],
    linker: Option<&dyn Processor>,
    output_dir: &Path,
    files: impl IntoIterator<Item = &'p Path>,
) -> BuildResult<Classification<C>> {
    let mut matcher = TargetMatcher::new(compilers, linker, output_dir);
    matcher.visit_all(files)?;
    Ok(matcher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::processor::{base_output_name, Extensions};

    /// A compiler that only knows its extension table.
    #[derive(Debug)]
    struct FakeCompiler {
        name: &'static str,
        extensions: Extensions,
        rebuild: bool,
    }

    impl FakeCompiler {
        fn new(name: &'static str, sources: &'static [&'static str]) -> Arc<Self> {
            Arc::new(FakeCompiler {
                name,
                extensions: Extensions::new(sources, &[".h"]),
                rebuild: false,
            })
        }
    }

    impl Processor for FakeCompiler {
        fn bid(&self, filename: &str) -> u32 {
            self.extensions.bid(filename)
        }
    }

    impl Compiler for FakeCompiler {
        fn output_file_names(&self, input: &str) -> Vec<String> {
            if self.bid(input) > 1 {
                vec![format!("{}.o", base_output_name(input))]
            } else {
                Vec::new()
            }
        }

        fn rebuild(&self) -> bool {
            self.rebuild
        }
    }

    struct FakeLinker;

    impl Processor for FakeLinker {
        fn bid(&self, filename: &str) -> u32 {
            Extensions::new(&[".o", ".a"], &[".txt"]).linker_bid(filename)
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_compile_and_forward() {
        let compilers = vec![FakeCompiler::new("cc", &[".c"])];
        let files = paths(&["a.c", "b.o"]);
        let result = classify(
            &compilers,
            Some(&FakeLinker),
            Path::new("obj"),
            files.iter().map(PathBuf::as_path),
        )
        .unwrap();

        assert_eq!(result.targets.len(), 1);
        let target = &result.targets["a.o"];
        assert_eq!(target.sources(), &[PathBuf::from("a.c")]);
        assert_eq!(target.output(), Path::new("obj/a.o"));
        assert_eq!(result.objects, paths(&["b.o"]));
        assert!(result.dropped.is_empty());
    }

    #[test]
    fn test_collision_names_both_sources() {
        let compilers = vec![FakeCompiler::new("cc", &[".c"])];
        let files = paths(&["foo/a.c", "bar/a.c"]);
        let err = classify(
            &compilers,
            Some(&FakeLinker),
            Path::new("obj"),
            files.iter().map(PathBuf::as_path),
        )
        .unwrap_err();

        match err {
            BuildError::OutputCollision {
                output,
                first,
                second,
            } => {
                assert_eq!(output, "a.o");
                assert_eq!(first, PathBuf::from("foo/a.c"));
                assert_eq!(second, PathBuf::from("bar/a.c"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_revisit_is_idempotent() {
        let compilers = vec![FakeCompiler::new("cc", &[".c"])];
        let mut matcher = TargetMatcher::new(&compilers, Some(&FakeLinker), Path::new("obj"));
        matcher.visit(Path::new("a.c")).unwrap();
        matcher.visit(Path::new("a.c")).unwrap();
        matcher.visit(Path::new("b.o")).unwrap();
        matcher.visit(Path::new("b.o")).unwrap();
        let result = matcher.finish();
        assert_eq!(result.targets.len(), 1);
        assert_eq!(result.targets["a.o"].sources().len(), 1);
        assert_eq!(result.objects.len(), 1);
    }

    #[test]
    fn test_first_compiler_wins_ties() {
        let compilers = vec![
            FakeCompiler::new("first", &[".c"]),
            FakeCompiler::new("second", &[".c", ".cpp"]),
        ];
        let files = paths(&["a.c", "b.cpp"]);
        let result = classify(
            &compilers,
            Some(&FakeLinker),
            Path::new("obj"),
            files.iter().map(PathBuf::as_path),
        )
        .unwrap();
        assert_eq!(result.targets["a.o"].config().name, "first");
        assert_eq!(result.targets["b.o"].config().name, "second");
    }

    #[test]
    fn test_header_claims_file_without_output() {
        let compilers = vec![FakeCompiler::new("cc", &[".c"])];
        let files = paths(&["util.h"]);
        let result = classify(
            &compilers,
            Some(&FakeLinker),
            Path::new("obj"),
            files.iter().map(PathBuf::as_path),
        )
        .unwrap();
        assert!(result.targets.is_empty());
        assert!(result.objects.is_empty());
        assert!(result.dropped.is_empty());
    }

    #[test]
    fn test_linker_passes_unknown_and_drops_ignored() {
        let compilers = vec![FakeCompiler::new("cc", &[".c"])];
        let files = paths(&["data.bin", "notes.txt", "libz.a"]);
        let result = classify(
            &compilers,
            Some(&FakeLinker),
            Path::new("obj"),
            files.iter().map(PathBuf::as_path),
        )
        .unwrap();
        assert_eq!(result.objects, paths(&["data.bin", "libz.a"]));
        assert_eq!(result.dropped, paths(&["notes.txt"]));

        let result = classify(
            &compilers,
            None,
            Path::new("obj"),
            files.iter().map(PathBuf::as_path),
        )
        .unwrap();
        assert!(result.objects.is_empty());
        assert_eq!(result.dropped.len(), 3);
    }

    #[test]
    fn test_rebuild_flag_carried() {
        let compilers = vec![Arc::new(FakeCompiler {
            name: "cc",
            extensions: Extensions::new(&[".c"], &[]),
            rebuild: true,
        })];
        let files = paths(&["a.c"]);
        let result = classify(
            &compilers,
            None,
            Path::new("obj"),
            files.iter().map(PathBuf::as_path),
        )
        .unwrap();
        assert!(result.targets["a.o"].rebuild());
    }
}
