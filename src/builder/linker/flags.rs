//! Flag spelling per linker family.
//!
//! Each [`FlagStyle`] spells the same link intent differently: GNU-style
//! linkers get `-shared`, `-L`, `-Bstatic`; the archiver gets nothing; z/OS
//! and c89 have their own small vocabularies.

use std::path::{Path, PathBuf};

use crate::builder::linker::table::{Family, FlagStyle};
use crate::core::definition::ArgBuckets;
use crate::core::library_set::{LibrarySet, LibraryType};
use crate::core::link_type::LinkType;
use crate::core::platform::Platform;
use crate::util::fs::relative_path;

/// Link settings resolved from layered definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSettings {
    pub debug: bool,
    pub incremental: bool,
    pub fixed: bool,
    pub map: bool,
    /// Image base address; negative means unset
    pub base: i64,
    /// Stack size; zero or negative means unset
    pub stack: i32,
    pub entry: Option<String>,
}

/// What flag synthesis needs to know about the link.
#[derive(Debug, Clone, Copy)]
pub struct FlagContext<'a> {
    pub platform: &'a Platform,
    pub link_type: &'a LinkType,
    /// Version string the tool reported
    pub identifier: &'a str,
    /// Directory the link runs in; library directories are made relative to it
    pub output_dir: Option<&'a Path>,
    /// Directory relative library set directories are resolved against
    pub base_dir: &'a Path,
}

/// Arguments implied by the link type and settings, in the order the
/// linker expects them: link type, incremental, fixed, map, base, stack,
/// entry.
pub fn implied_args(family: Family, ctx: &FlagContext<'_>, settings: &LinkSettings) -> Vec<String> {
    let mut args = Vec::new();
    let link_type = ctx.link_type;

    match family.style() {
        FlagStyle::GnuLd => {
            if settings.debug {
                args.push("-g".to_string());
            }
            if link_type.is_static_runtime() {
                args.push("-static".to_string());
            }
            if link_type.is_static_library() {
                args.push("-r".to_string());
            } else if link_type.is_plugin_module() {
                let flag = if ctx.platform.is_darwin() { "-bundle" } else { "-shared" };
                args.push(flag.to_string());
            } else if link_type.is_shared_library() {
                let flag = if ctx.platform.is_darwin() { "-dynamic" } else { "-shared" };
                args.push(flag.to_string());
            }

            if family.knows_mingw() && ctx.identifier.contains("mingw") {
                if link_type.is_subsystem_console() {
                    args.push("-mconsole".to_string());
                }
                if link_type.is_subsystem_gui() {
                    args.push("-mwindows".to_string());
                }
            }

            if settings.incremental {
                args.push("-i".to_string());
            }
            if settings.map {
                args.push("-M".to_string());
            }
            if settings.base >= 0 {
                args.push("--image-base".to_string());
                args.push(format!("{:x}", settings.base));
            }
            if settings.stack > 0 {
                args.push("--stack".to_string());
                args.push(settings.stack.to_string());
            }
            if let Some(entry) = &settings.entry {
                args.push("-e".to_string());
                args.push(entry.clone());
            }
        }
        FlagStyle::Archive => {}
        FlagStyle::Os390 => {
            if link_type.is_shared_library() {
                args.push("-W".to_string());
                args.push("l,DLL".to_string());
            }
        }
        FlagStyle::C89 => {
            if link_type.is_shared_library() {
                args.push("-G".to_string());
            }
        }
    }

    args
}

/// Add library set arguments to `buckets`, returning the library names the
/// arguments already name.
pub fn library_set_args(
    family: Family,
    ctx: &FlagContext<'_>,
    libsets: &[LibrarySet],
    buckets: &mut ArgBuckets,
) -> Vec<String> {
    match family.style() {
        FlagStyle::GnuLd => gnu_library_set_args(ctx, libsets, &mut buckets.end),
        FlagStyle::Archive => Vec::new(),
        FlagStyle::Os390 => {
            for set in libsets {
                for lib in &set.libs {
                    if lib.starts_with("//") {
                        buckets.end.push("-l".to_string());
                        buckets.end.push(lib.clone());
                    } else if let Some(ds) = &set.dataset {
                        buckets.end.push(format!("//'{}({})'", ds, lib));
                    }
                }
            }
            Vec::new()
        }
        FlagStyle::C89 => {
            for set in libsets {
                if let Some(dir) = set.dir_in(ctx.base_dir) {
                    buckets.end.push("-L".to_string());
                    buckets.end.push(dir.to_string_lossy().into_owned());
                }
                buckets.end.extend(set.libs.iter().map(|lib| format!("-l{}", lib)));
            }
            Vec::new()
        }
    }
}

fn gnu_library_set_args(
    ctx: &FlagContext<'_>,
    libsets: &[LibrarySet],
    end: &mut Vec<String>,
) -> Vec<String> {
    let darwin = ctx.platform.is_darwin();
    let mut names = Vec::new();
    let mut previous: Option<LibraryType> = None;

    for set in libsets {
        let framework = set.is_framework() && darwin;

        if let Some(dir) = set.dir_in(ctx.base_dir) {
            let rel = match ctx.output_dir {
                Some(out) => relative_path(out, &dir),
                None => dir,
            };
            let switch = if framework { "-F" } else { "-L" };
            end.push(format!("{}{}", switch, rel.to_string_lossy()));
        }

        if set.lib_type != previous {
            if set.lib_type == Some(LibraryType::Static) {
                end.push("-Bstatic".to_string());
                previous = set.lib_type;
            } else if !framework {
                end.push("-Bdynamic".to_string());
                previous = set.lib_type;
            }
        }

        for lib in &set.libs {
            if framework {
                end.push("-framework".to_string());
                end.push(lib.clone());
            } else {
                end.push(format!("-l{}", lib));
            }
            names.push(lib.clone());
        }
    }

    names
}

/// File names a library may have on disk.
pub fn library_patterns(
    family: Family,
    platform: &Platform,
    names: &[String],
    lib_type: Option<LibraryType>,
) -> Vec<String> {
    let with = |prefix: &str, suffix: &str| -> Vec<String> {
        names
            .iter()
            .map(|n| format!("{}{}{}", prefix, n, suffix))
            .collect()
    };

    match family.style() {
        FlagStyle::Archive => Vec::new(),
        FlagStyle::Os390 => [with("lib", ".a"), with("", ".x"), with("", ".o")].concat(),
        FlagStyle::GnuLd | FlagStyle::C89 => {
            let mut patterns = Vec::new();
            if matches!(lib_type, None | Some(LibraryType::Static)) {
                patterns.extend(with("lib", ".a"));
            }
            let framework = lib_type == Some(LibraryType::Framework)
                && platform.is_darwin()
                && family.style() == FlagStyle::GnuLd;
            if framework {
                patterns.extend(names.iter().map(|n| format!("{}.framework/{}", n, n)));
            } else if lib_type != Some(LibraryType::Static) {
                let suffix = if platform.is_hpux() { ".sl" } else { ".so" };
                patterns.extend(with("lib", suffix));
            }
            patterns
        }
    }
}

/// Library files named by `libsets`, looked up in each set's directory and
/// then in `search_path`. Libraries that cannot be found are skipped.
pub fn resolve_libraries(
    family: Family,
    platform: &Platform,
    libsets: &[LibrarySet],
    base_dir: &Path,
    search_path: &[PathBuf],
) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();

    for set in libsets {
        let dirs: Vec<PathBuf> = set
            .dir_in(base_dir)
            .into_iter()
            .chain(search_path.iter().cloned())
            .collect();

        for pattern in library_patterns(family, platform, &set.libs, set.lib_type) {
            let hit = dirs.iter().map(|d| d.join(&pattern)).find(|p| p.is_file());
            match hit {
                Some(path) if !found.contains(&path) => found.push(path),
                Some(_) => {}
                None => tracing::trace!("library {} not found", pattern),
            }
        }
    }

    found
}
