//! Forwarding linker options through a compiler driver.
//!
//! When gcc or clang drives the link, an option it does not know itself must
//! reach the linker as `-Wl,<option>`. Options the driver forwards on its
//! own are left alone: anything starting with one of the letters in
//! [`DRIVER_LETTERS`] plus a per-family allow-list.

use crate::builder::linker::table::Decoration;
use crate::core::platform::Platform;

/// Second characters of options the driver passes to the linker itself.
pub const DRIVER_LETTERS: &[char] = &['g', 'f', 'F', 'm', 'O', 'W', 'l', 'L', 'u', 'v'];

const GCC_LINKER_OPTIONS: &[&str] = &[
    "-bundle",
    "-dynamiclib",
    "-nostartfiles",
    "-nostdlib",
    "-prebind",
    "-noprebind",
    "-s",
    "-static",
    "-shared",
    "-symbolic",
    "-Xlinker",
    "--export-all-symbols",
    "-static-libgcc",
    "-static-libstdc++",
];

const GPP_LINKER_OPTIONS: &[&str] = &[
    "-bundle",
    "-dylib",
    "-dynamic",
    "-dynamiclib",
    "-nostartfiles",
    "-nostdlib",
    "-prebind",
    "-s",
    "-static",
    "-shared",
    "-symbolic",
    "-Xlinker",
];

const DARWIN_LINKER_OPTIONS: &[&str] = &["-arch", "-weak_framework", "-lazy_framework", "-weak_library"];

/// Rewritten options whose next argument is their value.
const VALUE_OPTIONS: &[&str] = &["--image-base", "--stack", "-e", "-rpath", "-soname", "-Map"];

/// Decorate a single option.
pub fn decorate(decoration: Decoration, platform: &Platform, arg: &str) -> String {
    if forwarded_verbatim(decoration, platform, arg) {
        arg.to_string()
    } else {
        format!("-Wl,{}", arg)
    }
}

/// Decorate an argument list. The value following a rewritten value-taking
/// option is rewritten too, so the driver does not read it as an input file.
pub fn decorate_all(decoration: Decoration, platform: &Platform, args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut value_pending = false;

    for arg in args {
        if value_pending {
            out.push(format!("-Wl,{}", arg));
            value_pending = false;
            continue;
        }

        let decorated = decorate(decoration, platform, arg);
        value_pending = decorated != *arg && VALUE_OPTIONS.contains(&arg.as_str());
        out.push(decorated);
    }

    out
}

fn forwarded_verbatim(decoration: Decoration, platform: &Platform, arg: &str) -> bool {
    let known: &[&str] = match decoration {
        Decoration::None => return true,
        Decoration::Gcc => GCC_LINKER_OPTIONS,
        Decoration::Gpp | Decoration::CrossGpp => GPP_LINKER_OPTIONS,
    };

    let native = decoration != Decoration::CrossGpp;
    if native && (arg.starts_with("--sysroot") || arg.starts_with("-nostdlib")) {
        return true;
    }

    let mut chars = arg.chars();
    if chars.next() != Some('-') {
        return true;
    }
    let Some(letter) = chars.next() else {
        return true;
    };
    if DRIVER_LETTERS.contains(&letter) && (native || letter != 'v') {
        return true;
    }

    known.contains(&arg)
        || (native && platform.is_darwin() && DARWIN_LINKER_OPTIONS.contains(&arg))
}
