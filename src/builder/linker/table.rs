//! The linker variant decision table.
//!
//! Which concrete tool invocation a link uses depends on the linker family,
//! what is being produced, the OS, the compiler driver flavour and whether
//! the driver runs through `xcrun`. The combinations live in [`ROWS`] as
//! data; [`lookup`] returns the first matching row.

use std::fmt;
use std::str::FromStr;

use crate::builder::command::ResponseSwitch;
use crate::builder::processor::Extensions;
use crate::core::link_type::LinkType;
use crate::core::platform::Platform;
use crate::util::errors::{BuildError, BuildResult};

/// Linker family named by a linker definition's `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// gcc or clang driving a C link
    Gcc,
    /// gcc or clang driving a C++ link
    Gpp,
    /// GNU ld invoked directly
    Ld,
    /// The `ar` archiver
    Ar,
    /// A cross gcc driving a C++ link
    CrossGpp,
    /// A cross GNU ld
    CrossLd,
    /// z/OS `cxx`
    Os390,
    /// z/OS `cxx` writing into a dataset
    Os390Dataset,
    /// The c89 `ld`
    C89,
}

impl Family {
    pub const ALL: [Family; 9] = [
        Family::Gcc,
        Family::Gpp,
        Family::Ld,
        Family::Ar,
        Family::CrossGpp,
        Family::CrossLd,
        Family::Os390,
        Family::Os390Dataset,
        Family::C89,
    ];

    /// Parse a linker `kind`, which may also imply a driver flavour.
    pub fn parse_kind(kind: &str) -> Option<(Family, Option<Driver>)> {
        let parsed = match kind.to_lowercase().as_str() {
            "clang" => (Family::Gcc, Some(Driver::Clang)),
            "clang++" => (Family::Gpp, Some(Driver::Clang)),
            other => (other.parse().ok()?, None),
        };
        Some(parsed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Gcc => "gcc",
            Family::Gpp => "g++",
            Family::Ld => "ld",
            Family::Ar => "ar",
            Family::CrossGpp => "cross-g++",
            Family::CrossLd => "cross-ld",
            Family::Os390 => "os390",
            Family::Os390Dataset => "os390-dataset",
            Family::C89 => "c89",
        }
    }

    /// Argument that makes the tool print its version.
    pub fn identifier_arg(&self) -> &'static str {
        match self {
            Family::Gcc | Family::Gpp | Family::CrossGpp => "-dumpversion",
            Family::Ld | Family::CrossLd => "-version",
            Family::Ar => "-V",
            Family::Os390 | Family::Os390Dataset | Family::C89 => "/bogus",
        }
    }

    /// Input extensions the linker takes and the ones it ignores.
    pub fn extensions(&self) -> Extensions {
        const OBJ_FILES: &[&str] = &[".o", ".a", ".lib", ".dll", ".so", ".sl"];
        match self {
            Family::Gcc | Family::Gpp | Family::Ld | Family::CrossGpp | Family::CrossLd => {
                Extensions::new(OBJ_FILES, &[])
            }
            Family::Ar => Extensions::new(&[".o"], &[]),
            Family::Os390 => Extensions::new(&[".o", ".a", ".lib", ".x"], &[".dll"]),
            Family::Os390Dataset => {
                Extensions::new(&[".o", ".a", ".lib", ".xds"], &[".dll", ".x"])
            }
            Family::C89 => Extensions::new(&[".o", ".a", ".lib", ".x"], &[]),
        }
    }

    pub fn style(&self) -> FlagStyle {
        match self {
            Family::Gcc | Family::Gpp | Family::Ld | Family::CrossGpp | Family::CrossLd => {
                FlagStyle::GnuLd
            }
            Family::Ar => FlagStyle::Archive,
            Family::Os390 | Family::Os390Dataset => FlagStyle::Os390,
            Family::C89 => FlagStyle::C89,
        }
    }

    pub fn decoration(&self) -> Decoration {
        match self {
            Family::Gcc => Decoration::Gcc,
            Family::Gpp => Decoration::Gpp,
            Family::CrossGpp => Decoration::CrossGpp,
            _ => Decoration::None,
        }
    }

    pub fn response_switch(&self) -> ResponseSwitch {
        match self {
            Family::Gcc | Family::Gpp | Family::Os390 | Family::Os390Dataset | Family::C89 => {
                ResponseSwitch::At
            }
            Family::Ld | Family::CrossLd | Family::CrossGpp | Family::Ar => {
                ResponseSwitch::Unsupported
            }
        }
    }

    /// Whether the C++ runtime is appended to the link.
    pub fn cxx_runtime(&self) -> bool {
        matches!(self, Family::Gpp | Family::CrossGpp)
    }

    /// Whether a `target` parameter prefixes the command.
    pub fn is_cross(&self) -> bool {
        matches!(self, Family::CrossGpp | Family::CrossLd)
    }

    /// Whether MinGW drivers get subsystem flags.
    pub fn knows_mingw(&self) -> bool {
        matches!(self, Family::Gcc | Family::Gpp | Family::CrossGpp)
    }

    /// Whether library sets are spelled as flags rather than passed as files.
    pub fn spells_library_sets(&self) -> bool {
        !matches!(self, Family::Ar)
    }

    /// Driver asked for its library search path, if the family asks one.
    pub fn search_path_driver(&self) -> Option<&'static str> {
        match self {
            Family::Gcc => Some("gcc"),
            Family::Gpp | Family::CrossGpp => Some("g++"),
            _ => None,
        }
    }

    /// Maximum command length before falling back to a response file.
    pub fn max_command_length(&self, platform: &Platform) -> usize {
        match self {
            Family::Gcc | Family::Gpp if platform.is_windows() => 32000,
            _ => usize::MAX,
        }
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" => Ok(Family::Gcc),
            "g++" | "gpp" => Ok(Family::Gpp),
            "ld" => Ok(Family::Ld),
            "ar" => Ok(Family::Ar),
            "cross-g++" | "cross-gpp" => Ok(Family::CrossGpp),
            "cross-ld" => Ok(Family::CrossLd),
            "os390" => Ok(Family::Os390),
            "os390-dataset" => Ok(Family::Os390Dataset),
            "c89" => Ok(Family::C89),
            _ => Err(format!("unknown linker family: {}", s)),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a link type selects a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Static library built with the archiver
    Archive,
    /// Static library built with the high-level tool
    StaticLibrary,
    Plugin,
    Shared,
    Executable,
}

impl LinkKind {
    pub const ALL: [LinkKind; 5] = [
        LinkKind::Archive,
        LinkKind::StaticLibrary,
        LinkKind::Plugin,
        LinkKind::Shared,
        LinkKind::Executable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Archive => "archive",
            LinkKind::StaticLibrary => "static",
            LinkKind::Plugin => "plugin",
            LinkKind::Shared => "shared",
            LinkKind::Executable => "executable",
        }
    }
}

impl From<&LinkType> for LinkKind {
    fn from(link_type: &LinkType) -> Self {
        if link_type.is_static_library() {
            if link_type.use_high_level_tool() {
                LinkKind::StaticLibrary
            } else {
                LinkKind::Archive
            }
        } else if link_type.is_plugin_module() {
            LinkKind::Plugin
        } else if link_type.is_shared_library() {
            LinkKind::Shared
        } else {
            LinkKind::Executable
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only OS distinction the table makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsClass {
    Darwin,
    Other,
}

impl OsClass {
    pub const ALL: [OsClass; 2] = [OsClass::Darwin, OsClass::Other];

    pub fn of(platform: &Platform) -> Self {
        if platform.is_darwin() {
            OsClass::Darwin
        } else {
            OsClass::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsClass::Darwin => "darwin",
            OsClass::Other => "other",
        }
    }
}

impl fmt::Display for OsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiler driver flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Driver {
    #[default]
    Gcc,
    Clang,
}

impl Driver {
    pub const ALL: [Driver; 2] = [Driver::Gcc, Driver::Clang];

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Gcc => "gcc",
            Driver::Clang => "clang",
        }
    }
}

impl FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" => Ok(Driver::Gcc),
            "clang" => Ok(Driver::Clang),
            _ => Err(format!("unknown driver: {}", s)),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the driver is run directly or through `xcrun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wrapper {
    #[default]
    Native,
    Xcode,
}

impl Wrapper {
    pub const ALL: [Wrapper; 2] = [Wrapper::Native, Wrapper::Xcode];

    pub fn as_str(&self) -> &'static str {
        match self {
            Wrapper::Native => "native",
            Wrapper::Xcode => "xcode",
        }
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which flag spellings a variant uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    /// `-g`, `-shared`, `-L`, `-Bstatic`, `--image-base`, ...
    GnuLd,
    /// No flags at all
    Archive,
    /// `-W l,DLL` and dataset libraries
    Os390,
    /// `-G` and absolute `-L`
    C89,
}

/// How generic linker arguments are forwarded through a compiler driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    /// Passed verbatim
    None,
    Gcc,
    Gpp,
    CrossGpp,
}

/// A concrete linker invocation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkerVariant {
    /// Family whose flag spelling applies
    pub family: Family,
    pub command: &'static str,
    pub output_prefix: &'static str,
    pub output_suffix: &'static str,
    /// Whether a `libtool`-prefixed flavour exists
    pub libtool: bool,
    /// Whether the command runs through `xcrun`
    pub xcrun: bool,
}

impl LinkerVariant {
    /// Output file name for a base name.
    pub fn output_file_name(&self, base: &str) -> String {
        format!("{}{}{}", self.output_prefix, base, self.output_suffix)
    }
}

/// Row shape: which family the row's tool belongs to, `None` meaning the
/// family that was looked up.
#[derive(Debug, Clone, Copy)]
struct Shape {
    family: Option<Family>,
    command: &'static str,
    output_prefix: &'static str,
    output_suffix: &'static str,
    libtool: bool,
    xcrun: bool,
}

const fn shape(command: &'static str, prefix: &'static str, suffix: &'static str) -> Shape {
    Shape {
        family: None,
        command,
        output_prefix: prefix,
        output_suffix: suffix,
        libtool: false,
        xcrun: false,
    }
}

const fn with_libtool(mut s: Shape) -> Shape {
    s.libtool = true;
    s
}

const fn with_xcrun(mut s: Shape) -> Shape {
    s.xcrun = true;
    s
}

const AR: Shape = Shape {
    family: Some(Family::Ar),
    ..shape("ar", "lib", ".a")
};

/// One row; empty slices and `None` match anything.
struct Row {
    families: &'static [Family],
    kinds: &'static [LinkKind],
    os: Option<OsClass>,
    driver: Option<Driver>,
    wrapper: Option<Wrapper>,
    shape: Shape,
}

impl Row {
    fn matches(&self, key: &VariantKey) -> bool {
        (self.families.is_empty() || self.families.contains(&key.family))
            && (self.kinds.is_empty() || self.kinds.contains(&key.kind))
            && self.os.map_or(true, |os| os == key.os)
            && self.driver.map_or(true, |d| d == key.driver)
            && self.wrapper.map_or(true, |w| w == key.wrapper)
    }
}

const GNU: &[Family] = &[Family::Gcc, Family::Gpp];
const LD: &[Family] = &[Family::Ld, Family::CrossLd];
const ARCHIVING: &[Family] = &[
    Family::Gcc,
    Family::Gpp,
    Family::Ld,
    Family::CrossLd,
    Family::CrossGpp,
    Family::Ar,
];

use self::Driver::{Clang, Gcc};
use self::LinkKind::{Archive, Executable, Plugin, Shared, StaticLibrary};
use self::OsClass::{Darwin, Other};
use self::Wrapper::{Native, Xcode};

macro_rules! row {
    ($families:expr, [$($kind:expr),*], $os:expr, $driver:expr, $wrapper:expr => $shape:expr) => {
        Row {
            families: $families,
            kinds: &[$($kind),*],
            os: $os,
            driver: $driver,
            wrapper: $wrapper,
            shape: $shape,
        }
    };
}

#[rustfmt::skip]
static ROWS: &[Row] = &[
    // the archiver, for every family that has one
    row!(ARCHIVING, [Archive], None, None, None => AR),
    row!(&[Family::Ar], [], None, None, None => AR),

    // gcc / g++ drivers
    row!(GNU, [StaticLibrary], Some(Darwin), Some(Gcc), None => shape("gcc", "lib", ".a")),
    row!(GNU, [StaticLibrary], Some(Darwin), Some(Clang), Some(Xcode) => with_xcrun(shape("clang", "lib", ".a"))),
    row!(GNU, [StaticLibrary], Some(Darwin), Some(Clang), Some(Native) => shape("clang", "lib", ".a")),
    row!(GNU, [StaticLibrary], Some(Other), Some(Gcc), None => with_libtool(shape("gcc", "lib", ".a"))),
    row!(GNU, [StaticLibrary], Some(Other), Some(Clang), None => with_libtool(shape("clang", "lib", ".a"))),
    row!(GNU, [Plugin], Some(Darwin), Some(Gcc), None => shape("gcc", "lib", ".bundle")),
    row!(GNU, [Plugin], Some(Darwin), Some(Clang), Some(Xcode) => with_xcrun(shape("clang", "lib", ".bundle"))),
    row!(GNU, [Plugin], Some(Darwin), Some(Clang), Some(Native) => shape("clang", "lib", ".bundle")),
    row!(GNU, [Shared], Some(Darwin), Some(Gcc), None => shape("gcc", "lib", ".dylib")),
    row!(GNU, [Shared], Some(Darwin), Some(Clang), Some(Xcode) => with_xcrun(shape("clang", "lib", ".dylib"))),
    row!(GNU, [Shared], Some(Darwin), Some(Clang), Some(Native) => shape("clang", "lib", ".dylib")),
    row!(GNU, [Plugin, Shared], Some(Other), Some(Gcc), None => with_libtool(shape("gcc", "lib", ".so"))),
    row!(GNU, [Plugin, Shared], Some(Other), Some(Clang), None => with_libtool(shape("clang", "lib", ".so"))),
    row!(GNU, [Executable], None, Some(Gcc), None => shape("gcc", "", "")),
    row!(GNU, [Executable], None, Some(Clang), Some(Xcode) => with_xcrun(shape("clang", "", ""))),
    row!(GNU, [Executable], None, Some(Clang), Some(Native) => shape("clang", "", "")),

    // ld, native and cross
    row!(LD, [StaticLibrary], None, None, None => with_libtool(shape("ld", "lib", ".a"))),
    row!(LD, [Plugin, Shared], None, None, None => with_libtool(shape("ld", "lib", ".so"))),
    row!(LD, [Executable], None, None, None => shape("ld", "", "")),

    // cross g++
    row!(&[Family::CrossGpp], [StaticLibrary], Some(Darwin), None, None => shape("gcc", "lib", ".a")),
    row!(&[Family::CrossGpp], [StaticLibrary], Some(Other), None, None => with_libtool(shape("gcc", "lib", ".a"))),
    row!(&[Family::CrossGpp], [Plugin], Some(Darwin), None, None => shape("gcc", "lib", ".bundle")),
    row!(&[Family::CrossGpp], [Shared], Some(Darwin), None, None => shape("gcc", "lib", ".dylib")),
    row!(&[Family::CrossGpp], [Plugin, Shared], Some(Other), None, None => with_libtool(shape("gcc", "lib", ".so"))),
    row!(&[Family::CrossGpp], [Executable], None, None, None => shape("gcc", "", "")),

    // z/OS
    row!(&[Family::Os390Dataset], [], None, None, None => shape("cxx", "", ".xds")),
    row!(&[Family::Os390], [Plugin, Shared], None, None, None => shape("cxx", "", ".dll")),
    row!(&[Family::Os390], [], None, None, None => shape("cxx", "", "")),

    // c89
    row!(&[Family::C89], [Plugin, Shared], None, None, None => shape("ld", "lib", ".so")),
    row!(&[Family::C89], [], None, None, None => shape("ld", "", "")),
];

/// Everything that selects a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub family: Family,
    pub kind: LinkKind,
    pub os: OsClass,
    pub driver: Driver,
    pub wrapper: Wrapper,
}

impl VariantKey {
    /// Every key, in table display order.
    pub fn all() -> impl Iterator<Item = VariantKey> {
        Family::ALL.into_iter().flat_map(|family| {
            LinkKind::ALL.into_iter().flat_map(move |kind| {
                OsClass::ALL.into_iter().flat_map(move |os| {
                    Driver::ALL.into_iter().flat_map(move |driver| {
                        Wrapper::ALL.into_iter().map(move |wrapper| VariantKey {
                            family,
                            kind,
                            os,
                            driver,
                            wrapper,
                        })
                    })
                })
            })
        })
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.family, self.kind, self.os, self.driver, self.wrapper
        )
    }
}

/// Select the variant for `key`. The first matching row wins.
pub fn lookup(key: &VariantKey) -> BuildResult<LinkerVariant> {
    let row = ROWS
        .iter()
        .find(|row| row.matches(key))
        .ok_or_else(|| BuildError::InvalidValue {
            what: "linker variant",
            value: key.to_string(),
        })?;

    let s = row.shape;
    Ok(LinkerVariant {
        family: s.family.unwrap_or(key.family),
        command: s.command,
        output_prefix: s.output_prefix,
        output_suffix: s.output_suffix,
        libtool: s.libtool,
        xcrun: s.xcrun,
    })
}
