//! Operating system and architecture tags.
//!
//! Detection is a pure function of the OS name; nothing here probes the
//! running system beyond reading `std::env::consts`.

use serde::{Deserialize, Serialize};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    FreeBsd,
    Android,
    /// macOS and other Darwin kernels
    #[serde(alias = "macos")]
    Darwin,
    SunOs,
    #[serde(alias = "hp-ux")]
    HpUx,
    Windows,
    OpenKode,
    Ios,
    /// IBM z/OS (OS/390)
    #[serde(alias = "zos")]
    Os390,
}

impl OsFamily {
    /// Classify an OS name such as `Linux`, `Mac OS X` or `Windows 10`.
    ///
    /// Matching is a case-insensitive prefix test. Unknown names yield `None`.
    pub fn from_os_name(name: &str) -> Option<OsFamily> {
        let lower = name.to_lowercase();
        let table: &[(&str, OsFamily)] = &[
            ("linux", OsFamily::Linux),
            ("freebsd", OsFamily::FreeBsd),
            ("android", OsFamily::Android),
            ("mac os x", OsFamily::Darwin),
            ("macos", OsFamily::Darwin),
            ("darwin", OsFamily::Darwin),
            ("sunos", OsFamily::SunOs),
            ("solaris", OsFamily::SunOs),
            ("hp-ux", OsFamily::HpUx),
            ("windows", OsFamily::Windows),
            ("kd", OsFamily::OpenKode),
            ("ios", OsFamily::Ios),
            ("os/390", OsFamily::Os390),
            ("z/os", OsFamily::Os390),
            ("zos", OsFamily::Os390),
        ];
        table
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .map(|(_, os)| *os)
    }

    /// Get the OS family as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::FreeBsd => "freebsd",
            OsFamily::Android => "android",
            OsFamily::Darwin => "darwin",
            OsFamily::SunOs => "sunos",
            OsFamily::HpUx => "hpux",
            OsFamily::Windows => "windows",
            OsFamily::OpenKode => "openkode",
            OsFamily::Ios => "ios",
            OsFamily::Os390 => "os390",
        }
    }
}

impl std::str::FromStr for OsFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hpux" => Ok(OsFamily::HpUx),
            "openkode" => Ok(OsFamily::OpenKode),
            "os390" => Ok(OsFamily::Os390),
            other => OsFamily::from_os_name(other).ok_or_else(|| {
                format!("unknown operating system '{}'", s)
            }),
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The platform a build runs on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system family
    pub os: OsFamily,

    /// Architecture name, e.g. `x86_64`
    pub arch: String,
}

impl Platform {
    /// Create a platform tag.
    pub fn new(os: OsFamily, arch: impl Into<String>) -> Self {
        Platform {
            os,
            arch: arch.into(),
        }
    }

    /// The platform this binary is running on.
    ///
    /// Hosts without a known family are treated as Linux, which selects the
    /// generic GNU spellings.
    pub fn current() -> Self {
        let os = OsFamily::from_os_name(std::env::consts::OS).unwrap_or_else(|| {
            tracing::debug!(
                "unrecognized host OS '{}', assuming linux",
                std::env::consts::OS
            );
            OsFamily::Linux
        });
        Platform::new(os, std::env::consts::ARCH)
    }

    /// Replace the OS family, keeping the architecture.
    pub fn with_os(mut self, os: OsFamily) -> Self {
        self.os = os;
        self
    }

    pub fn is_darwin(&self) -> bool {
        self.os == OsFamily::Darwin
    }

    pub fn is_windows(&self) -> bool {
        self.os == OsFamily::Windows
    }

    pub fn is_hpux(&self) -> bool {
        self.os == OsFamily::HpUx
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
