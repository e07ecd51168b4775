//! Toolchain triplets and their resolution.
//!
//! A triplet is a single `<arch>-<os>[-<variant>]` token such as
//! `x64-linux` or `x64-windows-static`. relay only compares triplets for
//! equality; the provider and the build tool interpret them.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::util::errors::RelayError;

static TRIPLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(x86|x64|arm|arm64|arm64ec|wasm32|ppc64le|s390x|riscv32|riscv64|loongarch32|loongarch64|mips64)-(windows|linux|osx|uwp|android|freebsd|openbsd|netbsd|ios|emscripten|mingw|wasi|xbox)(-[a-z0-9]+)*$",
    )
    .expect("triplet pattern is valid")
});

/// A validated toolchain triplet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triplet(String);

impl Triplet {
    /// Parse a triplet, lower-casing it first.
    pub fn parse(value: &str) -> Result<Self, RelayError> {
        let normalized = value.trim().to_ascii_lowercase();
        if TRIPLET_RE.is_match(&normalized) {
            Ok(Triplet(normalized))
        } else {
            Err(RelayError::InvalidTriplet {
                value: value.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The architecture component (`x64` in `x64-linux`).
    pub fn arch(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }

    /// The OS component (`linux` in `x64-linux`).
    pub fn os(&self) -> &str {
        self.0.split('-').nth(1).unwrap_or_default()
    }

    /// Whether binaries built for this triplet carry an `.exe` suffix.
    pub fn is_windows(&self) -> bool {
        matches!(self.os(), "windows" | "uwp" | "mingw" | "xbox")
    }

    /// Directory name used under `build/` (`x64-linux` -> `x64_linux`).
    pub fn dir_name(&self) -> String {
        self.0.replace('-', "_")
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Triplet {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Triplet::parse(s)
    }
}

/// Where a resolved triplet came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripletSource {
    Flag,
    Environment,
    Manifest,
    Host,
    Fallback,
}

impl fmt::Display for TripletSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TripletSource::Flag => "--toolchain",
            TripletSource::Environment => "VCPKG_DEFAULT_TRIPLET",
            TripletSource::Manifest => "Relay.toml",
            TripletSource::Host => "host detection",
            TripletSource::Fallback => "host-family default",
        };
        f.write_str(s)
    }
}

/// Host OS and architecture, as reported by `std::env::consts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub arch: String,
    pub os: String,
}

impl HostInfo {
    /// The host this binary is running on.
    pub fn current() -> Self {
        HostInfo::new(std::env::consts::ARCH, std::env::consts::OS)
    }

    pub fn new(arch: impl Into<String>, os: impl Into<String>) -> Self {
        HostInfo {
            arch: arch.into(),
            os: os.into(),
        }
    }

    /// Map the host onto the nearest known triplet.
    pub fn detect(&self) -> Option<Triplet> {
        let arch = match self.arch.as_str() {
            "x86_64" => "x64",
            "x86" => "x86",
            "aarch64" => "arm64",
            "arm" => "arm",
            _ => return None,
        };
        let os = match self.os.as_str() {
            "linux" => "linux",
            "windows" => "windows",
            "macos" => "osx",
            "freebsd" => "freebsd",
            "openbsd" => "openbsd",
            _ => return None,
        };
        Triplet::parse(&format!("{arch}-{os}")).ok()
    }

    /// Last-resort triplet for the host's OS family.
    pub fn fallback(&self) -> Triplet {
        let token = match self.os.as_str() {
            "windows" => "x64-windows",
            "macos" | "ios" => "x64-osx",
            _ => "x64-linux",
        };
        Triplet(token.to_string())
    }
}

/// A resolved triplet together with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTriplet {
    pub triplet: Triplet,
    pub source: TripletSource,
}

/// Resolves the effective triplet for one invocation.
///
/// Precedence: `--toolchain` flag, `VCPKG_DEFAULT_TRIPLET`, the manifest's
/// `toolchain`, host detection, host-family fallback. A malformed flag is an
/// error; malformed lower-priority values are skipped with a warning.
#[derive(Debug, Clone)]
pub struct ToolchainResolver {
    env_default: Option<String>,
    manifest_default: Option<String>,
    host: HostInfo,
}

impl ToolchainResolver {
    pub fn new(host: HostInfo) -> Self {
        ToolchainResolver {
            env_default: None,
            manifest_default: None,
            host,
        }
    }

    /// Set the environment default.
    pub fn with_env_default(mut self, value: Option<impl Into<String>>) -> Self {
        self.env_default = value.map(Into::into);
        self
    }

    /// Set the manifest's persisted default.
    pub fn with_manifest_default(mut self, value: Option<impl Into<String>>) -> Self {
        self.manifest_default = value.map(Into::into);
        self
    }

    /// Resolve the triplet, given the optional CLI flag.
    pub fn resolve(&self, flag: Option<&str>) -> Result<ResolvedTriplet, RelayError> {
        if let Some(flag) = flag {
            return Ok(ResolvedTriplet {
                triplet: Triplet::parse(flag)?,
                source: TripletSource::Flag,
            });
        }

        let candidates = [
            (self.env_default.as_deref(), TripletSource::Environment),
            (self.manifest_default.as_deref(), TripletSource::Manifest),
        ];
        for (value, source) in candidates {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            match Triplet::parse(value) {
                Ok(triplet) => return Ok(ResolvedTriplet { triplet, source }),
                Err(_) => {
                    tracing::warn!("ignoring malformed triplet `{}` from {}", value, source);
                }
            }
        }

        if let Some(triplet) = self.host.detect() {
            return Ok(ResolvedTriplet {
                triplet,
                source: TripletSource::Host,
            });
        }

        let triplet = self.host.fallback();
        tracing::warn!(
            "could not detect a triplet for {}-{}, using {}",
            self.host.arch,
            self.host.os,
            triplet
        );
        Ok(ResolvedTriplet {
            triplet,
            source: TripletSource::Fallback,
        })
    }
}
