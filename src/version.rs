use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

static CURRENT: Lazy<Version> = Lazy::new(|| Version::parse(env!("CARGO_PKG_VERSION")));

/// Three-part syntax version. Field order matters: the derived `Ord`
/// compares major, then minor, then build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// Never fails: missing or non-numeric parts become `0`, and an empty
    /// tag means `1.0.0`.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::new(1, 0, 0);
        }
        let mut parts = text.split('.').map(parse_part);
        let major = parts.next().unwrap_or(0);
        let minor = parts.next().unwrap_or(0);
        let build = parts.next().unwrap_or(0);
        Self::new(major, minor, build)
    }

    /// Version of the running implementation.
    pub fn current() -> Self {
        *CURRENT
    }

    pub fn is_newer_than_current(&self) -> bool {
        compare(self, &Self::current()) == Ordering::Greater
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

fn parse_part(part: &str) -> u32 {
    part.trim().parse().unwrap_or(0)
}

/// `Greater` when `version` is newer than `current`.
pub fn compare(version: &Version, current: &Version) -> Ordering {
    version.cmp(current)
}
