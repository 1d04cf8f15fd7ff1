//! Target platform identifiers.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Target platform of a distribution.
///
/// The set is closed: every platform the engine can provision a runtime for
/// has a variant here, and each maps to a stable key used for cache slots,
/// download URLs, and log output.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// 64-bit x86 Linux.
    Linux64,
    /// 64-bit x86 Windows.
    Windows64,
    /// 64-bit x86 macOS.
    MacOs64,
}

impl Platform {
    /// All supported platforms.
    pub fn all() -> [Platform; 3] {
        [Self::Linux64, Self::Windows64, Self::MacOs64]
    }

    /// Stable identifier used for cache directories and token file names.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Linux64 => "linux64",
            Self::Windows64 => "windows64",
            Self::MacOs64 => "macos64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linux64" => Ok(Self::Linux64),
            "windows64" => Ok(Self::Windows64),
            "macos64" => Ok(Self::MacOs64),
            other => Err(Error::config(format!(
                "unknown platform {other:?}, expected one of: linux64, windows64, macos64"
            ))),
        }
    }
}
