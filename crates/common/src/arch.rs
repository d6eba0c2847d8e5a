//! Native library architecture definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Architecture of an installed application's native library directory.
///
/// The directory basename is the canonical spelling (`lib/arm64`, `lib/x86_64`,
/// `lib/arm`, `lib/x86`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NativeArch {
    Arm,
    Arm64,
    X86,
    X86_64,
}

impl fmt::Display for NativeArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeArch::Arm => write!(f, "arm"),
            NativeArch::Arm64 => write!(f, "arm64"),
            NativeArch::X86 => write!(f, "x86"),
            NativeArch::X86_64 => write!(f, "x86_64"),
        }
    }
}

impl FromStr for NativeArch {
    type Err = crate::Error;

    // Exact match only: directory names are case sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm" => Ok(NativeArch::Arm),
            "arm64" => Ok(NativeArch::Arm64),
            "x86" => Ok(NativeArch::X86),
            "x86_64" => Ok(NativeArch::X86_64),
            _ => Err(crate::Error::UnsupportedArch(s.to_string())),
        }
    }
}

impl NativeArch {
    /// Parse the architecture from a native library directory path.
    pub fn from_library_dir(dir: &Path) -> Option<Self> {
        dir.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse().ok())
    }

    /// Check if the architecture is 64-bit.
    pub fn is_64bit(&self) -> bool {
        matches!(self, NativeArch::Arm64 | NativeArch::X86_64)
    }
}

/// Whether a native library directory indicates a 64-bit build.
///
/// Anything other than a basename of exactly `arm64` or `x86_64`, including no
/// directory at all, is reported as 32-bit.
pub fn library_dir_is_64bit(dir: Option<&Path>) -> bool {
    dir.and_then(NativeArch::from_library_dir)
        .map(|arch| arch.is_64bit())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_native_arch() {
        assert_eq!(NativeArch::from_str("arm64").unwrap(), NativeArch::Arm64);
        assert_eq!(NativeArch::from_str("x86_64").unwrap(), NativeArch::X86_64);
        assert_eq!(NativeArch::from_str("arm").unwrap(), NativeArch::Arm);
        assert!(NativeArch::from_str("ARM64").is_err());
        assert!(NativeArch::from_str("arm64-v8a").is_err());
    }

    #[test]
    fn test_display_native_arch() {
        assert_eq!(NativeArch::Arm64.to_string(), "arm64");
        assert_eq!(NativeArch::X86_64.to_string(), "x86_64");
    }

    #[test]
    fn test_library_dir_is_64bit() {
        let dir = |p: &str| Some(Path::new(p).to_path_buf());

        assert!(library_dir_is_64bit(dir("/data/app/pkg/lib/arm64").as_deref()));
        assert!(library_dir_is_64bit(dir("/data/app/pkg/lib/x86_64").as_deref()));
        assert!(!library_dir_is_64bit(dir("/data/app/pkg/lib/arm").as_deref()));
        assert!(!library_dir_is_64bit(dir("/data/app/pkg/lib/x86").as_deref()));
        assert!(!library_dir_is_64bit(dir("/data/app/pkg/lib/mips64").as_deref()));
        assert!(!library_dir_is_64bit(dir("").as_deref()));
        assert!(!library_dir_is_64bit(None));
    }
}
