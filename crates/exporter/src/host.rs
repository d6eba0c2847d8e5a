//! Host-provided facts about the device, the application and this module.
//!
//! The exporter never looks these up itself; it asks a [`HostEnvironment`].
//! [`StaticHost`] serves facts declared in configuration, optionally probing
//! the running machine for device information.

use diagpack_common::{hash, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Device and operating system facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub os_release: String,
    pub api_level: u32,
    pub manufacturer: String,
    pub model: String,
    /// Supported ABIs, most preferred first.
    #[serde(default)]
    pub supported_abis: Vec<String>,
    #[serde(default)]
    pub supported_64bit_abis: Vec<String>,
}

impl DeviceInfo {
    /// Probe the running machine.
    ///
    /// Only the OS release is mandatory; vendor and model fall back to
    /// `unknown` when firmware tables are not exposed.
    pub fn detect() -> Result<Self> {
        let os_release = std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .map(|v| v.trim().to_string())
            .map_err(|e| Error::Metadata(format!("reading OS release: {}", e)))?;

        let abi = native_abi_name(std::env::consts::ARCH);
        let supported_64bit_abis = if cfg!(target_pointer_width = "64") {
            vec![abi.clone()]
        } else {
            Vec::new()
        };

        Ok(Self {
            os_release,
            api_level: 0,
            manufacturer: read_dmi("sys_vendor"),
            model: read_dmi("product_name"),
            supported_abis: vec![abi],
            supported_64bit_abis,
        })
    }
}

fn read_dmi(field: &str) -> String {
    std::fs::read_to_string(format!("/sys/class/dmi/id/{}", field))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn native_abi_name(arch: &str) -> String {
    match arch {
        "aarch64" => "arm64-v8a".to_string(),
        "arm" => "armeabi-v7a".to_string(),
        other => other.to_string(),
    }
}

/// Installed application facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub app_id: String,
    pub version_name: String,
    pub version_code: i64,
    /// Directory the application's native libraries were extracted to.
    #[serde(default)]
    pub native_library_dir: Option<PathBuf>,
}

/// Build facts of this module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub version_name: String,
    pub version_code: u32,
}

impl ModuleInfo {
    /// Facts of the running build.
    pub fn current() -> Self {
        let part = |s: &str| s.parse::<u32>().unwrap_or(0);
        Self {
            version_name: env!("CARGO_PKG_VERSION").to_string(),
            version_code: Self::version_code_for(
                part(env!("CARGO_PKG_VERSION_MAJOR")),
                part(env!("CARGO_PKG_VERSION_MINOR")),
                part(env!("CARGO_PKG_VERSION_PATCH")),
            ),
        }
    }

    /// `major * 10000 + minor * 100 + patch`.
    pub fn version_code_for(major: u32, minor: u32, patch: u32) -> u32 {
        major * 10_000 + minor * 100 + patch
    }
}

/// Release signature check: the signing certificate's digest is compared
/// against the digest of official builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCheck {
    pub certificate: PathBuf,
    pub expected_sha256: String,
}

/// Host facts as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFacts {
    /// Device facts; probed from the running machine when absent.
    #[serde(default)]
    pub device: Option<DeviceInfo>,
    pub package: PackageInfo,
    #[serde(default)]
    pub signature: Option<SignatureCheck>,
}

/// Source of host facts for the metadata record.
pub trait HostEnvironment: Send + Sync {
    fn device(&self) -> Result<DeviceInfo>;

    fn package(&self) -> Result<PackageInfo>;

    fn module(&self) -> ModuleInfo;

    /// Whether the host build carries the official release signature.
    fn signature_matches(&self) -> Result<bool>;
}

/// Host environment backed by declared facts.
pub struct StaticHost {
    facts: HostFacts,
    module: ModuleInfo,
}

impl StaticHost {
    pub fn new(facts: HostFacts) -> Self {
        Self {
            facts,
            module: ModuleInfo::current(),
        }
    }

    /// Override the module build facts.
    pub fn with_module(mut self, module: ModuleInfo) -> Self {
        self.module = module;
        self
    }
}

impl HostEnvironment for StaticHost {
    fn device(&self) -> Result<DeviceInfo> {
        match self.facts.device {
            Some(ref device) => Ok(device.clone()),
            None => DeviceInfo::detect(),
        }
    }

    fn package(&self) -> Result<PackageInfo> {
        Ok(self.facts.package.clone())
    }

    fn module(&self) -> ModuleInfo {
        self.module.clone()
    }

    fn signature_matches(&self) -> Result<bool> {
        let Some(ref check) = self.facts.signature else {
            return Ok(false);
        };

        let actual = hash::sha256_file(&check.certificate).map_err(|e| {
            Error::Metadata(format!(
                "reading signing certificate {:?}: {}",
                check.certificate, e
            ))
        })?;
        debug!("Signing certificate digest: {}", actual);

        Ok(hash::digest_eq(&actual, &check.expected_sha256))
    }
}
