//! Builds the info.json record from host facts and the settings snapshot.

use crate::host::HostEnvironment;
use diagpack_bundle_schema::{MetadataRecord, SettingsSnapshot};
use diagpack_common::{arch, Result};
use tracing::debug;

/// Assemble the metadata record for one export.
///
/// Any failing host lookup aborts the build.
pub fn build_metadata(
    host: &dyn HostEnvironment,
    settings: &SettingsSnapshot,
) -> Result<MetadataRecord> {
    let device = host.device()?;
    let package = host.package()?;
    let module = host.module();
    let prebuilt = host.signature_matches()?;

    let app_arch64 = arch::library_dir_is_64bit(package.native_library_dir.as_deref());
    debug!(
        "Native library dir {:?} -> app_arch64={}",
        package.native_library_dir, app_arch64
    );

    Ok(MetadataRecord {
        os_ver: device.os_release,
        api_level: device.api_level,
        device: format!("{} {}", device.manufacturer, device.model),
        abi_list: device.supported_abis.join(","),
        os_arch64: !device.supported_64bit_abis.is_empty(),
        prebuilt,
        app_id: package.app_id,
        app_ver_name: package.version_name,
        app_ver_code: package.version_code,
        app_arch64,
        module_ver_name: module.version_name,
        module_ver_code: module.version_code,
        module_settings: settings.flatten(),
    })
}
