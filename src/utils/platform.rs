//! Platform-specific naming conventions for release assets and the
//! launcher executable.
//!
//! Release archives are published per target as
//! `nimbus-{os}-{arch}.zip`; the main executable inside follows the
//! platform's binary naming. These helpers are the single source of truth
//! for both, so asset selection and post-install executable lookup cannot
//! drift apart.

/// Name of the launcher's main executable on this platform.
pub fn launcher_executable_name() -> &'static str {
    if cfg!(windows) { "nimbus.exe" } else { "nimbus" }
}

/// Expected archive asset name for the current platform.
///
/// Returns `None` on targets no release archive is published for; the
/// self-update transaction treats that as a precondition failure with no
/// filesystem side effects.
pub fn expected_archive_name() -> Option<String> {
    let os = if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        return None;
    };

    let arch = if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else {
        return None;
    };

    Some(format!("nimbus-{os}-{arch}.zip"))
}

/// Whether a staged file should receive the executable bit on unix
/// targets: the main executable and any shared native libraries.
pub fn needs_executable_bit(file_name: &str) -> bool {
    file_name == launcher_executable_name()
        || file_name.ends_with(".so")
        || file_name.ends_with(".dylib")
}
