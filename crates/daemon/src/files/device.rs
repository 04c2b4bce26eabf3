//! Local machine summary.
//!
//! Everything here is evaluated at call time; nothing is cached between
//! requests.

use std::path::PathBuf;
use std::time::Duration;

use remofs_protocol::DeviceInfo;
use tracing::debug;

use super::capacity::{capacity_within, Capacity};

/// Describe the local machine.
///
/// Never fails: an unknown host name is reported as an empty string and an
/// unreadable system volume as zero capacity.
pub fn device_info(stat_timeout: Option<Duration>) -> DeviceInfo {
    let volume = system_volume();
    let capacity = capacity_within(&volume, stat_timeout).unwrap_or_else(|e| {
        debug!("Cannot stat system volume {}: {}", volume.display(), e);
        Capacity::default()
    });

    DeviceInfo {
        name: host_name(),
        platform: platform_name().to_string(),
        total_space: capacity.total,
        free_space: capacity.free,
        used_space: capacity.used,
    }
}

/// The machine's host name, or an empty string if it cannot be read.
pub fn host_name() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            debug!("Cannot read host name: {}", e);
            String::new()
        }
    }
}

/// Operating system family name.
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "windows" => "Windows",
        "macos" => "Darwin",
        "android" => "Android",
        "ios" => "iOS",
        "freebsd" => "FreeBSD",
        "netbsd" => "NetBSD",
        "openbsd" => "OpenBSD",
        "dragonfly" => "DragonFly",
        "solaris" => "SunOS",
        "illumos" => "illumos",
        other => other,
    }
}

/// The volume the operating system is installed on.
#[cfg(windows)]
pub fn system_volume() -> PathBuf {
    let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
    PathBuf::from(format!("{}\\", drive.trim_end_matches('\\')))
}

/// The volume the operating system is installed on.
#[cfg(not(windows))]
pub fn system_volume() -> PathBuf {
    PathBuf::from("/")
}
