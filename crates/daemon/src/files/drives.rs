//! Mounted volume enumeration.
//!
//! Mount discovery sits behind the [`MountSource`] trait with one
//! implementation per platform family, chosen at build time:
//!
//! - Linux and Android read the kernel mount table (`/proc/self/mounts`)
//! - macOS reports `/` plus the volumes under `/Volumes`
//! - Windows reports the logical drive letters
//! - other Unix systems report `/` only
//!
//! [`DriveEnumerator`] sorts what the source returns and stats each volume
//! lazily while it is iterated. Volumes whose stat fails are skipped.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use remofs_protocol::DriveInfo;
use tracing::{debug, warn};

use super::capacity::capacity_within;

/// A mounted volume as reported by the platform, before any stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    /// Mount location.
    pub path: PathBuf,
    /// Volume label.
    pub label: Option<String>,
    /// Drive letter (Windows only).
    pub letter: Option<char>,
    /// Filesystem type.
    pub file_system: Option<String>,
}

impl MountPoint {
    /// A mount at `path` with no further metadata.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            label: None,
            letter: None,
            file_system: None,
        }
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the filesystem type.
    pub fn with_file_system(mut self, file_system: impl Into<String>) -> Self {
        self.file_system = Some(file_system.into());
        self
    }
}

/// Source of the current mount table.
pub trait MountSource: Send + Sync {
    /// Enumerate the currently mounted volumes, in any order.
    fn enumerate_mounts(&self) -> io::Result<Vec<MountPoint>>;
}

/// A fixed mount list.
#[derive(Debug, Clone, Default)]
pub struct StaticMounts(pub Vec<MountPoint>);

impl MountSource for StaticMounts {
    fn enumerate_mounts(&self) -> io::Result<Vec<MountPoint>> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// Linux / Android
// ============================================================================

/// Filesystem types that never hold user data.
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "fuse.gvfsd-fuse",
    "fuse.portal",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "proc",
    "pstore",
    "ramfs",
    "rpc_pipefs",
    "securityfs",
    "selinuxfs",
    "squashfs",
    "sysfs",
    "tmpfs",
    "tracefs",
];

/// Mount table read from procfs.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[derive(Debug, Clone)]
pub struct ProcMounts {
    path: PathBuf,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl ProcMounts {
    /// Read the mount table of the current process.
    pub fn new() -> Self {
        Self::from_path("/proc/self/mounts")
    }

    /// Read a mount table from an arbitrary file (same format as `/proc/mounts`).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl Default for ProcMounts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl MountSource for ProcMounts {
    fn enumerate_mounts(&self) -> io::Result<Vec<MountPoint>> {
        let table = match std::fs::read_to_string(&self.path) {
            Ok(table) => table,
            Err(e) if self.path == Path::new("/proc/self/mounts") => {
                debug!("Cannot read /proc/self/mounts ({}), trying /proc/mounts", e);
                std::fs::read_to_string("/proc/mounts")?
            }
            Err(e) => return Err(e),
        };
        Ok(parse_mount_table(&table))
    }
}

/// Parse a `/proc/mounts` style table.
///
/// Pseudo filesystems are dropped. When a mount point appears more than once
/// the last entry wins, since it is the one covering the path.
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
pub(crate) fn parse_mount_table(table: &str) -> Vec<MountPoint> {
    let mut mounts: Vec<MountPoint> = Vec::new();

    for line in table.lines() {
        let mut fields = line.split_whitespace();
        let (Some(_source), Some(target), Some(fs_type)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if PSEUDO_FILESYSTEMS.contains(&fs_type) {
            continue;
        }

        let path = PathBuf::from(unescape_mount_field(target));
        let mut mount = MountPoint::new(path).with_file_system(fs_type);
        if let Some(name) = mount.path.file_name() {
            mount.label = Some(name.to_string_lossy().into_owned());
        }

        mounts.retain(|m| m.path != mount.path);
        mounts.push(mount);
    }

    mounts
}

/// Decode the octal escapes (`\040` for space, ...) used in mount tables.
#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
fn unescape_mount_field(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg_attr(not(any(target_os = "linux", target_os = "android")), allow(dead_code))]
fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3
        && (b'0'..=b'3').contains(&digits[0])
        && digits[1..].iter().all(|d| (b'0'..=b'7').contains(d))
}

// ============================================================================
// macOS
// ============================================================================

/// `/` plus every volume mounted under `/Volumes`.
#[cfg(target_os = "macos")]
#[derive(Debug, Clone, Default)]
pub struct VolumesDir;

#[cfg(target_os = "macos")]
impl MountSource for VolumesDir {
    fn enumerate_mounts(&self) -> io::Result<Vec<MountPoint>> {
        let mut mounts = vec![MountPoint::new("/")];

        for entry in std::fs::read_dir("/Volumes")?.flatten() {
            let path = entry.path();
            // The boot volume shows up here as a symlink back to `/`.
            match dunce::canonicalize(&path) {
                Ok(target) if target == Path::new("/") => continue,
                Ok(target) if target.is_dir() => {}
                _ => continue,
            }
            let label = entry.file_name().to_string_lossy().into_owned();
            mounts.push(MountPoint::new(path).with_label(label));
        }

        Ok(mounts)
    }
}

// ============================================================================
// Windows
// ============================================================================

/// Logical drive letters reported by the system.
#[cfg(windows)]
#[derive(Debug, Clone, Default)]
pub struct LogicalDrives;

#[cfg(windows)]
impl MountSource for LogicalDrives {
    fn enumerate_mounts(&self) -> io::Result<Vec<MountPoint>> {
        use windows_sys::Win32::Storage::FileSystem::GetLogicalDrives;

        // SAFETY: no arguments; returns a bitmask of present drives.
        let mask = unsafe { GetLogicalDrives() };
        if mask == 0 {
            return Err(io::Error::last_os_error());
        }

        let mut mounts = Vec::new();
        for index in 0..26u8 {
            if mask & (1 << index) == 0 {
                continue;
            }
            let letter = char::from(b'A' + index);
            let root = format!("{letter}:\\");
            let (label, file_system) = volume_information(&root);
            mounts.push(MountPoint {
                path: PathBuf::from(root),
                label,
                letter: Some(letter),
                file_system,
            });
        }

        Ok(mounts)
    }
}

/// Volume label and filesystem name of a drive root.
#[cfg(windows)]
fn volume_information(root: &str) -> (Option<String>, Option<String>) {
    use windows_sys::Win32::Storage::FileSystem::GetVolumeInformationW;

    let wide: Vec<u16> = root.encode_utf16().chain(std::iter::once(0)).collect();
    let mut label = [0u16; 261];
    let mut file_system = [0u16; 261];

    // SAFETY: `wide` is NUL-terminated; buffer sizes match their lengths and
    // the unused out parameters are allowed to be null.
    let ok = unsafe {
        GetVolumeInformationW(
            wide.as_ptr(),
            label.as_mut_ptr(),
            label.len() as u32,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            file_system.as_mut_ptr(),
            file_system.len() as u32,
        )
    };
    if ok == 0 {
        return (None, None);
    }

    fn decode(buffer: &[u16]) -> Option<String> {
        let end = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
        let text = String::from_utf16_lossy(&buffer[..end]);
        (!text.is_empty()).then_some(text)
    }

    (decode(&label), decode(&file_system))
}

// ============================================================================
// Other Unix
// ============================================================================

/// The root filesystem only.
#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos", windows)))]
#[derive(Debug, Clone, Default)]
pub struct RootOnly;

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos", windows)))]
impl MountSource for RootOnly {
    fn enumerate_mounts(&self) -> io::Result<Vec<MountPoint>> {
        Ok(vec![MountPoint::new("/")])
    }
}

/// The mount source for the platform this binary was built for.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn platform_mounts() -> Box<dyn MountSource> {
    Box::new(ProcMounts::new())
}

/// The mount source for the platform this binary was built for.
#[cfg(target_os = "macos")]
pub fn platform_mounts() -> Box<dyn MountSource> {
    Box::new(VolumesDir)
}

/// The mount source for the platform this binary was built for.
#[cfg(windows)]
pub fn platform_mounts() -> Box<dyn MountSource> {
    Box::new(LogicalDrives)
}

/// The mount source for the platform this binary was built for.
#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "macos", windows)))]
pub fn platform_mounts() -> Box<dyn MountSource> {
    Box::new(RootOnly)
}

// ============================================================================
// Enumerator
// ============================================================================

/// Lists mounted volumes with their capacity.
pub struct DriveEnumerator {
    source: Box<dyn MountSource>,
    stat_timeout: Option<Duration>,
}

impl DriveEnumerator {
    /// Create an enumerator over the platform mount table.
    pub fn new() -> Self {
        Self {
            source: platform_mounts(),
            stat_timeout: None,
        }
    }

    /// Create an enumerator over a custom mount source.
    pub fn with_source(source: impl MountSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            stat_timeout: None,
        }
    }

    /// Bound every capacity stat by `timeout`. A timed-out volume is skipped.
    pub fn with_stat_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stat_timeout = timeout;
        self
    }

    /// Enumerate the currently mounted volumes.
    ///
    /// The returned iterator stats each volume as it advances and skips the
    /// ones that cannot be stat'ed. It is a snapshot: call again to see
    /// volumes that appeared or vanished since. If the mount table itself
    /// cannot be read the iterator is empty.
    pub fn list_drives(&self) -> Drives {
        let mut mounts = match self.source.enumerate_mounts() {
            Ok(mounts) => mounts,
            Err(e) => {
                warn!("Cannot enumerate mounts: {}", e);
                Vec::new()
            }
        };
        mounts.sort_by(|a, b| a.path.cmp(&b.path));

        Drives {
            mounts: mounts.into_iter(),
            stat_timeout: self.stat_timeout,
        }
    }

    /// Describe the volume holding an arbitrary directory as a drive.
    ///
    /// The label is the directory's own name.
    pub fn describe(&self, path: &Path) -> io::Result<DriveInfo> {
        let mut mount = MountPoint::new(path);
        mount.label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        stat_mount(mount, self.stat_timeout)
    }
}

impl Default for DriveEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy iterator over stat'ed volumes, in mount-point order.
pub struct Drives {
    mounts: std::vec::IntoIter<MountPoint>,
    stat_timeout: Option<Duration>,
}

impl Iterator for Drives {
    type Item = DriveInfo;

    fn next(&mut self) -> Option<DriveInfo> {
        for mount in self.mounts.by_ref() {
            let path = mount.path.clone();
            match stat_mount(mount, self.stat_timeout) {
                Ok(drive) => return Some(drive),
                Err(e) => debug!("Skipping volume {}: {}", path.display(), e),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.mounts.len()))
    }
}

fn stat_mount(mount: MountPoint, stat_timeout: Option<Duration>) -> io::Result<DriveInfo> {
    let capacity = capacity_within(&mount.path, stat_timeout)?;

    Ok(DriveInfo {
        mount_point: mount.path.to_string_lossy().into_owned(),
        label: mount.label,
        letter: mount.letter,
        file_system: mount.file_system,
        total_space: capacity.total,
        free_space: capacity.free,
        used_space: capacity.used,
    })
}
