//! Volume capacity stats.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use dashmap::DashSet;

/// Paths with a capacity stat thread still running.
static PENDING_STATS: LazyLock<DashSet<PathBuf>> = LazyLock::new(DashSet::new);

/// Size figures of the volume holding a path, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capacity {
    /// Total size.
    pub total: u64,
    /// Space available to the daemon process.
    pub free: u64,
    /// Space in use.
    pub used: u64,
}

/// Stat the volume containing `path`.
#[cfg(unix)]
pub fn volume_capacity(path: &Path) -> io::Result<Capacity> {
    use nix::sys::statvfs::statvfs;

    let stat = statvfs(path).map_err(io::Error::from)?;
    // FUSE filesystems may report arbitrary block counts.
    let fragment = stat.fragment_size() as u64;
    let blocks = stat.blocks() as u64;
    let total = blocks.saturating_mul(fragment);
    let free = (stat.blocks_available() as u64).saturating_mul(fragment);
    let used = blocks
        .saturating_sub(stat.blocks_free() as u64)
        .saturating_mul(fragment);

    Ok(Capacity { total, free, used })
}

/// Stat the volume containing `path`.
#[cfg(windows)]
pub fn volume_capacity(path: &Path) -> io::Result<Capacity> {
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();
    let mut free_to_caller = 0u64;
    let mut total = 0u64;
    let mut total_free = 0u64;

    // SAFETY: `wide` is NUL-terminated and outlives the call; the out
    // pointers reference live stack locals.
    let ok = unsafe {
        GetDiskFreeSpaceExW(wide.as_ptr(), &mut free_to_caller, &mut total, &mut total_free)
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(Capacity {
        total,
        free: free_to_caller,
        used: total.saturating_sub(total_free),
    })
}

/// Stat the volume containing `path`, giving up after `timeout`.
///
/// The stat runs on its own thread so a hung network mount cannot block the
/// caller past the deadline. A timed-out stat reports
/// [`io::ErrorKind::TimedOut`]; its thread is left to finish on its own.
/// While that thread is still running, further stats of the same path fail
/// at once with [`io::ErrorKind::ResourceBusy`] instead of spawning another.
/// `None` stats inline with no deadline.
pub fn capacity_within(path: &Path, timeout: Option<Duration>) -> io::Result<Capacity> {
    match timeout {
        Some(timeout) => stat_within(path, timeout, volume_capacity),
        None => volume_capacity(path),
    }
}

fn stat_within<F>(path: &Path, timeout: Duration, stat: F) -> io::Result<Capacity>
where
    F: FnOnce(&Path) -> io::Result<Capacity> + Send + 'static,
{
    let owned = path.to_path_buf();
    if !PENDING_STATS.insert(owned.clone()) {
        return Err(io::Error::new(
            io::ErrorKind::ResourceBusy,
            format!("capacity stat of {} is still pending", path.display()),
        ));
    }

    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("remofs-statvfs".to_string())
        .spawn(move || {
            let result = stat(&owned);
            PENDING_STATS.remove(&owned);
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        PENDING_STATS.remove(path);
        return Err(e);
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("capacity stat of {} timed out after {:?}", path.display(), timeout),
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err(io::Error::other("capacity stat exited without a result"))
        }
    }
}
