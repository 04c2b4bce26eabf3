//! Read-only filesystem exploration.
//!
//! This module provides:
//! - Path validation against an optional permitted root
//! - Device and drive (mount point) discovery with capacity figures
//! - Directory listing with hidden-entry filtering, search and sorting
//!
//! # Security
//!
//! Client paths are normalized and canonicalized before use. With a permitted
//! root configured, paths escaping it lexically or through symlinks are
//! rejected. Nothing in this module writes to the filesystem.

pub mod browser;
pub mod capacity;
pub mod device;
pub mod drives;
pub mod error;
pub mod validator;

pub use browser::{DirectoryBrowser, DirectoryEntry, EntryOutcome, Listing, SkipReason};
pub use capacity::{capacity_within, volume_capacity, Capacity};
pub use device::{device_info, host_name, platform_name, system_volume};
pub use drives::{platform_mounts, DriveEnumerator, Drives, MountPoint, MountSource, StaticMounts};
pub use error::ExplorerError;
pub use validator::{PathValidator, ResolvedPath};
