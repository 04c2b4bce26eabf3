//! Directory listing.
//!
//! [`DirectoryBrowser::list`] turns an already validated directory into two
//! ordered collections, folders and files, after hidden-entry filtering,
//! search and sorting. Children that cannot be stat'ed are dropped instead of
//! failing the whole listing.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use remofs_protocol::{ChildCounts, DirectoryListing, EntryInfo, EntryKind, ListingOptions, SortBy};
use thiserror::Error;
use tracing::debug;

use super::error::ExplorerError;

/// A directory child with metadata.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// Folder or file.
    pub kind: EntryKind,
    /// Size in bytes (0 for folders).
    pub size: u64,
    /// Last modified timestamp.
    pub modified: SystemTime,
    /// Whether the platform considers this entry hidden.
    pub is_hidden: bool,
    /// Child counts, when requested.
    pub children: Option<ChildCounts>,
}

impl DirectoryEntry {
    /// Convert to protocol EntryInfo.
    pub fn to_protocol(&self) -> EntryInfo {
        let modified_at = self
            .modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        EntryInfo {
            name: self.name.clone(),
            path: self.path.to_string_lossy().into_owned(),
            kind: self.kind,
            size: self.size,
            modified_at,
            is_hidden: self.is_hidden,
            children: self.children,
        }
    }

    fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Why a child was left out of a listing.
#[derive(Debug, Error)]
pub enum SkipReason {
    /// The directory iterator failed to produce the entry.
    #[error("unreadable directory entry: {0}")]
    Unreadable(io::Error),

    /// The entry exists but cannot be stat'ed (broken symlink, permissions).
    #[error("cannot stat {path}: {source}")]
    Stat {
        /// The entry's path.
        path: PathBuf,
        /// The stat error.
        source: io::Error,
    },
}

/// Result of inspecting a single directory child.
#[derive(Debug)]
pub enum EntryOutcome {
    /// Stat succeeded.
    Keep(DirectoryEntry),
    /// Stat failed; the child is dropped.
    Skip(SkipReason),
}

/// Folders and files of one directory.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Subfolders.
    pub folders: Vec<DirectoryEntry>,
    /// Files.
    pub files: Vec<DirectoryEntry>,
}

impl Listing {
    /// Convert to protocol DirectoryListing.
    pub fn to_protocol(&self) -> DirectoryListing {
        DirectoryListing {
            folders: self.folders.iter().map(DirectoryEntry::to_protocol).collect(),
            files: self.files.iter().map(DirectoryEntry::to_protocol).collect(),
        }
    }
}

/// Lists directory contents.
///
/// Paths handed to the browser are expected to have been validated already;
/// the browser only reports what goes wrong while reading.
#[derive(Debug, Clone, Default)]
pub struct DirectoryBrowser;

impl DirectoryBrowser {
    /// Create a directory browser.
    pub fn new() -> Self {
        Self
    }

    /// List the contents of a directory.
    ///
    /// Hidden entries are dropped unless `show_hidden` is set, then the search
    /// filter applies, then entries are sorted and split into folders and
    /// files. Both collections follow the same order.
    pub fn list(&self, path: &Path, options: &ListingOptions) -> Result<Listing, ExplorerError> {
        let entries = fs::read_dir(path).map_err(|e| read_error(e, path))?;

        let mut kept: Vec<DirectoryEntry> = Vec::new();
        for entry_result in entries {
            match inspect_entry(entry_result) {
                EntryOutcome::Keep(entry) => kept.push(entry),
                EntryOutcome::Skip(reason) => {
                    debug!("Skipping entry in {}: {}", path.display(), reason);
                }
            }
        }

        if !options.show_hidden {
            kept.retain(|e| !e.is_hidden);
        }

        if let Some(needle) = options.search_term() {
            let needle = needle.to_lowercase();
            kept.retain(|e| e.name.to_lowercase().contains(&needle));
        }

        if options.count_children {
            for entry in kept.iter_mut().filter(|e| e.is_folder()) {
                entry.children = match count_children(&entry.path, options.show_hidden) {
                    Ok(counts) => Some(counts),
                    Err(e) => {
                        debug!("Cannot count children of {}: {}", entry.path.display(), e);
                        None
                    }
                };
            }
        }

        sort_entries(&mut kept, options.sort_by, options.reverse);

        let (folders, files) = kept.into_iter().partition(DirectoryEntry::is_folder);
        Ok(Listing { folders, files })
    }
}

/// Map a `read_dir` failure to an explorer error.
fn read_error(err: io::Error, path: &Path) -> ExplorerError {
    match ExplorerError::from_io(err, path) {
        ExplorerError::Io(err) => match fs::metadata(path) {
            Ok(metadata) if !metadata.is_dir() => ExplorerError::NotADirectory(path.to_path_buf()),
            _ => ExplorerError::Io(err),
        },
        other => other,
    }
}

/// Stat one directory child, following symlinks.
fn inspect_entry(entry_result: io::Result<fs::DirEntry>) -> EntryOutcome {
    let entry = match entry_result {
        Ok(entry) => entry,
        Err(e) => return EntryOutcome::Skip(SkipReason::Unreadable(e)),
    };

    let path = entry.path();
    let metadata = match fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(source) => return EntryOutcome::Skip(SkipReason::Stat { path, source }),
    };

    let name = entry.file_name().to_string_lossy().into_owned();
    EntryOutcome::Keep(build_entry(name, path, &metadata))
}

fn build_entry(name: String, path: PathBuf, metadata: &fs::Metadata) -> DirectoryEntry {
    let kind = if metadata.is_dir() {
        EntryKind::Folder
    } else {
        EntryKind::File
    };
    let size = match kind {
        EntryKind::File => metadata.len(),
        EntryKind::Folder => 0,
    };

    DirectoryEntry {
        is_hidden: is_hidden(&name, metadata),
        name,
        path,
        kind,
        size,
        modified: metadata.modified().unwrap_or(UNIX_EPOCH),
        children: None,
    }
}

/// Count the visible subfolders and files of a folder.
fn count_children(path: &Path, show_hidden: bool) -> io::Result<ChildCounts> {
    let mut counts = ChildCounts::default();

    for entry in fs::read_dir(path)?.flatten() {
        let Ok(metadata) = fs::metadata(entry.path()) else {
            continue;
        };
        if !show_hidden && is_hidden(&entry.file_name().to_string_lossy(), &metadata) {
            continue;
        }
        if metadata.is_dir() {
            counts.folders += 1;
        } else {
            counts.files += 1;
        }
    }

    Ok(counts)
}

/// Order entries by `sort_by`, breaking ties by name, then invert if asked.
///
/// Folders have size 0, so a size sort leaves them in name order.
fn sort_entries(entries: &mut [DirectoryEntry], sort_by: SortBy, reverse: bool) {
    entries.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::Name => Ordering::Equal,
            SortBy::Size => a.size.cmp(&b.size),
            SortBy::Modified => a.modified.cmp(&b.modified),
        }
        .then_with(|| compare_names(a, b));

        if reverse {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

/// Case-insensitive name order; exact name and raw path settle ties.
fn compare_names(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.path.cmp(&b.path))
}

#[cfg(windows)]
fn is_hidden(_name: &str, metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    use windows_sys::Win32::Storage::FileSystem::FILE_ATTRIBUTE_HIDDEN;

    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(target_os = "macos")]
fn is_hidden(name: &str, metadata: &fs::Metadata) -> bool {
    use std::os::macos::fs::MetadataExt;
    const UF_HIDDEN: u32 = 0x8000;

    name.starts_with('.') || metadata.st_flags() & UF_HIDDEN != 0
}

#[cfg(not(any(windows, target_os = "macos")))]
fn is_hidden(name: &str, _metadata: &fs::Metadata) -> bool {
    name.starts_with('.')
}
