//! Wire types for RemoFS.
//!
//! This module defines the values exchanged between the daemon and its
//! clients. Everything is serialized as JSON; field names are snake_case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Path string that denotes the virtual root (devices and drives).
pub const ROOT_PATH: &str = "/";

// ============================================================================
// Device Messages
// ============================================================================

/// Summary metadata about the machine the daemon runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Host name. Empty if it could not be determined.
    pub name: String,
    /// Operating system family (`Linux`, `Windows`, `Darwin`, ...).
    pub platform: String,
    /// Total bytes of the primary volume.
    pub total_space: u64,
    /// Free bytes of the primary volume.
    pub free_space: u64,
    /// Used bytes of the primary volume.
    pub used_space: u64,
}

/// A mounted storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveInfo {
    /// Where the volume is mounted.
    pub mount_point: String,
    /// Human-readable volume label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Drive letter (Windows only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<char>,
    /// Filesystem type as reported by the mount table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_system: Option<String>,
    /// Total bytes.
    pub total_space: u64,
    /// Bytes available to the daemon.
    pub free_space: u64,
    /// Bytes in use.
    pub used_space: u64,
}

// ============================================================================
// Listing Messages
// ============================================================================

/// Kind of a directory child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Directory (or symlink resolving to one).
    Folder,
    /// Anything else.
    File,
}

/// Number of visible children of a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildCounts {
    /// Subfolders.
    pub folders: u64,
    /// Files.
    pub files: u64,
}

/// A single directory child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Entry name (not full path).
    pub name: String,
    /// Full path.
    pub path: String,
    /// Folder or file.
    pub kind: EntryKind,
    /// Size in bytes (0 for folders).
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds).
    pub modified_at: u64,
    /// Whether the platform considers this entry hidden.
    pub is_hidden: bool,
    /// Child counts, only for folders and only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildCounts>,
}

/// Sort key for directory listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Case-insensitive name.
    #[default]
    Name,
    /// Size in bytes. Folders compare as 0.
    Size,
    /// Last modified time.
    Modified,
}

impl SortBy {
    /// The query-string spelling of this key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Name => "name",
            SortBy::Size => "size",
            SortBy::Modified => "modified",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "name" => Ok(SortBy::Name),
            "size" => Ok(SortBy::Size),
            "modified" => Ok(SortBy::Modified),
            _ => Err(ProtocolError::InvalidOption {
                option: "sort_by",
                value: s.to_string(),
            }),
        }
    }
}

/// Options controlling a directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingOptions {
    /// Keep only entries whose name contains this string (case-insensitive).
    pub search: Option<String>,
    /// Sort key.
    pub sort_by: SortBy,
    /// Invert the final order.
    pub reverse: bool,
    /// Include hidden entries.
    pub show_hidden: bool,
    /// Count the children of every listed folder.
    pub count_children: bool,
}

impl ListingOptions {
    /// Set the search filter.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Set the sort key.
    pub fn with_sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Set whether the order is reversed.
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Set whether hidden entries are included.
    pub fn with_show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    /// Set whether folder children are counted.
    pub fn with_count_children(mut self, count_children: bool) -> Self {
        self.count_children = count_children;
        self
    }

    /// The search needle, if a non-empty one was given.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

/// Parse a boolean query flag.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off` in any case. An empty
/// value is `false`.
pub fn parse_flag(option: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "off" => Ok(false),
        "true" | "1" | "yes" | "on" => Ok(true),
        _ => Err(ProtocolError::InvalidOption {
            option,
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response for the virtual root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootListing {
    /// The local machine.
    pub device: DeviceInfo,
    /// Mounted volumes.
    pub drives: Vec<DriveInfo>,
}

/// Response for a real directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// Subfolders, ordered per the listing options.
    pub folders: Vec<EntryInfo>,
    /// Files, ordered per the listing options.
    pub files: Vec<EntryInfo>,
}

/// Body of a successful `/api/items` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemsResponse {
    /// Devices and drives.
    Root(RootListing),
    /// Directory contents.
    Directory(DirectoryListing),
}

// ============================================================================
// Errors
// ============================================================================

/// Error codes reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Empty or malformed path.
    InvalidPath,
    /// Path does not exist.
    NotFound,
    /// The daemon may not access the path.
    AccessDenied,
    /// Path lies outside the permitted root.
    Forbidden,
    /// A directory was expected.
    NotADirectory,
    /// Malformed query parameter.
    InvalidQuery,
    /// Server-side error.
    Internal,
}

impl ErrorCode {
    /// HTTP status the route layer reports for this code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidPath => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::AccessDenied => 403,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotADirectory => 400,
            ErrorCode::InvalidQuery => 400,
            ErrorCode::Internal => 500,
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub error: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// HTTP status code.
    pub code: u16,
}

impl ErrorBody {
    /// Create an error body; the status is derived from the code.
    pub fn new(error: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error,
            message: message.into(),
            code: error.http_status(),
        }
    }
}
