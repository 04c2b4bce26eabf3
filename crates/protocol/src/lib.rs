//! # RemoFS Protocol Library
//!
//! Wire types shared by the RemoFS daemon and its clients.
//!
//! ## Overview
//!
//! The daemon exposes a single read-only listing endpoint. Its answers are
//! one of two shapes:
//!
//! - **Root listing**: the machine ([`DeviceInfo`]) and its mounted volumes
//!   ([`DriveInfo`]), returned for the virtual root path `/`
//! - **Directory listing**: the folders and files ([`EntryInfo`]) of a real
//!   directory, filtered and ordered per [`ListingOptions`]
//!
//! Failures are reported as an [`ErrorBody`] carrying an [`ErrorCode`].
//!
//! ## Example Usage
//!
//! ```rust
//! use remofs_protocol::{ListingOptions, SortBy};
//!
//! let options = ListingOptions::default()
//!     .with_sort_by("size".parse::<SortBy>().unwrap())
//!     .with_reverse(true);
//! assert_eq!(options.sort_by, SortBy::Size);
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Request options and response bodies
//! - [`format`]: Human-readable sizes
//! - [`error`]: Error types

pub mod error;
pub mod format;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use format::human_size;
pub use messages::{
    parse_flag, ChildCounts, DeviceInfo, DirectoryListing, DriveInfo, EntryInfo, EntryKind,
    ErrorBody, ErrorCode, ItemsResponse, ListingOptions, RootListing, SortBy, ROOT_PATH,
};
