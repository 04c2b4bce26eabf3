//! Request-level entry point over the `files` components.
//!
//! [`Explorer::items`] is what both the HTTP route and the CLI call: validate
//! the raw path, then answer with either the device and its drives (for the
//! sentinel root) or a directory listing.

use std::path::Path;
use std::time::Duration;

use remofs_protocol::{DeviceInfo, DirectoryListing, DriveInfo, ItemsResponse, ListingOptions, RootListing};
use tracing::debug;

use crate::config::ExplorerConfig;
use crate::files::{device_info, DirectoryBrowser, DriveEnumerator, ExplorerError, PathValidator, ResolvedPath};

/// Validates paths and dispatches them to the device, drive and directory
/// components.
pub struct Explorer {
    validator: PathValidator,
    browser: DirectoryBrowser,
    drives: DriveEnumerator,
    stat_timeout: Option<Duration>,
    count_children: bool,
}

impl Explorer {
    /// Create an explorer from its parts.
    pub fn new(validator: PathValidator, drives: DriveEnumerator) -> Self {
        Self {
            validator,
            browser: DirectoryBrowser::new(),
            drives,
            stat_timeout: None,
            count_children: false,
        }
    }

    /// Create an explorer over the platform mount table.
    ///
    /// Fails if the configured permitted root is not an existing directory.
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, ExplorerError> {
        let validator = PathValidator::new(config.root.as_deref())?;
        let drives = DriveEnumerator::new().with_stat_timeout(config.stat_timeout());

        Ok(Self::new(validator, drives)
            .with_stat_timeout(config.stat_timeout())
            .with_count_children(config.count_children))
    }

    /// Bound capacity stats of the system volume by `timeout`.
    pub fn with_stat_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stat_timeout = timeout;
        self
    }

    /// Whether listings count folder children when the request is silent.
    pub fn with_count_children(mut self, count_children: bool) -> Self {
        self.count_children = count_children;
        self
    }

    /// Default for `count_children` when a request omits it.
    pub fn count_children_default(&self) -> bool {
        self.count_children
    }

    /// The path validator in use.
    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// Answer an items request.
    pub fn items(&self, raw: &str, options: &ListingOptions) -> Result<ItemsResponse, ExplorerError> {
        match self.validator.validate(raw)? {
            ResolvedPath::Root => Ok(ItemsResponse::Root(self.root_listing())),
            ResolvedPath::Entry(path) => {
                Ok(ItemsResponse::Directory(self.list_directory(&path, options)?))
            }
        }
    }

    /// Describe the device and the drives reachable from the root.
    ///
    /// With a permitted root the only drive shown is the root itself.
    pub fn root_listing(&self) -> RootListing {
        RootListing {
            device: self.device(),
            drives: self.drives(),
        }
    }

    /// Describe the local machine.
    pub fn device(&self) -> DeviceInfo {
        device_info(self.stat_timeout)
    }

    /// The drives reachable from the root.
    pub fn drives(&self) -> Vec<DriveInfo> {
        match self.validator.root() {
            Some(root) => match self.drives.describe(root) {
                Ok(drive) => vec![drive],
                Err(e) => {
                    debug!("Cannot stat permitted root {}: {}", root.display(), e);
                    Vec::new()
                }
            },
            None => self.drives.list_drives().collect(),
        }
    }

    /// List an already validated directory.
    pub fn list_directory(
        &self,
        path: &Path,
        options: &ListingOptions,
    ) -> Result<DirectoryListing, ExplorerError> {
        Ok(self.browser.list(path, options)?.to_protocol())
    }
}
