//! Path validation.
//!
//! Every path received from a client goes through [`PathValidator::validate`]
//! before anything else touches the filesystem. The validator normalizes the
//! raw string, stats it, and enforces the optional permitted root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use remofs_protocol::ROOT_PATH;

use super::error::ExplorerError;

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPath {
    /// The virtual root: list the device and its drives.
    Root,
    /// An existing filesystem entry (canonical form).
    Entry(PathBuf),
}

impl ResolvedPath {
    /// Returns the filesystem path, or `None` for the virtual root.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ResolvedPath::Root => None,
            ResolvedPath::Entry(path) => Some(path),
        }
    }
}

/// Normalizes and authorizes client-supplied paths.
///
/// Without a permitted root every existing path is accepted. With one, paths
/// that escape it (lexically or through symlinks) are rejected as
/// [`ExplorerError::Forbidden`].
#[derive(Debug, Clone, Default)]
pub struct PathValidator {
    root: Option<PermittedRoot>,
}

#[derive(Debug, Clone)]
struct PermittedRoot {
    /// Root as configured, made absolute.
    lexical: PathBuf,
    /// Root with symlinks resolved.
    canonical: PathBuf,
}

impl PathValidator {
    /// Create a validator that allows every existing path.
    pub fn allow_all() -> Self {
        Self { root: None }
    }

    /// Create a validator restricted to `root`.
    ///
    /// The root must be an existing directory.
    pub fn with_root(root: impl AsRef<Path>) -> Result<Self, ExplorerError> {
        let root = root.as_ref();
        let lexical = root
            .absolutize()
            .map_err(ExplorerError::Io)?
            .into_owned();
        let canonical =
            dunce::canonicalize(&lexical).map_err(|e| ExplorerError::from_io(e, &lexical))?;

        if !canonical.is_dir() {
            return Err(ExplorerError::NotADirectory(canonical));
        }

        Ok(Self {
            root: Some(PermittedRoot { lexical, canonical }),
        })
    }

    /// Create a validator from an optional root.
    pub fn new(root: Option<&Path>) -> Result<Self, ExplorerError> {
        match root {
            Some(root) => Self::with_root(root),
            None => Ok(Self::allow_all()),
        }
    }

    /// The canonical permitted root, if one is configured.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_ref().map(|r| r.canonical.as_path())
    }

    /// Validate a raw path string.
    ///
    /// The sentinel `/` always resolves to [`ResolvedPath::Root`]. Any other
    /// input is normalized, checked against the permitted root, stat'ed, and
    /// returned in canonical form. The path itself is never opened.
    pub fn validate(&self, raw: &str) -> Result<ResolvedPath, ExplorerError> {
        if raw.trim().is_empty() {
            return Err(ExplorerError::InvalidPath("path is empty".to_string()));
        }
        if raw.contains('\0') {
            return Err(ExplorerError::InvalidPath(
                "path contains a NUL byte".to_string(),
            ));
        }
        if raw == ROOT_PATH {
            return Ok(ResolvedPath::Root);
        }

        let absolute = self.normalize(raw)?;

        // Lexical check first so escapes are rejected without touching disk.
        if let Some(root) = &self.root {
            if !absolute.starts_with(&root.lexical) && !absolute.starts_with(&root.canonical) {
                return Err(ExplorerError::Forbidden(absolute));
            }
        }

        fs::metadata(&absolute).map_err(|e| stat_error(e, &absolute))?;
        let canonical = dunce::canonicalize(&absolute).map_err(|e| stat_error(e, &absolute))?;

        if let Some(root) = &self.root {
            if !canonical.starts_with(&root.canonical) {
                return Err(ExplorerError::Forbidden(absolute));
            }
        }

        Ok(ResolvedPath::Entry(canonical))
    }

    /// Normalize separators and resolve `.` and `..` into an absolute path.
    fn normalize(&self, raw: &str) -> Result<PathBuf, ExplorerError> {
        let raw = if cfg!(windows) {
            raw.replace('/', "\\")
        } else {
            raw.to_string()
        };
        let candidate = Path::new(&raw);

        let absolute = match &self.root {
            Some(root) if !candidate.is_absolute() => candidate.absolutize_from(&root.lexical),
            _ => candidate.absolutize(),
        };

        absolute
            .map(|p| p.into_owned())
            .map_err(ExplorerError::Io)
    }
}

/// Map a stat failure to an explorer error.
///
/// A path component that is a regular file means the path does not exist.
fn stat_error(err: io::Error, path: &Path) -> ExplorerError {
    match err.kind() {
        io::ErrorKind::NotADirectory => ExplorerError::NotFound(path.to_path_buf()),
        _ => ExplorerError::from_io(err, path),
    }
}
