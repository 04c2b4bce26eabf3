//! # RemoFS Daemon Library
//!
//! This crate provides the daemon (server) functionality for RemoFS, a
//! read-only view of the host machine's filesystem over HTTP.
//!
//! ## Overview
//!
//! The daemon runs on the machine whose files you want to browse. It provides:
//!
//! - **Path Validation**: Normalize client paths and confine them to an
//!   optional permitted root
//! - **Device Summary**: Host name, platform and system volume capacity
//! - **Drive Enumeration**: Mounted volumes with per-volume capacity
//! - **Directory Listing**: Folders and files with search, sorting and
//!   hidden-entry filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Daemon Orchestrator                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │             HTTP Router (GET /api/items)                   │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                       Explorer                             │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌─────────────┐  │
//! │  │   Path     │ │   Device   │ │   Drive    │ │  Directory  │  │
//! │  │ Validator  │ │    Info    │ │ Enumerator │ │   Browser   │  │
//! │  └────────────┘ └────────────┘ └────────────┘ └─────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::{Config, DaemonOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!
//!     let mut orchestrator = DaemonOrchestrator::new(config)?;
//!     orchestrator.start().await?;
//!
//!     // The daemon is now serving requests
//!     // Wait for shutdown signal...
//!
//!     orchestrator.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Path validation, device and drive discovery, directory listing
//! - [`explorer`]: Request-level dispatch over the `files` components
//! - [`router`]: HTTP routes
//! - [`orchestrator`]: Main daemon coordinator

pub mod config;
pub mod explorer;
pub mod files;
pub mod orchestrator;
pub mod router;

// Re-export protocol for convenience
pub use remofs_protocol as protocol;

// Re-export config types for convenience
pub use config::{Config, ConfigError};

// Re-export files types for convenience
pub use files::{
    DirectoryBrowser, DirectoryEntry, DriveEnumerator, ExplorerError, MountPoint, MountSource,
    PathValidator, ResolvedPath,
};

pub use explorer::Explorer;

// Re-export router types for convenience
pub use router::{build_router, RouterError};

// Re-export orchestrator types for convenience
pub use orchestrator::{DaemonOrchestrator, OrchestratorEvent, OrchestratorState};
