//! End-to-end integration tests for RemoFS.
//!
//! These tests verify complete flows work correctly:
//! - Daemon startup and shutdown
//! - Root (device and drive) listings
//! - Directory listings with query options
//! - Error status mapping over HTTP

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use daemon::config::Config;
use daemon::orchestrator::{DaemonOrchestrator, OrchestratorState};
use remofs_protocol::{DirectoryListing, ErrorBody, ErrorCode, RootListing};
use reqwest::StatusCode;
use tempfile::TempDir;

/// Create a test configuration confined to `root`, on an ephemeral port.
fn create_test_config(root: Option<&Path>) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.explorer.root = root.map(Path::to_path_buf);
    config.explorer.stat_timeout_ms = 5000;
    config
}

/// Populate a directory with the fixture used throughout these tests.
fn create_fixture(dir: &Path) {
    fs::create_dir(dir.join("B")).unwrap();
    fs::create_dir(dir.join("a")).unwrap();
    fs::write(dir.join("B/inner.txt"), "inner").unwrap();
    fs::write(dir.join("photo.jpg"), vec![0u8; 100]).unwrap();
    fs::write(dir.join("notes.txt"), vec![0u8; 10]).unwrap();
    fs::write(dir.join(".secret"), "s").unwrap();
}

async fn start_daemon(config: Config) -> (DaemonOrchestrator, SocketAddr) {
    let mut orchestrator = DaemonOrchestrator::new(config).unwrap();
    orchestrator.start().await.unwrap();
    let addr = orchestrator.local_addr().unwrap();
    (orchestrator, addr)
}

async fn get_items(addr: SocketAddr, query: &[(&str, &str)]) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("http://{}/api/items", addr))
        .query(query)
        .send()
        .await
        .unwrap()
}

async fn list_dir(addr: SocketAddr, query: &[(&str, &str)]) -> DirectoryListing {
    let response = get_items(addr, query).await;
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.unwrap()
}

async fn expect_error(addr: SocketAddr, query: &[(&str, &str)], status: StatusCode, code: ErrorCode) {
    let response = get_items(addr, query).await;
    assert_eq!(response.status(), status);
    let body: ErrorBody = response.json().await.unwrap();
    assert_eq!(body.error, code);
    assert_eq!(body.code, status.as_u16());
    assert!(!body.message.is_empty());
}

fn names(entries: &[remofs_protocol::EntryInfo]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

// =============================================================================
// Orchestrator Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_orchestrator_state_starts_stopped() {
    let orchestrator = DaemonOrchestrator::new(create_test_config(None)).unwrap();
    assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (orchestrator, addr) = start_daemon(create_test_config(None)).await;

    let response = reqwest::get(format!("http://{}/api/health", addr)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    orchestrator.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_listener() {
    let (orchestrator, addr) = start_daemon(create_test_config(None)).await;
    orchestrator.stop().await.unwrap();
    assert_eq!(orchestrator.state().await, OrchestratorState::Stopped);

    let result = reqwest::get(format!("http://{}/api/health", addr)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_restart_serves_requests() {
    let temp_dir = TempDir::new().unwrap();
    create_fixture(temp_dir.path());
    let (mut orchestrator, _) = start_daemon(create_test_config(Some(temp_dir.path()))).await;
    orchestrator.stop().await.unwrap();

    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.state().await, OrchestratorState::Running);
    let addr = orchestrator.local_addr().unwrap();

    let response = reqwest::get(format!("http://{}/api/health", addr)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let listing = list_dir(addr, &[("path", "B")]).await;
    assert_eq!(names(&listing.files), vec!["inner.txt"]);

    orchestrator.stop().await.unwrap();
    assert!(reqwest::get(format!("http://{}/api/health", addr)).await.is_err());
}

// =============================================================================
// Root Listing Tests
// =============================================================================

#[tokio::test]
async fn test_root_listing_without_permitted_root() {
    let (orchestrator, addr) = start_daemon(create_test_config(None)).await;

    let response = get_items(addr, &[("path", "/")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let root: RootListing = response.json().await.unwrap();

    assert!(!root.device.platform.is_empty());
    assert!(root.device.free_space <= root.device.total_space);
    let mounts: Vec<&str> = root.drives.iter().map(|d| d.mount_point.as_str()).collect();
    let mut sorted = mounts.clone();
    sorted.sort_by(|a, b| Path::new(a).cmp(Path::new(b)));
    assert_eq!(mounts, sorted);

    orchestrator.stop().await.unwrap();
}

#[tokio::test]
async fn test_root_listing_with_permitted_root() {
    let temp_dir = TempDir::new().unwrap();
    let share = temp_dir.path().join("share");
    fs::create_dir(&share).unwrap();
    let (orchestrator, addr) = start_daemon(create_test_config(Some(&share))).await;

    let root: RootListing = get_items(addr, &[("path", "/")]).await.json().await.unwrap();
    assert_eq!(root.drives.len(), 1);
    assert_eq!(root.drives[0].label.as_deref(), Some("share"));

    orchestrator.stop().await.unwrap();
}

// =============================================================================
// Directory Listing Tests
// =============================================================================

#[tokio::test]
async fn test_directory_listing_defaults() {
    let temp_dir = TempDir::new().unwrap();
    create_fixture(temp_dir.path());
    let (orchestrator, addr) = start_daemon(create_test_config(Some(temp_dir.path()))).await;
    let path = temp_dir.path().to_str().unwrap();

    let listing = list_dir(addr, &[("path", path)]).await;
    assert_eq!(names(&listing.folders), vec!["a", "B"]);
    assert_eq!(names(&listing.files), vec!["notes.txt", "photo.jpg"]);
    assert_eq!(listing.files[1].size, 100);
    assert!(listing.folders.iter().all(|e| e.size == 0));
    assert!(listing.folders.iter().all(|e| e.children.is_none()));

    orchestrator.stop().await.unwrap();
}

#[tokio::test]
async fn test_directory_listing_options() {
    let temp_dir = TempDir::new().unwrap();
    create_fixture(temp_dir.path());
    let (orchestrator, addr) = start_daemon(create_test_config(Some(temp_dir.path()))).await;
    let path = temp_dir.path().to_str().unwrap();

    let listing = list_dir(addr, &[("path", path), ("show_hidden", "true")]).await;
    if cfg!(unix) {
        assert_eq!(names(&listing.files), vec![".secret", "notes.txt", "photo.jpg"]);
    }

    let listing = list_dir(
        addr,
        &[("path", path), ("sort_by", "size"), ("reverse", "1")],
    )
    .await;
    assert_eq!(names(&listing.files), vec!["photo.jpg", "notes.txt"]);
    assert_eq!(names(&listing.folders), vec!["B", "a"]);

    let listing = list_dir(addr, &[("path", path), ("search", "PHO")]).await;
    assert!(listing.folders.is_empty());
    assert_eq!(names(&listing.files), vec!["photo.jpg"]);

    let listing = list_dir(addr, &[("path", path), ("count_children", "on")]).await;
    let b = listing.folders.iter().find(|e| e.name == "B").unwrap();
    assert_eq!(b.children.map(|c| (c.folders, c.files)), Some((0, 1)));

    orchestrator.stop().await.unwrap();
}

#[tokio::test]
async fn test_relative_path_resolves_against_root() {
    let temp_dir = TempDir::new().unwrap();
    create_fixture(temp_dir.path());
    let (orchestrator, addr) = start_daemon(create_test_config(Some(temp_dir.path()))).await;

    let listing = list_dir(addr, &[("path", "B")]).await;
    assert_eq!(names(&listing.files), vec!["inner.txt"]);

    orchestrator.stop().await.unwrap();
}

#[tokio::test]
async fn test_listing_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    create_fixture(temp_dir.path());
    let (orchestrator, addr) = start_daemon(create_test_config(Some(temp_dir.path()))).await;
    let path = temp_dir.path().to_str().unwrap();

    let first = list_dir(addr, &[("path", path), ("sort_by", "modified")]).await;
    let second = list_dir(addr, &[("path", path), ("sort_by", "modified")]).await;
    assert_eq!(first, second);

    orchestrator.stop().await.unwrap();
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[tokio::test]
async fn test_error_statuses() {
    let temp_dir = TempDir::new().unwrap();
    let share = temp_dir.path().join("share");
    fs::create_dir(&share).unwrap();
    create_fixture(&share);
    fs::write(temp_dir.path().join("outside.txt"), "x").unwrap();
    let (orchestrator, addr) = start_daemon(create_test_config(Some(&share))).await;

    expect_error(addr, &[("path", "")], StatusCode::BAD_REQUEST, ErrorCode::InvalidPath).await;
    expect_error(addr, &[], StatusCode::BAD_REQUEST, ErrorCode::InvalidPath).await;

    let missing = share.join("missing");
    expect_error(
        addr,
        &[("path", missing.to_str().unwrap())],
        StatusCode::NOT_FOUND,
        ErrorCode::NotFound,
    )
    .await;

    let outside = temp_dir.path().join("outside.txt");
    expect_error(
        addr,
        &[("path", outside.to_str().unwrap())],
        StatusCode::FORBIDDEN,
        ErrorCode::Forbidden,
    )
    .await;
    expect_error(addr, &[("path", "../outside.txt")], StatusCode::FORBIDDEN, ErrorCode::Forbidden)
        .await;

    let file = share.join("photo.jpg");
    expect_error(
        addr,
        &[("path", file.to_str().unwrap())],
        StatusCode::BAD_REQUEST,
        ErrorCode::NotADirectory,
    )
    .await;

    let path = share.to_str().unwrap();
    expect_error(
        addr,
        &[("path", path), ("sort_by", "colour")],
        StatusCode::BAD_REQUEST,
        ErrorCode::InvalidQuery,
    )
    .await;
    expect_error(
        addr,
        &[("path", path), ("show_hidden", "perhaps")],
        StatusCode::BAD_REQUEST,
        ErrorCode::InvalidQuery,
    )
    .await;

    orchestrator.stop().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_directory_is_access_denied() {
    use std::os::unix::fs::PermissionsExt;

    // Permission bits do not apply to root.
    if nix::unistd::geteuid().is_root() {
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    create_fixture(temp_dir.path());
    let locked = temp_dir.path().join("B");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let (orchestrator, addr) = start_daemon(create_test_config(Some(temp_dir.path()))).await;

    let listing_status = get_items(addr, &[("path", "B")]).await.status();
    let body: ErrorBody = get_items(addr, &[("path", "B")]).await.json().await.unwrap();
    let parent = list_dir(
        addr,
        &[("path", temp_dir.path().to_str().unwrap()), ("count_children", "true")],
    )
    .await;

    orchestrator.stop().await.unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(listing_status, StatusCode::FORBIDDEN);
    assert_eq!(body.error, ErrorCode::AccessDenied);
    assert_eq!(names(&parent.folders), vec!["a", "B"]);
    let b = parent.folders.iter().find(|e| e.name == "B").unwrap();
    assert!(b.children.is_none());
}

#[tokio::test]
async fn test_nonexistent_path_without_root() {
    let (orchestrator, addr) = start_daemon(create_test_config(None)).await;

    expect_error(
        addr,
        &[("path", "/nonexistent/xyz")],
        StatusCode::NOT_FOUND,
        ErrorCode::NotFound,
    )
    .await;

    orchestrator.stop().await.unwrap();
}
