//! Shared fixtures for lifecycle tests.

use std::fs;
use std::path::Path;

use rstest::fixture;
use tempfile::TempDir;
use weaver_config::{Config, RuntimePaths, SocketEndpoint};

/// Creates a temporary runtime directory with a fresh `RuntimePaths`.
#[fixture]
pub(crate) fn temp_paths() -> (TempDir, RuntimePaths) {
    let dir = TempDir::new().expect("temp dir");
    let socket = dir.path().join("daemon.sock").to_string_lossy().into_owned();
    let config = Config {
        daemon_socket: SocketEndpoint::unix(socket),
        ..Config::default()
    };
    let paths = RuntimePaths::from_config(&config).expect("paths");
    (dir, paths)
}

/// Writes a health snapshot JSON file to the specified path.
pub(crate) fn write_health_json(path: &Path, status: &str, pid: u32, timestamp: u64) {
    let snapshot = serde_json::json!({
        "status": status,
        "pid": pid,
        "timestamp": timestamp,
    });
    let json = serde_json::to_string(&snapshot).expect("serialize health snapshot");
    fs::write(path, json).expect("write health snapshot");
}
