//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use gothere::lifecycle::{self, CoordinatorError, LifecycleHandle, LifecycleState};
use gothere::ServerConfig;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A running service bound to an ephemeral localhost port.
pub struct TestService {
    pub handle: LifecycleHandle,
    pub task: JoinHandle<Result<(), CoordinatorError>>,
    pub mappings: PathBuf,
    _dir: TempDir,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.local_addr(), path)
    }

    /// Replace the mapping file contents.
    pub fn write_mappings(&self, lines: &[&str]) {
        write_lines(&self.mappings, lines);
    }

    /// Trigger shutdown and wait for the coordinator to finish.
    pub async fn stop(self) {
        self.handle.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("coordinator did not stop")
            .unwrap()
            .unwrap();
    }
}

pub fn write_lines(path: &Path, lines: &[&str]) {
    let mut content = lines.join("\n");
    content.push('\n');
    std::fs::write(path, content).unwrap();
}

/// Start the service with `lines` as its mapping file.
pub async fn start_service(lines: &[&str], default_url: &str) -> TestService {
    start_service_with(lines, default_url, |_| {}).await
}

/// Like [`start_service`], with a chance to adjust the configuration first.
pub async fn start_service_with<F>(lines: &[&str], default_url: &str, configure: F) -> TestService
where
    F: FnOnce(&mut ServerConfig),
{
    let dir = tempfile::tempdir().unwrap();
    let mappings = dir.path().join("urls.txt");
    write_lines(&mappings, lines);

    let mut config = ServerConfig::default();
    config.listener.bind = "127.0.0.1".parse().unwrap();
    config.listener.port = 0;
    config.mappings_path = mappings.clone();
    config.default_url = default_url.to_string();
    config.timeouts.shutdown_grace_secs = 5;
    configure(&mut config);

    let coordinator = lifecycle::start(config).await.unwrap();
    let handle = coordinator.handle();
    let task = tokio::spawn(coordinator.run());
    handle.wait_for(LifecycleState::Running).await;

    TestService {
        handle,
        task,
        mappings,
        _dir: dir,
    }
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// `Location` header of a response, if any.
pub fn location(res: &reqwest::Response) -> Option<String> {
    res.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
