//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use fsinstall::build::{BuildTool, CustomCommand};
use fsinstall::config::Config;
use fsinstall::workflow::FailurePolicy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const SCRIPT: &str = "#!/bin/sh\necho fileshare\n";

/// Serve `body` with status 200 to every connection; returns the file URL
pub async fn serve_script(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}/fileshare.py", addr)
}

/// A URL on a port nothing listens on
pub fn unreachable_url() -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{}/fileshare.py", port)
}

/// A packager stand-in that leaves PyInstaller-like byproducts behind
pub fn fake_packager() -> CustomCommand {
    CustomCommand {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            "mkdir -p build/{name} && touch {name}.spec && cp {source} {out_dir}/{name}".to_string(),
        ],
    }
}

pub fn destinations(root: &Path) -> Vec<PathBuf> {
    vec![
        root.join("usr/bin"),
        root.join("usr/local/bin"),
        root.join("usr/share/fileshare"),
    ]
}

/// Config rooted entirely inside `root`
pub fn test_config(root: &Path, url: String, policy: FailurePolicy) -> Config {
    let mut config = Config::default();
    config.source.url = url;
    config.work_dir = root.join("FileShare");
    config.destinations = destinations(root);
    config.build.tool = BuildTool::Command;
    config.build.command = Some(fake_packager());
    config.fetch.timeout_ms = 5_000;
    config.failure_policy = policy;
    config
}
