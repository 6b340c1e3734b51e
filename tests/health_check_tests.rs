//! The `--health-check` mode of the server binary.

mod common;

use std::process::Output;

use common::harness::{TestServerConfig, spawn_test_server};
use tokio::process::Command;

async fn run_health_check(port: u16) -> Output {
    Command::new(env!("CARGO_BIN_EXE_moonwalk"))
        .arg("--health-check")
        .env("MOONWALK_PORT", port.to_string())
        .output()
        .await
        .expect("run moonwalk binary")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_check_succeeds_against_live_server() {
    let server = spawn_test_server(TestServerConfig::default()).await.unwrap();

    let output = run_health_check(server.addr.port()).await;
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_health_check_fails_without_server() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let output = run_health_check(port).await;
    assert_eq!(
        output.status.code(),
        Some(1),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
