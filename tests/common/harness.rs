//! Test server harness.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use moonwalk::config::SelectionPolicy;
use moonwalk::constants::UPLOAD_FILENAME;
use moonwalk::gateway::{AppState, create_router_with_state};
use moonwalk::grounding::MockGroundingModel;
use moonwalk::service::{MomentService, ServiceSettings};
use moonwalk::storage::EmbeddingStore;

use super::recording::{EventLog, RecordingExtractor, RecordingModel};

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;
const TEST_EMBEDDING_DIM: usize = 32;
const TEST_MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub clips: usize,
    pub embed_delay: Duration,
    pub persist_text: bool,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            clips: 12,
            embed_delay: Duration::ZERO,
            persist_text: true,
        }
    }
}

/// A service wired to the recording extractor and model.
pub struct TestService {
    pub service: Arc<MomentService>,
    pub log: EventLog,
    pub root: PathBuf,
    _temp_dir: TempDir,
}

impl TestService {
    /// Writes a placeholder video under the footage directory.
    pub fn write_video(&self, name: &str) -> PathBuf {
        let dir = self.service.settings().video_dir.clone();
        std::fs::create_dir_all(&dir).expect("create footage dir");
        let path = dir.join(name);
        std::fs::write(&path, name.as_bytes()).expect("write video");
        path
    }
}

pub fn build_test_service(config: &TestServerConfig) -> TestService {
    let temp_dir = TempDir::new().expect("create temp dir");
    let root = temp_dir.path().to_path_buf();
    let log = EventLog::default();

    let extractor = RecordingExtractor {
        log: log.clone(),
        dim: TEST_EMBEDDING_DIM,
        clips: config.clips,
        embed_delay: config.embed_delay,
    };
    let model = RecordingModel {
        log: log.clone(),
        inner: MockGroundingModel::new(TEST_EMBEDDING_DIM),
    };

    let embeddings = root.join("embeddings");
    let settings = ServiceSettings {
        clip_len: 2.0,
        video_dir: root.join("footages"),
        video_extensions: vec!["mp4".to_string()],
        selection_policy: SelectionPolicy::FirstSorted,
        persist_text: config.persist_text,
        upload_path: embeddings.join(UPLOAD_FILENAME),
        checkpoint: None,
    };

    let service = Arc::new(MomentService::new(
        Arc::new(extractor),
        Arc::new(model),
        EmbeddingStore::new(embeddings),
        settings,
    ));

    TestService {
        service,
        log,
        root,
        _temp_dir: temp_dir,
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub inner: TestService,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => tokio::time::sleep(interval).await,
        }
    }
}

/// Spawns a server on an ephemeral port backed by the recording extractor
/// and mock grounding model. No model files or ffmpeg are needed.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let local_addr = listener.local_addr()?;

    let inner = build_test_service(&config);
    let app = create_router_with_state(AppState::new(
        inner.service.clone(),
        TEST_MAX_UPLOAD_BYTES,
    ));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        inner,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
