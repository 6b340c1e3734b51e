//! Moonwalk HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use moonwalk::config::Config;
use moonwalk::embedding::{ClipConfig, ClipExtractor, select_device};
use moonwalk::gateway::{AppState, create_router_with_state};
use moonwalk::grounding::GroundingNet;
use moonwalk::service::{MomentService, ServiceSettings};
use moonwalk::storage::EmbeddingStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> anyhow::Result<()> {
    println!(
        r#"
  __  __  ___   ___  _  ___        ___   _    _  __
 |  \/  |/ _ \ / _ \| \| \ \      / /_\ | |  | |/ /
 | |\/| | (_) | (_) | .` |\ \/\/ / _ \| |__| ' <
 |_|  |_|\___/ \___/|_|\_| \_/\_/_/ \_\____|_|\_\

        FIND THE MOMENT.
"#
    );

    // The probe builds its own runtime, so it must run before the server's.
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }
    let extract_only = std::env::args().any(|arg| arg == "--extract");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(extract_only))
}

async fn run(extract_only: bool) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        clip_len = config.clip_len,
        "Moonwalk starting"
    );

    let checkpoint = config.resolve_checkpoint()?;
    let device = select_device(config.device_index)?;
    let model = GroundingNet::load(&checkpoint, &device)?;

    if config.extractor_is_stub() {
        tracing::warn!("No MOONWALK_CLIP_MODEL_PATH configured, running extractor in stub mode");
    }
    let extractor = ClipExtractor::load(ClipConfig::from_config(&config))?;

    let store = EmbeddingStore::new(config.embeddings_dir.clone());
    store.ensure_root()?;

    let service = Arc::new(MomentService::new(
        Arc::new(extractor),
        Arc::new(model),
        store,
        ServiceSettings::from_config(&config, Some(checkpoint)),
    ));

    if extract_only {
        let (path, status) = service.extract_from_dir().await?;
        tracing::info!(
            video = %path.display(),
            clips = status.clips,
            duration_secs = status.duration_secs,
            "Extraction complete"
        );
        return Ok(());
    }

    match service.restore_video().await? {
        Some(status) => tracing::info!(clips = status.clips, "Serving persisted video"),
        None => tracing::info!("No video loaded yet; upload one via /api/extract-video"),
    }

    let app = create_router_with_state(AppState::new(service, config.max_upload_bytes));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Moonwalk shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var(Config::ENV_PORT)
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(Config::default().port);

    let url = format!("http://127.0.0.1:{}/api/health", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
