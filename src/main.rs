use clap::Parser;
use dotenvy::dotenv;
use face_swap_api::config::{SwapBackend, SwapConfig};
use face_swap_api::infrastructure::{scratch, swapper};
use face_swap_api::services::sweeper::ScratchSweeper;
use face_swap_api::{AppState, create_app};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about = "HTTP API for FaceFusion face swapping")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Swap backend, overrides SWAP_BACKEND (process | library)
    #[arg(long)]
    backend: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "face_swap_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Face Swap API...");

    let mut config = SwapConfig::from_env();
    if let Some(backend) = args.backend.as_deref() {
        let backend = SwapBackend::parse(backend)
            .ok_or_else(|| anyhow::anyhow!("Unknown backend '{}'", backend))?;
        config.set_backend(backend);
    }
    info!(
        "🛠️  Config: Backend={}, Model={}, Selector={}, Max Body={}MB",
        config.backend.as_str(),
        config.default_model,
        config.default_selector_mode,
        config.max_body_size / 1024 / 1024
    );

    // Setup Infrastructure
    let scratch_dir = scratch::setup_scratch(&config).await?;
    let swapper_service = swapper::setup_swapper(&config).await?;

    // Setup Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Start Scratch Sweeper
    let sweeper = ScratchSweeper::new(
        scratch_dir.clone(),
        config.scratch_max_age,
        config.scratch_sweep_interval,
        shutdown_rx,
    );
    tokio::spawn(async move {
        sweeper.run().await;
    });

    let state = AppState {
        swapper: swapper_service,
        scratch: scratch_dir,
        config,
    };

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
