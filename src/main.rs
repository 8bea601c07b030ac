use blob_upload_debug::config::ServerConfig;
use blob_upload_debug::{AppState, create_app};
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Receives multipart blob uploads and writes them to disk", long_about = None)]
struct Args {
    /// Port for the upload receiver (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Directory for stored uploads (overrides UPLOAD_DIR)
    #[arg(short, long)]
    upload_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blob_upload_debug=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(dir) = args.upload_dir {
        config.upload_dir = dir;
    }

    info!("🚀 Starting blob upload receiver...");
    info!(
        "📁 Upload dir: {}, Max Size={}MB, CORS origins: {}",
        config.upload_dir.display(),
        config.max_file_size / 1024 / 1024,
        if config.allowed_origins.is_empty() {
            "any".to_string()
        } else {
            config.allowed_origins.join(", ")
        }
    );

    let state = AppState::new(config.clone());
    state.storage.ensure_ready().await?;

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let addr = listener.local_addr()?;

    info!("✅ Server running on http://{}", addr);
    info!("📊 Health check: http://{}/health", addr);
    info!("📤 Upload endpoint: http://{}/upload", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
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
