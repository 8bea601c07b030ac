use blob_upload_debug::client::blob::DEFAULT_URL_BLOB_NAME;
use blob_upload_debug::client::{
    CaptureSource, ClientError, Recorder, StreamDevice, UploadClient, UploadSession,
};
use blob_upload_debug::config::ClientConfig;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sends blobs to the upload receiver and reports what happened", long_about = None)]
struct Args {
    /// Receiver host (overrides SERVER_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Receiver port (overrides SERVER_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the receiver is up
    Health,
    /// Upload a local file
    Upload { path: PathBuf },
    /// Fetch a URL into memory and upload it
    UploadUrl {
        url: String,
        /// Filename to upload the fetched blob as
        #[arg(long, default_value = DEFAULT_URL_BLOB_NAME)]
        name: String,
    },
    /// Record from a capture source, then upload the recording
    Record {
        /// File or pipe to capture from; `-` reads stdin
        #[arg(long, default_value = "-")]
        input: String,
        /// Media type of the captured stream
        #[arg(long, default_value = "video/webm")]
        mime: String,
        /// Stop after this many seconds even if the source is still open
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blob_probe=info,blob_upload_debug=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ClientConfig::from_env();
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    let client = UploadClient::new(&config)?;
    info!("🐛 Blob upload probe targeting {}", client.base_url());

    let outcome = match args.command {
        Command::Health => match client.health().await {
            Ok(health) => {
                println!("✅ Server Status: {}", health.status);
                println!("📅 Timestamp: {}", health.timestamp);
                println!("💬 Message: {}", health.message);
                Ok(())
            }
            Err(e) => {
                println!("❌ Health Check Failed: {}", e);
                println!("Make sure the server is running on {}", client.base_url());
                Err(e)
            }
        },
        Command::Upload { path } => {
            let mut session = UploadSession::new(client);
            let selected = session.select_path(&path).await;
            upload_selected(&mut session, selected).await
        }
        Command::UploadUrl { url, name } => {
            let mut session = UploadSession::new(client);
            let selected = session.select_url(&url, &name).await;
            upload_selected(&mut session, selected).await
        }
        Command::Record {
            input,
            mime,
            seconds,
        } => {
            let source = if input == "-" {
                CaptureSource::Stdin
            } else {
                CaptureSource::Path(PathBuf::from(input))
            };
            let mut recorder = Recorder::new(StreamDevice::new(source, mime));
            let mut session = UploadSession::new(client);
            let result = session
                .record_and_upload(&mut recorder, seconds.map(Duration::from_secs))
                .await;
            println!("{}", session.state());
            result.map(|_| ())
        }
    };

    if let Err(e) = outcome {
        error!("Probe finished with a {} error", e.category());
        std::process::exit(1);
    }
    Ok(())
}

/// Show the selection, upload it, show the result.
async fn upload_selected(
    session: &mut UploadSession,
    selected: Result<(), ClientError>,
) -> Result<(), ClientError> {
    println!("{}", session.state());
    selected?;

    let result = session.upload().await;
    println!("{}", session.state());
    result.map(|_| ())
}
