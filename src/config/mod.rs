use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Largest accepted file part (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

/// Headroom on top of the file limit for multipart boundaries and headers.
pub const MULTIPART_OVERHEAD: usize = 10 * 1024 * 1024;

/// Receiver configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: "0.0.0.0")
    pub host: String,

    /// Bind port (default: 3000)
    pub port: u16,

    /// Directory that receives uploaded files (default: "uploads")
    pub upload_dir: PathBuf,

    /// Maximum file part size in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// Allowed CORS origins. Empty reflects the caller's origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(default.host),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| parse_origins(&v))
                .unwrap_or(default.allowed_origins),
        }
    }

    /// Config rooted at a scratch directory, bound to loopback
    pub fn development(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            upload_dir: upload_dir.into(),
            ..Self::default()
        }
    }

    /// Request body ceiling enforced by the framework
    pub fn body_limit(&self) -> usize {
        self.max_file_size.saturating_add(MULTIPART_OVERHEAD)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Client harness configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Receiver host (default: "localhost")
    pub server_host: String,

    /// Receiver port (default: 3000)
    pub server_port: u16,

    /// Whole-request timeout (default: 30 s)
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            server_port: 3000,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            server_host: env::var("SERVER_HOST").unwrap_or(default.server_host),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.server_port),
            timeout: env::var("UPLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.timeout),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
