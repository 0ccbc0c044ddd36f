//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use media_store::DEFAULT_FOLDER;

/// Where uploaded audio is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaBackend {
    /// Files under a local directory, served back under `/media`.
    Disk { dir: PathBuf, public_url: String },
    /// A remote object storage gateway.
    Http { url: String, token: Option<String> },
}

/// Chat server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Key used to verify session tokens.
    pub session_secret: String,
    pub media: MediaBackend,
    /// Object key folder for audio uploads.
    pub media_folder: String,
    /// Request body limit for message uploads.
    pub max_upload_bytes: usize,
    /// WebSocket keepalive interval.
    pub ws_ping: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `CHAT_ADDR` | Server bind address | `127.0.0.1:5000` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:chat.db?mode=rwc` |
    /// | `SESSION_SECRET` | Session token key | (required) |
    /// | `MEDIA_BACKEND` | `disk` or `http` | `disk` |
    /// | `MEDIA_DIR` | Upload directory (disk) | `uploads` |
    /// | `MEDIA_PUBLIC_URL` | Public base URL (disk) | `/media` |
    /// | `MEDIA_GATEWAY_URL` | Gateway base URL (http) | (required for http) |
    /// | `MEDIA_GATEWAY_TOKEN` | Gateway bearer token | (none) |
    /// | `MEDIA_FOLDER` | Object key folder | `chat_audios` |
    /// | `MAX_UPLOAD_BYTES` | Upload body limit | `10485760` |
    /// | `WS_PING_SECS` | WebSocket ping interval | `30` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = var("CHAT_ADDR")
            .unwrap_or_else(|| "127.0.0.1:5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = var("SQLITE_PATH").unwrap_or_else(|| "sqlite:chat.db?mode=rwc".to_string());

        let session_secret = var("SESSION_SECRET").ok_or(ConfigError::MissingSessionSecret)?;

        let backend = var("MEDIA_BACKEND").unwrap_or_else(|| "disk".to_string());
        let media = match backend.to_ascii_lowercase().as_str() {
            "disk" => MediaBackend::Disk {
                dir: PathBuf::from(var("MEDIA_DIR").unwrap_or_else(|| "uploads".to_string())),
                public_url: var("MEDIA_PUBLIC_URL").unwrap_or_else(|| "/media".to_string()),
            },
            "http" => MediaBackend::Http {
                url: var("MEDIA_GATEWAY_URL").ok_or(ConfigError::MissingGatewayUrl)?,
                token: var("MEDIA_GATEWAY_TOKEN"),
            },
            _ => return Err(ConfigError::InvalidMediaBackend(backend)),
        };

        let media_folder = var("MEDIA_FOLDER").unwrap_or_else(|| DEFAULT_FOLDER.to_string());

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber("MAX_UPLOAD_BYTES"))?,
            None => 10 * 1024 * 1024,
        };

        let ws_ping_secs: u64 = match var("WS_PING_SECS") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber("WS_PING_SECS"))?,
            None => 30,
        };

        Ok(Self {
            addr,
            database_url,
            session_secret,
            media,
            media_folder,
            max_upload_bytes,
            ws_ping: Duration::from_secs(ws_ping_secs.max(1)),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid CHAT_ADDR format")]
    InvalidAddr,

    #[error("SESSION_SECRET environment variable is required")]
    MissingSessionSecret,

    #[error("Unknown MEDIA_BACKEND '{0}' (expected 'disk' or 'http')")]
    InvalidMediaBackend(String),

    #[error("MEDIA_GATEWAY_URL is required when MEDIA_BACKEND=http")]
    MissingGatewayUrl,

    #[error("{0} must be a positive integer")]
    InvalidNumber(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("SESSION_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:5000");
        assert_eq!(config.database_url, "sqlite:chat.db?mode=rwc");
        assert_eq!(config.media_folder, "chat_audios");
        assert_eq!(config.max_upload_bytes, 10_485_760);
        assert_eq!(config.ws_ping, Duration::from_secs(30));
        assert_eq!(
            config.media,
            MediaBackend::Disk {
                dir: PathBuf::from("uploads"),
                public_url: "/media".to_string()
            }
        );
    }

    #[test]
    fn test_secret_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingSessionSecret)));
        assert!(matches!(
            load(&[("SESSION_SECRET", "  ")]),
            Err(ConfigError::MissingSessionSecret)
        ));
    }

    #[test]
    fn test_http_backend() {
        let config = load(&[
            ("SESSION_SECRET", "x"),
            ("MEDIA_BACKEND", "HTTP"),
            ("MEDIA_GATEWAY_URL", "https://media.internal"),
            ("MEDIA_GATEWAY_TOKEN", "tok"),
        ])
        .unwrap();
        assert_eq!(
            config.media,
            MediaBackend::Http {
                url: "https://media.internal".to_string(),
                token: Some("tok".to_string())
            }
        );

        let err = load(&[("SESSION_SECRET", "x"), ("MEDIA_BACKEND", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingGatewayUrl));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("SESSION_SECRET", "x"), ("CHAT_ADDR", "nope")]),
            Err(ConfigError::InvalidAddr)
        ));
        assert!(matches!(
            load(&[("SESSION_SECRET", "x"), ("MEDIA_BACKEND", "s3")]),
            Err(ConfigError::InvalidMediaBackend(_))
        ));
        assert!(matches!(
            load(&[("SESSION_SECRET", "x"), ("WS_PING_SECS", "-1")]),
            Err(ConfigError::InvalidNumber("WS_PING_SECS"))
        ));
    }
}
