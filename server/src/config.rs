//! Application configuration
//!
//! Constants for defaults and limits, plus the `AppConfig` tree loaded at
//! startup from a JSON file and a handful of environment overrides.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

// ===== Environment =====

/// Path of the JSON configuration file
pub const CONFIG_PATH_ENV: &str = "FORM_UPLOADER_CONFIG";
/// Overrides `storage.backend` with an Azure connection string
pub const CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const HOST_ENV: &str = "FORM_UPLOADER_HOST";
pub const PORT_ENV: &str = "FORM_UPLOADER_PORT";

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

// ===== Server =====

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Largest accepted request body (10 MiB).
/// Avatars are buffered in memory before upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Front-end dev server allowed by default
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Route under which the local backend's blobs are served
pub const LOCAL_BLOB_ROUTE: &str = "/blobs";

// ===== Storage =====

pub const DEFAULT_IMAGE_CONTAINER: &str = "images";
pub const DEFAULT_JSON_CONTAINER: &str = "forms";
pub const DEFAULT_CONNECTION_STRING: &str = "UseDevelopmentStorage=true";

/// Container name length limits imposed by Azure
pub const MIN_CONTAINER_NAME_LEN: usize = 3;
pub const MAX_CONTAINER_NAME_LEN: usize = 63;

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Directory of static files served for unmatched routes
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_cors_origins() -> Vec<String> {
    vec![DEFAULT_CORS_ORIGIN.to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_origins: default_cors_origins(),
            static_dir: None,
        }
    }
}

/// Where blobs are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Azure {
        connection_string: String,
    },
    Local {
        root: PathBuf,
        /// Defaults to this server's own blob route
        #[serde(default)]
        public_base_url: Option<String>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Azure {
            connection_string: DEFAULT_CONNECTION_STRING.to_string(),
        }
    }
}

/// Blob storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_image_container")]
    pub image_container: String,
    #[serde(default = "default_json_container")]
    pub json_container: String,
    #[serde(default)]
    pub backend: BackendConfig,
}

fn default_image_container() -> String {
    DEFAULT_IMAGE_CONTAINER.to_string()
}

fn default_json_container() -> String {
    DEFAULT_JSON_CONTAINER.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_container: default_image_container(),
            json_container: default_json_container(),
            backend: BackendConfig::default(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from the file named by `FORM_UPLOADER_CONFIG`
    /// (or `config.json`), then apply environment overrides
    pub async fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        let mut config = Self::load_from(Path::new(&path)).await?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from disk, writing the defaults if the file does
    /// not exist yet
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found, writing defaults to {:?}", path);
            let default = AppConfig::default();
            let content = serde_json::to_string_pretty(&default)?;
            fs::write(path, content).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(path).await?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse {:?}: {}", path, e)))?;

        tracing::debug!("Loaded config from {:?}", path);

        Ok(config)
    }

    /// Apply overrides from an environment-like lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(connection_string) = lookup(CONNECTION_STRING_ENV) {
            self.storage.backend = BackendConfig::Azure { connection_string };
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.server.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {}: {:?} ({})", PORT_ENV, port, e)))?;
        }
        Ok(())
    }

    /// Check values the storage service would reject at request time
    pub fn validate(&self) -> Result<()> {
        validate_container_name(&self.storage.image_container)?;
        validate_container_name(&self.storage.json_container)?;

        if self.server.max_upload_bytes == 0 {
            return Err(AppError::Config(
                "server.max_upload_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL the local backend's blobs are reachable at.
    ///
    /// Without an explicit `public_base_url` this is the server's own
    /// address. A wildcard bind address is not routable, so it is replaced
    /// with loopback; set `public_base_url` when clients reach the server
    /// from other hosts.
    pub fn local_public_base_url(&self) -> String {
        match &self.storage.backend {
            BackendConfig::Local {
                public_base_url: Some(url),
                ..
            } => url.clone(),
            _ => {
                let host = match self.server.host.as_str() {
                    "0.0.0.0" => "127.0.0.1",
                    "::" | "[::]" => "[::1]",
                    host => host,
                };
                format!(
                    "http://{}:{}{}",
                    host, self.server.port, LOCAL_BLOB_ROUTE
                )
            }
        }
    }
}

/// Container names: 3-63 chars of lowercase letters, digits and single
/// hyphens, starting and ending with a letter or digit
pub fn validate_container_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    let valid = (MIN_CONTAINER_NAME_LEN..=MAX_CONTAINER_NAME_LEN).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");

    if !valid {
        return Err(AppError::Config(format!(
            "Invalid container name: {:?}",
            name
        )));
    }
    Ok(())
}
