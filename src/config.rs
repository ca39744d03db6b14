//! Where posts are stored, read from the environment or a TOML file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

pub const DEFAULT_BUCKET: &str = "wubbwubb-remix-netlify-demo";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Overrides `https://storage.googleapis.com`, e.g. for an emulator. A bare
    /// `host:port` is taken as plain http.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            bucket: default_bucket(),
            endpoint: None,
            client_email: None,
            private_key: None,
        }
    }
}

impl fmt::Debug for GcsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsConfig")
            .field("project_id", &self.project_id)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GcsConfig {
    /// Reads `GCP_PROJECT_ID`, `GCP_CLIENT_EMAIL`, `GCP_PRIVATE_KEY`,
    /// `GCS_BUCKET` and `STORAGE_EMULATOR_HOST`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            project_id: var("GCP_PROJECT_ID"),
            bucket: var("GCS_BUCKET").unwrap_or_else(default_bucket),
            endpoint: var("STORAGE_EMULATOR_HOST"),
            client_email: var("GCP_CLIENT_EMAIL"),
            private_key: var("GCP_PRIVATE_KEY"),
        }
    }

    /// The private key with escaped `\n` sequences turned into line breaks,
    /// as single-line environment variables carry them.
    pub fn private_key_pem(&self) -> Option<String> {
        self.private_key.as_deref().map(|key| key.replace("\\n", "\n"))
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub root: PathBuf,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    Gcs(GcsConfig),
    Local(LocalConfig),
    Memory,
}

impl StoreConfig {
    /// `POSTS_DIR` selects a local directory; otherwise Cloud Storage.
    pub fn from_env() -> Self {
        match std::env::var("POSTS_DIR") {
            Ok(root) if !root.is_empty() => Self::Local(LocalConfig { root: root.into() }),
            _ => Self::Gcs(GcsConfig::from_env()),
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&input)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Gcs(_) => "gcs",
            Self::Local(_) => "local",
            Self::Memory => "memory",
        }
    }
}
