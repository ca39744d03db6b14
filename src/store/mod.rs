//! Object storage behind the post repository.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StoreConfig;

mod auth;
pub mod fs;
pub mod gcs;
pub mod memory;

pub use fs::LocalStore;
pub use gcs::GcsStore;
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("object store returned {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to sign token assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Key-addressed byte storage.
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Names of the objects under `prefix`. With a non-empty `delimiter`,
    /// objects whose name continues past another delimiter are left out.
    async fn list(&self, prefix: &str, delimiter: &str) -> StoreResult<Vec<String>>;

    async fn download(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Creates the object or replaces its content.
    async fn upload(&self, path: &str, data: Vec<u8>) -> StoreResult<()>;
}

/// Whether `name` is listed under `prefix` when rolling up at `delimiter`.
pub(crate) fn is_direct_child(name: &str, prefix: &str, delimiter: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(rest) => delimiter.is_empty() || !rest.contains(delimiter),
        None => false,
    }
}

/// Builds the backend described by `config`.
pub fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config {
        StoreConfig::Gcs(gcs) => Arc::new(GcsStore::new(gcs)?),
        StoreConfig::Local(local) => Arc::new(LocalStore::new(&local.root)),
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
    };
    info!(backend = config.backend_name(), "Object store ready");
    Ok(store)
}
