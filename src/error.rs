use crate::config::ConfigError;
use crate::models::AttributeError;
use crate::store::StoreError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("post not found: {path}")]
    NotFound { path: String },

    #[error("Post {path} is missing attributes: {reason}")]
    InvalidPost {
        path: String,
        #[source]
        reason: AttributeError,
    },

    #[error("invalid slug {slug:?}: {reason}")]
    InvalidSlug { slug: String, reason: &'static str },

    #[error("invalid title: {reason}")]
    InvalidTitle { reason: &'static str },

    #[error("failed to serialize front matter: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => Self::NotFound { path },
            other => Self::Store(other),
        }
    }
}
