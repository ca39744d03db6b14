//! Markdown blog posts kept as objects in a storage bucket.
//!
//! Each post lives at `posts/{slug}.md`: a YAML front-matter block carrying
//! the `title`, a blank line, then the markdown body. [`PostRepository`]
//! lists, reads and writes those objects through an [`ObjectStore`].

pub mod config;
pub mod error;
pub mod front_matter;
pub mod markdown;
pub mod models;
pub mod repository;
pub mod store;
pub mod telemetry;

pub use config::{ConfigError, GcsConfig, LocalConfig, StoreConfig};
pub use error::{Error, Result};
pub use models::{AttributeError, NewPost, Post, PostMarkdownAttributes};
pub use repository::{file_name, PostRepository};
pub use store::{GcsStore, LocalStore, MemoryStore, ObjectStore, StoreError};
pub use telemetry::init_tracing;
