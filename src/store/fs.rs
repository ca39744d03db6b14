use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{ObjectStore, StoreError, StoreResult};

/// Objects stored as files under a root directory, e.g. a checked-out
/// `content/` folder during local development.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str, source: std::io::Error) -> StoreError {
    if source.kind() == ErrorKind::NotFound {
        StoreError::NotFound(path.to_string())
    } else {
        StoreError::Io {
            path: path.to_string(),
            source,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list(&self, prefix: &str, delimiter: &str) -> StoreResult<Vec<String>> {
        // Only directory-shaped prefixes ("posts/") map onto the filesystem.
        let dir_prefix = match prefix.rfind('/') {
            Some(i) => &prefix[..=i],
            None => "",
        };
        let recursive = delimiter.is_empty();

        let mut names = Vec::new();
        let mut pending = vec![dir_prefix.to_string()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(self.resolve(&dir)?).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir, e)),
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, e))? {
                let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let name = format!("{dir}{file_name}");
                let file_type = entry.file_type().await.map_err(|e| io_error(&name, e))?;

                if file_type.is_dir() {
                    if recursive && name.starts_with(prefix) {
                        pending.push(format!("{name}/"));
                    }
                } else if name.starts_with(prefix) {
                    names.push(name);
                }
            }
        }

        names.sort();
        debug!(prefix, count = names.len(), root = %self.root.display(), "Listed local objects");
        Ok(names)
    }

    async fn download(&self, path: &str) -> StoreResult<Vec<u8>> {
        let file = self.resolve(path)?;
        debug!(path, "Reading local object");
        fs::read(&file).await.map_err(|e| io_error(path, e))
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> StoreResult<()> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }
        debug!(path, size = data.len(), "Writing local object");
        fs::write(&file, data).await.map_err(|e| io_error(path, e))
    }
}
