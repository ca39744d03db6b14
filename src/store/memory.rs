use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{is_direct_child, ObjectStore, StoreError, StoreResult};

/// Process-local store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects<I, K, V>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let objects = objects
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            objects: RwLock::new(objects),
        }
    }

    /// Raw content of an object, if present.
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str, delimiter: &str) -> StoreResult<Vec<String>> {
        let objects = self.objects.read().await;
        let names: Vec<String> = objects
            .range(prefix.to_string()..)
            .map(|(name, _)| name)
            .take_while(|name| name.starts_with(prefix))
            .filter(|name| is_direct_child(name, prefix, delimiter))
            .cloned()
            .collect();
        debug!(prefix, count = names.len(), "Listed memory objects");
        Ok(names)
    }

    async fn download(&self, path: &str) -> StoreResult<Vec<u8>> {
        self.get(path)
            .await
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> StoreResult<()> {
        debug!(path, size = data.len(), "Storing memory object");
        self.objects.write().await.insert(path.to_string(), data);
        Ok(())
    }
}
