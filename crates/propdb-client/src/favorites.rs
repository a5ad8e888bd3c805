//! Favorites sets, local or server-backed.
//!
//! Both stores are read-after-write consistent within one process: a
//! successful `add` or `remove` is visible to the next `list`.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::api::PropertyApi;
use crate::error::ClientError;

#[async_trait]
pub trait FavoritesStore: Send + Sync {
    async fn list(&self) -> Result<HashSet<String>, ClientError>;

    async fn add(&self, id: &str) -> Result<(), ClientError>;

    async fn remove(&self, id: &str) -> Result<(), ClientError>;

    async fn contains(&self, id: &str) -> Result<bool, ClientError> {
        Ok(self.list().await?.contains(id))
    }

    /// Flip membership of `id`. Returns whether it is now a favorite.
    async fn toggle(&self, id: &str) -> Result<bool, ClientError> {
        if self.contains(id).await? {
            self.remove(id).await?;
            Ok(false)
        } else {
            self.add(id).await?;
            Ok(true)
        }
    }
}

/// Favorites kept on this machine, optionally persisted as a JSON array.
pub struct LocalFavorites {
    path: Option<PathBuf>,
    ids: Mutex<HashSet<String>>,
}

impl LocalFavorites {
    /// A set that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            ids: Mutex::new(HashSet::new()),
        }
    }

    /// Load from `path`, treating a missing file as an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the file exists but cannot be read, or
    /// [`ClientError::Deserialize`] if it is not a JSON array of strings.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let ids = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let ids: Vec<String> =
                    serde_json::from_slice(&bytes).map_err(|e| ClientError::Deserialize {
                        context: path.display().to_string(),
                        source: e,
                    })?;
                ids.into_iter().collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), count = ids.len(), "loaded local favorites");

        Ok(Self {
            path: Some(path),
            ids: Mutex::new(ids),
        })
    }

    /// Apply `change` to a copy and swap it in only once it is on disk.
    async fn update(
        &self,
        change: impl FnOnce(&mut HashSet<String>) -> bool + Send,
    ) -> Result<(), ClientError> {
        let mut ids = self.ids.lock().await;
        let mut staged = ids.clone();
        if !change(&mut staged) {
            return Ok(());
        }
        self.persist(&staged).await?;
        *ids = staged;
        Ok(())
    }

    /// Write the set next to its final path, then rename over it.
    async fn persist(&self, ids: &HashSet<String>) -> Result<(), ClientError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();
        let body = serde_json::to_vec_pretty(&sorted).map_err(|e| ClientError::Deserialize {
            context: path.display().to_string(),
            source: e,
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl FavoritesStore for LocalFavorites {
    async fn list(&self) -> Result<HashSet<String>, ClientError> {
        Ok(self.ids.lock().await.clone())
    }

    async fn add(&self, id: &str) -> Result<(), ClientError> {
        self.update(|ids| ids.insert(id.to_owned())).await
    }

    async fn remove(&self, id: &str) -> Result<(), ClientError> {
        self.update(|ids| ids.remove(id)).await
    }
}

/// Favorites persisted by the server for the signed-in user.
///
/// The first `list` fetches the full set; later writes update the cached
/// copy only after the server accepted them.
pub struct RemoteFavorites {
    api: Arc<dyn PropertyApi>,
    cache: Mutex<Option<HashSet<String>>>,
}

impl RemoteFavorites {
    pub fn new(api: Arc<dyn PropertyApi>) -> Self {
        Self {
            api,
            cache: Mutex::new(None),
        }
    }

    /// Drop the cached set so the next `list` refetches.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

#[async_trait]
impl FavoritesStore for RemoteFavorites {
    async fn list(&self) -> Result<HashSet<String>, ClientError> {
        let mut cache = self.cache.lock().await;
        if let Some(ids) = cache.as_ref() {
            return Ok(ids.clone());
        }
        let ids: HashSet<String> = self.api.list_favorites().await?.into_iter().collect();
        *cache = Some(ids.clone());
        Ok(ids)
    }

    async fn add(&self, id: &str) -> Result<(), ClientError> {
        let mut cache = self.cache.lock().await;
        self.api.add_favorite(id).await?;
        if let Some(ids) = cache.as_mut() {
            ids.insert(id.to_owned());
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), ClientError> {
        let mut cache = self.cache.lock().await;
        self.api.remove_favorite(id).await?;
        if let Some(ids) = cache.as_mut() {
            ids.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_toggle_flips_membership() {
        let store = LocalFavorites::in_memory();
        assert!(store.toggle("p-1").await.unwrap());
        assert!(store.contains("p-1").await.unwrap());
        assert!(!store.toggle("p-1").await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_backed_set_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");

        let store = LocalFavorites::load(&path).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        store.add("p-2").await.unwrap();
        store.add("p-1").await.unwrap();
        store.remove("p-2").await.unwrap();

        let reloaded = LocalFavorites::load(&path).await.unwrap();
        let ids = reloaded.list().await.unwrap();
        assert_eq!(ids, HashSet::from(["p-1".to_owned()]));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<Vec<String>>(&raw).unwrap(), ["p-1"]);
    }

    #[tokio::test]
    async fn failed_write_leaves_set_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("favorites.json");

        let store = LocalFavorites::load(&path).await.unwrap();
        assert!(matches!(store.add("p-1").await, Err(ClientError::Io(_))));
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.contains("p-1").await.unwrap());
    }

    #[tokio::test]
    async fn failed_remove_keeps_the_favorite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, r#"["p-1"]"#).unwrap();
        let store = LocalFavorites::load(&path).await.unwrap();

        // Replacing the file with a directory makes the final rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "").unwrap();

        assert!(store.remove("p-1").await.is_err());
        assert!(store.contains("p-1").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_deserialize_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = LocalFavorites::load(&path).await;
        assert!(matches!(result, Err(ClientError::Deserialize { .. })));
    }
}
