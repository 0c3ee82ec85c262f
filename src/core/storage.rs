//! Project persistence.
//!
//! The orchestrator persists the whole `BookProject` aggregate after every
//! state transition; semantics are last-write-wins on the whole object.

use crate::core::models::BookProject;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Errors from the persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence collaborator contract.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Load the stored project, if any.
    async fn load(&self) -> Result<Option<BookProject>, StorageError>;

    /// Persist the whole project.
    async fn save(&self, project: &BookProject) -> Result<(), StorageError>;

    /// Remove the stored project.
    async fn clear(&self) -> Result<(), StorageError>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Volatile store for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryProjectStore {
    project: RwLock<Option<BookProject>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn load(&self) -> Result<Option<BookProject>, StorageError> {
        Ok(self.project.read().await.clone())
    }

    async fn save(&self, project: &BookProject) -> Result<(), StorageError> {
        *self.project.write().await = Some(project.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.project.write().await = None;
        Ok(())
    }
}

// ============================================================================
// JSON File Store
// ============================================================================

/// Stores the project as a single JSON file. Saves go through a temp file
/// and an atomic rename so a crash mid-write cannot corrupt the last good
/// state.
pub struct JsonProjectStore {
    path: PathBuf,
}

impl JsonProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, path)
    }
}

#[async_trait]
impl ProjectStore for JsonProjectStore {
    async fn load(&self) -> Result<Option<BookProject>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, project: &BookProject) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(project)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &bytes))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{BookBrief, BookProject, OutlineEntry};

    fn project() -> BookProject {
        BookProject::from_outline(
            BookBrief {
                description: "A field guide to mushrooms".to_string(),
                target_audience: "foragers".to_string(),
                language: "English".to_string(),
                difficulty_level: "intermediate".to_string(),
                number_of_chapters: 3,
            },
            vec![OutlineEntry { title: "Identification".to_string(), subchapters: vec![] }],
        )
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryProjectStore::new();
        assert!(store.load().await.unwrap().is_none());

        let p = project();
        store.save(&p).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(p));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProjectStore::new(dir.path().join("project.json"));

        assert!(store.load().await.unwrap().is_none());

        let p = project();
        store.save(&p).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(p.clone()));

        // No temp file left behind after a successful save.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn file_store_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProjectStore::new(dir.path().join("project.json"));

        let mut p = project();
        store.save(&p).await.unwrap();

        p.chapters[0].content = "spore prints".to_string();
        p.touch();
        store.save(&p).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.chapters[0].content, "spore prints");
    }
}
