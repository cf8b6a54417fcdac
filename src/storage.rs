use async_trait::async_trait;
use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::io::AsyncRead;

use crate::error::{AppError, Result};

/// Where an upload ended up and how large it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub size: i64,
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the paper upload store. Handlers only see this trait, so the
/// filesystem implementation can be swapped for the in-memory mock in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the upload directory if needed. Called once at startup.
    async fn ensure_ready(&self) -> Result<()>;

    /// Writes `bytes` under `stored_name` and reports the resulting path and size.
    /// `stored_name` must already be sanitized.
    async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<StoredFile>;

    /// Opens a file previously returned by `save` for streaming. `None` when it no
    /// longer exists.
    async fn open(&self, path: &str) -> Result<Option<FileReader>>;

    /// Removes a stored file. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

/// An open stored file.
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Rejects names that could escape the upload directory.
fn checked_name(stored_name: &str) -> Result<&str> {
    if stored_name.is_empty()
        || stored_name.contains(['/', '\\'])
        || stored_name == "."
        || stored_name == ".."
    {
        return Err(AppError::Internal(format!(
            "Refusing to store file under unsafe name {stored_name:?}"
        )));
    }
    Ok(stored_name)
}

// 2. The Real Implementation (local filesystem)
/// LocalFileStorage
///
/// Stores uploads as plain files in a single directory.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageService for LocalFileStorage {
    async fn ensure_ready(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        let name = checked_name(stored_name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            tracing::error!("failed to write upload {:?}: {:?}", path, e);
            AppError::from(e)
        })?;
        let size = tokio::fs::metadata(&path).await?.len() as i64;
        Ok(StoredFile {
            path: path.to_string_lossy().into_owned(),
            size,
        })
    }

    async fn open(&self, path: &str) -> Result<Option<FileReader>> {
        match tokio::fs::File::open(path).await {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory `StorageService` for handler tests. With `should_fail` set, every write
/// returns a simulated storage failure.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, `save` and `delete` fail.
    pub should_fail: bool,
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Paths currently held, sorted.
    pub fn stored_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    fn simulated_failure() -> AppError {
        AppError::Internal("Mock Storage Error: Simulation requested".to_string())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn save(&self, stored_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        if self.should_fail {
            return Err(Self::simulated_failure());
        }
        let name = checked_name(stored_name)?;
        let path = format!("mock-uploads/{name}");
        let mut files = self
            .files
            .lock()
            .map_err(|_| AppError::Internal("Mock storage poisoned".to_string()))?;
        files.insert(path.clone(), bytes.to_vec());
        Ok(StoredFile {
            path,
            size: bytes.len() as i64,
        })
    }

    async fn open(&self, path: &str) -> Result<Option<FileReader>> {
        let files = self
            .files
            .lock()
            .map_err(|_| AppError::Internal("Mock storage poisoned".to_string()))?;
        Ok(files
            .get(path)
            .map(|bytes| Box::new(Cursor::new(bytes.clone())) as FileReader))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if self.should_fail {
            return Err(Self::simulated_failure());
        }
        let mut files = self
            .files
            .lock()
            .map_err(|_| AppError::Internal("Mock storage poisoned".to_string()))?;
        files.remove(path);
        Ok(())
    }
}
