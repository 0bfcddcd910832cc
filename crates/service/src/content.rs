//! Ciphertext blob storage.
//!
//! Leaf content lands here exactly as the client encrypted it; the store
//! never sees a key or a plaintext byte. Blobs are flat files under one
//! root directory, named independently of the tree structure so a rename
//! or move never touches stored bytes.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Filesystem-backed store of encrypted content blobs.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open (and create if missing) a content store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, std::io::Error> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(ContentStore { root })
    }

    /// Mint a fresh storage path for a new blob.
    pub fn new_blob_path(&self) -> String {
        format!("{}.bin", Uuid::new_v4())
    }

    fn blob_file(&self, storage_path: &str) -> PathBuf {
        // storage paths are minted here and never contain separators
        self.root.join(Path::new(storage_path).file_name().unwrap_or_default())
    }

    pub async fn put(&self, storage_path: &str, ciphertext: &[u8]) -> Result<(), std::io::Error> {
        tokio::fs::write(self.blob_file(storage_path), ciphertext).await
    }

    pub async fn get(&self, storage_path: &str) -> Result<Vec<u8>, std::io::Error> {
        tokio::fs::read(self.blob_file(storage_path)).await
    }

    /// Remove a blob. Missing blobs are fine: deletes must be re-issuable.
    pub async fn remove(&self, storage_path: &str) -> Result<(), std::io::Error> {
        match tokio::fs::remove_file(self.blob_file(storage_path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
