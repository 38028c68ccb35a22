//! Blob stores for the serialized index.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use docai_core::traits::IndexStore;

/// Single file on disk. Saves go to a temp file in the same directory and
/// are renamed over the target, so readers never see a half-written index.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }
}

impl IndexStore for FileStore {
    fn save(&self, blob: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(blob)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| anyhow!("replacing {}: {}", self.path.display(), e.error))?;
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e).with_context(|| format!("removing {}", self.path.display())),
            _ => Ok(()),
        }
    }
}

/// Process-local store for tests and ephemeral indexes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl IndexStore for MemoryStore {
    fn save(&self, blob: &[u8]) -> Result<()> {
        *self.blob.lock().map_err(|_| anyhow!("memory store lock poisoned"))? = Some(blob.to_vec());
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.blob.lock().map_err(|_| anyhow!("memory store lock poisoned"))?.clone())
    }

    fn clear(&self) -> Result<()> {
        *self.blob.lock().map_err(|_| anyhow!("memory store lock poisoned"))? = None;
        Ok(())
    }
}
