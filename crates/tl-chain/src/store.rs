use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::debug;

use crate::{Block, ChainError};

/// Durable home for the ledger's block sequence.
///
/// Implementations store and return blocks verbatim; checking them is the
/// [`crate::Ledger`]'s job.
pub trait ChainStore: Send + Sync {
    /// Return the stored sequence, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<Block>>, ChainError>;

    /// Replace the stored sequence with `blocks`.
    fn save(&self, blocks: &[Block]) -> Result<(), ChainError>;
}

/// Stores the chain as a pretty-printed JSON array of block objects.
///
/// Saves go to a sibling `.tmp` file which is synced and then renamed over
/// the target, so a crash never leaves a half-written chain behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "chain.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ChainStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Block>>, ChainError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let blocks: Vec<Block> = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), blocks = blocks.len(), "Loaded chain file");
        Ok(Some(blocks))
    }

    fn save(&self, blocks: &[Block]) -> Result<(), ChainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        let bytes = serde_json::to_vec_pretty(blocks)?;
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), blocks = blocks.len(), "Saved chain file");
        Ok(())
    }
}

/// Keeps the chain in memory.  Clones share the same storage, so a test can
/// hold one handle while a ledger owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blocks: Arc<Mutex<Option<Vec<Block>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing sequence.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(Some(blocks))),
        }
    }

    /// Snapshot of what was last saved.
    pub fn saved(&self) -> Option<Vec<Block>> {
        self.blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ChainStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<Block>>, ChainError> {
        Ok(self.saved())
    }

    fn save(&self, blocks: &[Block]) -> Result<(), ChainError> {
        *self
            .blocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(blocks.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("chain.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_is_field_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("chain.json"));
        let blocks = vec![Block::genesis()];

        store.save(&blocks).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), blocks);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn file_is_an_array_of_block_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("chain.json"));
        store.save(&[Block::genesis()]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let first = &raw.as_array().unwrap()[0];
        assert_eq!(first["previous_hash"], "0");
        assert_eq!(first["claim_id"], "GENESIS");
        assert_eq!(first["validation_level"], "absolute");
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            JsonFileStore::new(path).load(),
            Err(ChainError::Serialization(_))
        ));
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.save(&[Block::genesis()]).unwrap();
        assert_eq!(handle.saved().unwrap().len(), 1);
    }
}
