use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::VectorIndex;
use crate::error::{ChainRagError, Result};
use crate::tag::Tag;

const INDEX_FILE: &str = "index.json";

/// Tag-addressed persistence for vector indexes under `<data_dir>/vector_db/<tag>/`.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join("vector_db"),
        }
    }

    pub fn dir_for(&self, tag: &Tag) -> PathBuf {
        self.root.join(tag.as_str())
    }

    pub fn path_for(&self, tag: &Tag) -> PathBuf {
        self.dir_for(tag).join(INDEX_FILE)
    }

    pub fn exists(&self, tag: &Tag) -> bool {
        self.path_for(tag).is_file()
    }

    /// Read the persisted index. Absence and unreadable data are reported as
    /// different errors.
    pub fn load(&self, tag: &Tag) -> Result<VectorIndex> {
        let path = self.path_for(tag);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ChainRagError::NotPrepared(tag.to_string()))
            }
            Err(e) => {
                return Err(ChainRagError::IndexLoad {
                    tag: tag.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| ChainRagError::IndexLoad {
            tag: tag.to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the index, replacing any previous one in a single rename.
    pub fn save(&self, tag: &Tag, index: &VectorIndex) -> Result<PathBuf> {
        let dir = self.dir_for(tag);
        fs::create_dir_all(&dir)?;

        let path = dir.join(INDEX_FILE);
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec(index)?)?;
        fs::rename(&tmp, &path)?;

        Ok(path)
    }
}
