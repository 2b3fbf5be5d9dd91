//! # Chain Persistence
//!
//! The chain is stored as a pretty-printed JSON array of block records:
//!
//! ```text
//! [
//!   {
//!     "index": 1,
//!     "timestamp": "2026-10-18T12:00:00.123456789Z",
//!     "merkleRoot": "<64 hex>",
//!     "prevHash": "<64 hex, or empty for genesis>",
//!     "hash": "<64 hex>",
//!     "nonce": 40213
//!   },
//!   ...
//! ]
//! ```
//!
//! Only the ordered blocks are written. Lookup indices are rebuilt on load.
//!
//! ## Durability
//!
//! Writes go to a sibling `*.tmp` file, which is fsynced and then renamed
//! over the target. A crash mid-write leaves the previous chain file intact.
//! There is no file locking: one writer per chain file.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::block::Block;
use super::chain::Blockchain;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chain file format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("chain file {0} contains no blocks")]
    EmptyChain(PathBuf),

    #[error("invalid chain path: {0}")]
    InvalidPath(PathBuf),
}

impl Blockchain {
    /// Write the block sequence to `path` as JSON, atomically replacing any
    /// existing file. Parent directories are created as needed.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .ok_or_else(|| PersistError::InvalidPath(path.to_path_buf()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self.blocks())?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        info!(path = %path.display(), blocks = self.len(), "chain persisted");
        Ok(())
    }

    /// Read a chain written by [`persist`](Self::persist) and rebuild its indices.
    ///
    /// The loaded chain is not re-validated; run
    /// [`validate_chain`](Self::validate_chain) or [`verify`](Self::verify)
    /// before trusting a file from elsewhere.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let blocks: Vec<Block> = serde_json::from_slice(&bytes)?;
        let chain = Blockchain::from_blocks(blocks)
            .ok_or_else(|| PersistError::EmptyChain(path.to_path_buf()))?;
        info!(path = %path.display(), blocks = chain.len(), "chain loaded");
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;
    use crate::mining::MinerConfig;

    fn two_block_chain() -> Blockchain {
        let mut chain = Blockchain::with_genesis();
        let mut block = Block::create(&chain, sha256(b"persisted file"));
        block
            .mine(&MinerConfig {
                difficulty: 8,
                workers: 2,
                ..MinerConfig::default()
            })
            .unwrap();
        chain.add_block(block, 8).unwrap();
        chain
    }

    #[test]
    fn persist_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let chain = two_block_chain();

        chain.persist(&path).unwrap();
        let loaded = Blockchain::load(&path).unwrap();

        assert_eq!(loaded.blocks(), chain.blocks());
        assert_eq!(loaded, chain);
        let tip = chain.last_block();
        assert_eq!(loaded.get_by_hash(&tip.hash), Some(tip));
        assert_eq!(loaded.get_by_merkle_root(&tip.merkle_root), Some(tip));
        assert!(loaded.validate_chain());
        assert!(loaded.verify(8).is_ok());
    }

    #[test]
    fn file_is_a_plain_block_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        two_block_chain().persist(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let records = value.as_array().expect("top level is an array");
        assert_eq!(records.len(), 2);
        for key in ["index", "timestamp", "merkleRoot", "prevHash", "hash", "nonce"] {
            assert!(records[1].get(key).is_some(), "missing {key}");
        }
        assert_eq!(records[1].as_object().unwrap().len(), 6);
    }

    #[test]
    fn creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage").join("chain.json");
        Blockchain::with_genesis().persist(&path).unwrap();

        assert!(path.exists());
        assert!(!path.with_file_name("chain.json.tmp").exists());
    }

    #[test]
    fn persist_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        Blockchain::with_genesis().persist(&path).unwrap();
        two_block_chain().persist(&path).unwrap();
        assert_eq!(Blockchain::load(&path).unwrap().len(), 2);
    }

    #[test]
    fn empty_array_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, "[]").unwrap();
        assert!(matches!(
            Blockchain::load(&path),
            Err(PersistError::EmptyChain(_))
        ));
    }

    #[test]
    fn garbage_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, r#"{"blocks": []}"#).unwrap();
        assert!(matches!(Blockchain::load(&path), Err(PersistError::Format(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Blockchain::load(dir.path().join("absent.json")),
            Err(PersistError::Io(_))
        ));
    }
}
