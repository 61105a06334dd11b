use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::block::Block;
use crate::error::PersistenceError;

/// Durable storage for the block sequence.
pub trait ChainPersistence: Send + Sync {
    /// Read the stored sequence. A store that has never been written holds
    /// an empty sequence; unreadable or undecodable content is an error.
    fn load(&self) -> Result<Vec<Block>, PersistenceError>;

    /// Replace the stored sequence with `blocks`, all or nothing.
    fn save(&self, blocks: &[Block]) -> Result<(), PersistenceError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}

/// The chain as a single pretty-printed JSON array on disk.
///
/// Saves go to a temp file in the same directory, are fsynced, then renamed
/// over the target, so the path always holds either the previous complete
/// chain or the new complete chain.
#[derive(Clone, Debug)]
pub struct JsonChainFile {
    path: PathBuf,
}

impl JsonChainFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl ChainPersistence for JsonChainFile {
    fn load(&self) -> Result<Vec<Block>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no chain file; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };

        serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn save(&self, blocks: &[Block]) -> Result<(), PersistenceError> {
        let dir = self.dir();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

        let temp = tempfile::Builder::new()
            .prefix(".chain-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| PersistenceError::io(&dir, e))?;

        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, blocks)
                .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
            writer
                .write_all(b"\n")
                .and_then(|_| writer.flush())
                .map_err(|e| PersistenceError::io(temp.path(), e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| PersistenceError::io(temp.path(), e))?;

        temp.persist(&self.path)
            .map_err(|e| PersistenceError::io(&self.path, e.error))?;
        sync_dir(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

        debug!(path = %self.path.display(), blocks = blocks.len(), "chain saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fchain_crypto::ContentHasher;

    use super::*;
    use crate::block::NewBlock;
    use crate::ledger::Ledger;

    fn sample_chain(count: usize) -> Vec<Block> {
        let ledger = Ledger::new();
        for i in 0..count {
            ledger
                .append(NewBlock {
                    timestamp: Utc::now(),
                    file_name: format!("f{i}.txt"),
                    storage_path: format!("/data/f{i}.txt"),
                    file_digest: ContentHasher::digest(format!("content {i}").as_bytes()),
                    external_ref: (i % 2 == 0).then(|| format!("lun{i}")),
                })
                .unwrap();
        }
        ledger.snapshot().unwrap()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonChainFile::new(dir.path().join("chain.json"));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonChainFile::new(dir.path().join("chain.json"));
        let blocks = sample_chain(5);

        file.save(&blocks).unwrap();
        let loaded = JsonChainFile::new(file.path()).load().unwrap();

        assert_eq!(loaded, blocks);
        assert!(Ledger::restore(loaded).is_ok());
        assert_eq!(dir_entries(dir.path()), vec!["chain.json".to_string()]);
    }

    #[test]
    fn saved_file_is_pretty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonChainFile::new(dir.path().join("chain.json"));
        file.save(&sample_chain(1)).unwrap();

        let text = fs::read_to_string(file.path()).unwrap();
        assert!(text.starts_with("[\n  {"));
        assert!(text.contains("\"prev_hash\": \"\""));
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonChainFile::new(dir.path().join("nested/deeper/chain.json"));
        file.save(&sample_chain(2)).unwrap();
        assert_eq!(file.load().unwrap().len(), 2);
    }

    #[test]
    fn garbage_is_corrupt_not_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, b"[{\"index\": 0, \"trunc").unwrap();

        let err = JsonChainFile::new(&path).load().unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { .. }));
    }

    #[test]
    fn zero_length_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, b"").unwrap();

        let err = JsonChainFile::new(&path).load().unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { .. }));
    }

    #[test]
    fn interrupted_save_leaves_previous_chain_readable() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonChainFile::new(dir.path().join("chain.json"));
        let old = sample_chain(2);
        file.save(&old).unwrap();

        // What a process killed between write and rename leaves behind.
        let new_json = serde_json::to_vec_pretty(&sample_chain(3)).unwrap();
        fs::write(dir.path().join(".chain-killed.tmp"), &new_json[..new_json.len() / 2]).unwrap();

        assert_eq!(file.load().unwrap(), old);
    }

    #[test]
    fn failed_save_keeps_old_chain_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        let file = JsonChainFile::new(&path);
        let old = sample_chain(2);
        file.save(&old).unwrap();

        // A non-empty directory in the way makes the final rename fail.
        let blocked = JsonChainFile::new(dir.path().join("blocked"));
        fs::create_dir(blocked.path()).unwrap();
        fs::write(blocked.path().join("keep"), b"x").unwrap();

        let err = blocked.save(&sample_chain(3)).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));

        assert_eq!(file.load().unwrap(), old);
        assert_eq!(
            dir_entries(dir.path()),
            vec!["blocked".to_string(), "chain.json".to_string()]
        );
    }
}
