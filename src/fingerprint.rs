//! Per-target input fingerprint records
//!
//! A record maps each resolved input file to a stamp (size, mtime, content
//! digest) and is persisted as one JSON file per target under the cache
//! directory. A target is unchanged iff the current input set equals the
//! recorded set and every stamp matches exactly; the mtime participates so
//! a bare touch invalidates.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;

/// Stamp of one input file at record time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    /// File size in bytes
    pub size: u64,
    /// Modification time, nanoseconds since the Unix epoch
    pub modified: u64,
    /// SHA-256 of the file contents, hex-encoded
    pub digest: String,
}

/// Persisted fingerprint of one target's resolved inputs.
///
/// Keys are sorted (BTreeMap) so the record serializes deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Name of the fingerprinted target
    pub target: String,
    /// When the record was written
    pub created: DateTime<Utc>,
    /// Stamp per resolved input path
    pub files: BTreeMap<String, FileStamp>,
}

/// Loads, compares, and persists fingerprint records.
pub struct FingerprintStore {
    directory: PathBuf,
}

impl FingerprintStore {
    /// Create a store rooted at `directory` (created lazily on first write).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn record_path(&self, target: &str) -> PathBuf {
        // Target names are graph identifiers, not paths; keep the record
        // filename flat regardless.
        let safe = target.replace(['/', '\\'], "_");
        self.directory.join(format!("{}.fingerprint.json", safe))
    }

    /// Load the stored record for a target, if any. An unreadable or
    /// undecodable record counts as absent (the target just reruns).
    pub async fn load(&self, target: &str) -> Option<FingerprintRecord> {
        let path = self.record_path(target);
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("discarding undecodable fingerprint {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Whether `files` matches the stored record for `target` exactly.
    ///
    /// No record, a different file set, or any stamp mismatch all mean
    /// "changed".
    pub async fn unchanged(&self, target: &str, files: &[PathBuf]) -> Result<bool> {
        let Some(record) = self.load(target).await else {
            debug!("no fingerprint for target '{}'", target);
            return Ok(false);
        };

        // Depfile-derived inputs may have been deleted since the last run;
        // that is a change, not an error.
        let mut current = BTreeMap::new();
        for file in files {
            match stamp(file) {
                Ok(s) => {
                    let _ = current.insert(file.to_string_lossy().into_owned(), s);
                }
                Err(crate::error::BuildError::Io(e))
                    if e.kind() == std::io::ErrorKind::NotFound =>
                {
                    debug!("input {} disappeared since last run", file.display());
                    return Ok(false);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(current == record.files)
    }

    /// Write a fresh record for `target` from the current state of `files`.
    pub async fn update(&self, target: &str, files: &[PathBuf]) -> Result<()> {
        let record = FingerprintRecord {
            target: target.to_string(),
            created: Utc::now(),
            files: stamp_all(files)?,
        };

        tokio::fs::create_dir_all(&self.directory).await?;
        let json = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(self.record_path(target), json).await?;
        Ok(())
    }

    /// Drop the stored record so the next run cannot skip the target.
    pub async fn invalidate(&self, target: &str) -> Result<()> {
        let path = self.record_path(target);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn stamp_all(files: &[PathBuf]) -> Result<BTreeMap<String, FileStamp>> {
    let mut stamps = BTreeMap::new();
    for file in files {
        let _ = stamps.insert(file.to_string_lossy().into_owned(), stamp(file)?);
    }
    Ok(stamps)
}

/// Stamp one file: metadata plus a streaming content hash.
fn stamp(path: &Path) -> Result<FileStamp> {
    let metadata = std::fs::metadata(path)?;
    let modified = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(FileStamp {
        size: metadata.len(),
        modified,
        digest: format!("{:x}", hasher.finalize()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_no_record_means_changed() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::new(temp.path().join("fingerprints"));
        assert!(!store.unchanged("compile", &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_then_unchanged() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::new(temp.path().join("fingerprints"));
        let input = temp.path().join("main.c");
        std::fs::write(&input, "int main() {}").unwrap();
        let files = vec![input];

        store.update("compile", &files).await.unwrap();
        assert!(store.unchanged("compile", &files).await.unwrap());
    }

    #[tokio::test]
    async fn test_content_change_invalidates() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::new(temp.path().join("fingerprints"));
        let input = temp.path().join("main.c");
        std::fs::write(&input, "int main() {}").unwrap();
        let files = vec![input.clone()];

        store.update("compile", &files).await.unwrap();
        std::fs::write(&input, "int main() { return 1; }").unwrap();
        assert!(!store.unchanged("compile", &files).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_set_change_invalidates() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::new(temp.path().join("fingerprints"));
        let a = temp.path().join("a.c");
        let b = temp.path().join("b.c");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        store.update("compile", &[a.clone()]).await.unwrap();
        assert!(!store.unchanged("compile", &[a, b]).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_removes_record() {
        let temp = TempDir::new().unwrap();
        let store = FingerprintStore::new(temp.path().join("fingerprints"));
        let input = temp.path().join("main.c");
        std::fs::write(&input, "x").unwrap();
        let files = vec![input];

        store.update("compile", &files).await.unwrap();
        store.invalidate("compile").await.unwrap();
        assert!(!store.unchanged("compile", &files).await.unwrap());

        // Invalidating an absent record is fine.
        store.invalidate("compile").await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_record_counts_as_absent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("fingerprints");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("compile.fingerprint.json"), "{not json").unwrap();

        let store = FingerprintStore::new(dir);
        assert!(store.load("compile").await.is_none());
    }
}
