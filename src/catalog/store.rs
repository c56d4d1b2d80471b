use crate::error::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// Persistence for the set of already-published paths, keyed by folder.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Load the set stored under `key`. A key that was never saved yields an
    /// empty set.
    async fn load(&self, key: &str) -> Result<HashSet<PathBuf>>;

    /// Replace the set stored under `key`.
    async fn save(&self, key: &str, paths: &HashSet<PathBuf>) -> Result<()>;
}

/// Stores each key as a JSON array of absolute path strings.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(file_name_for(key))
    }
}

#[async_trait]
impl DedupStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<HashSet<PathBuf>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };
        let paths: Vec<PathBuf> = serde_json::from_str(&content)?;
        Ok(paths.into_iter().collect())
    }

    async fn save(&self, key: &str, paths: &HashSet<PathBuf>) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await?;

        let mut sorted: Vec<&PathBuf> = paths.iter().collect();
        sorted.sort();
        let content = serde_json::to_string_pretty(&sorted)?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), entries = paths.len(), "Saved upload record");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<String, HashSet<PathBuf>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<HashSet<PathBuf>> {
        Ok(self.sets.lock().await.get(key).cloned().unwrap_or_default())
    }

    async fn save(&self, key: &str, paths: &HashSet<PathBuf>) -> Result<()> {
        self.sets.lock().await.insert(key.to_string(), paths.clone());
        Ok(())
    }
}

/// A readable tail of the key plus a stable hash of the whole key, so two
/// folders never share a record file.
fn file_name_for(key: &str) -> String {
    let tail: String = key
        .rsplit(|c: char| c == '/' || c == '\\')
        .find(|part| !part.is_empty())
        .unwrap_or("root")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(40)
        .collect();
    format!("{}-{:016x}.json", tail, fnv1a(key.as_bytes()))
}

// FNV-1a rather than `DefaultHasher`, whose output may change between Rust
// releases; record file names must stay the same across upgrades.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_record_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("/photos/2024").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_is_a_json_array_of_paths() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state"));
        let paths: HashSet<PathBuf> = ["/photos/b.jpg", "/photos/a.jpg"]
            .into_iter()
            .map(PathBuf::from)
            .collect();

        store.save("/photos", &paths).await.unwrap();

        let raw = std::fs::read_to_string(store.path_for("/photos")).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["/photos/a.jpg", "/photos/b.jpg"]);
        assert_eq!(store.load("/photos").await.unwrap(), paths);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        std::fs::write(store.path_for("/photos"), "{not json").unwrap();
        assert!(store.load("/photos").await.is_err());
    }

    #[test]
    fn test_file_names_are_distinct_per_folder() {
        assert_ne!(file_name_for("/a/b_c"), file_name_for("/a/b/c"));
        assert!(file_name_for("/home/me/Photos").starts_with("Photos-"));
        assert!(file_name_for("C:\\Users\\me\\Videos\\").starts_with("Videos-"));
    }

    #[test]
    fn test_file_name_hash_is_fixed() {
        // Known FNV-1a 64 vectors; a change here orphans every saved record.
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(file_name_for("a"), "a-af63dc4c8601ec8c.json");
    }
}
