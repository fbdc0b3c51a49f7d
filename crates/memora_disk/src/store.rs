// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    fmt::Display,
    fs, io,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

use memora_store::{CacheEntry, Error, Store};

const ENTRY_EXT: &str = "bin";
const TEMP_EXT: &str = "tmp";

/// A durable storage tier keeping one file per key.
///
/// Keys address files through their `Display` form, so they must render to
/// filesystem-safe tokens; call keys render as 32 hex digits, which is the
/// intended use. Writes go to a temp file first and are renamed into place,
/// so readers never observe a partially written entry.
///
/// Entries round-trip with their metadata (creation timestamp, value
/// fingerprint) intact; freshness decisions stay with the engine.
///
/// Cloning a `DiskStore` yields another handle to the same directory.
#[derive(Clone, Debug)]
pub struct DiskStore<K, V> {
    root: PathBuf,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> DiskStore<K, V> {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            _marker: PhantomData,
        })
    }

    /// Returns the directory this store writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &K) -> PathBuf
    where
        K: Display,
    {
        self.root.join(format!("{key}.{ENTRY_EXT}"))
    }
}

impl<K, V> Store<K, V> for DiskStore<K, V>
where
    K: Display + Send + Sync,
    V: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<CacheEntry<V>>, Error> {
        let bytes = match fs::read(self.entry_path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry = bincode::deserialize(&bytes).map_err(Error::codec)?;
        Ok(Some(entry))
    }

    async fn put(&self, key: &K, entry: CacheEntry<V>) -> Result<(), Error> {
        let bytes = bincode::serialize(&entry).map_err(Error::codec)?;
        let path = self.entry_path(key);
        let staging = path.with_extension(TEMP_EXT);
        fs::write(&staging, &bytes)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    async fn remove(&self, key: &K) -> Result<(), Error> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<(), Error> {
        for dirent in fs::read_dir(&self.root)? {
            let path = dirent?.path();
            let ours = path
                .extension()
                .is_some_and(|ext| ext == ENTRY_EXT || ext == TEMP_EXT);
            if ours {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    // Lost a race with a concurrent remove; nothing to do.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn store_in(dir: &Path) -> DiskStore<String, Vec<u8>> {
        DiskStore::new(dir).expect("create store")
    }

    #[test]
    fn round_trip_preserves_metadata() {
        let dir = tempfile::tempdir().unwrap();
        block_on(async {
            let store = store_in(dir.path());

            let created = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
            let mut entry = CacheEntry::with_created_at(vec![1u8, 2, 3], created);
            entry.set_fingerprint(0xfeed);
            store.put(&"k".to_string(), entry.clone()).await?;

            // A fresh store over the same directory sees the same entry.
            let reopened = store_in(dir.path());
            let loaded = reopened.get(&"k".to_string()).await?.expect("entry on disk");
            assert_eq!(loaded, entry);
            assert_eq!(loaded.created_at(), Some(created));
            assert_eq!(loaded.fingerprint(), Some(0xfeed));
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn missing_key_is_a_clean_miss() {
        let dir = tempfile::tempdir().unwrap();
        block_on(async {
            let store = store_in(dir.path());
            assert!(store.get(&"absent".to_string()).await?.is_none());
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn overwrite_replaces_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        block_on(async {
            let store = store_in(dir.path());
            store.put(&"k".to_string(), CacheEntry::new(vec![1])).await?;
            store.put(&"k".to_string(), CacheEntry::new(vec![2])).await?;

            let entry = store.get(&"k".to_string()).await?.unwrap();
            assert_eq!(entry.value(), &vec![2]);
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        block_on(async {
            let store = store_in(dir.path());
            store.put(&"k".to_string(), CacheEntry::new(vec![1])).await?;
            store.remove(&"k".to_string()).await?;
            store.remove(&"k".to_string()).await?;
            assert!(store.get(&"k".to_string()).await?.is_none());
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn clear_removes_only_store_files() {
        let dir = tempfile::tempdir().unwrap();
        block_on(async {
            let store = store_in(dir.path());
            store.put(&"a".to_string(), CacheEntry::new(vec![1])).await?;
            store.put(&"b".to_string(), CacheEntry::new(vec![2])).await?;
            fs::write(dir.path().join("unrelated.txt"), b"keep me")?;

            store.clear().await?;

            assert!(store.get(&"a".to_string()).await?.is_none());
            assert!(store.get(&"b".to_string()).await?.is_none());
            assert!(dir.path().join("unrelated.txt").exists());
            Ok::<(), Error>(())
        })
        .unwrap();
    }

    #[test]
    fn corrupt_file_reports_codec_error() {
        let dir = tempfile::tempdir().unwrap();
        block_on(async {
            let store = store_in(dir.path());
            fs::write(dir.path().join("bad.bin"), b"\xff\xff")?;

            let err = store.get(&"bad".to_string()).await.expect_err("corrupt entry");
            assert!(matches!(err, Error::Codec(_)));
            Ok::<(), Error>(())
        })
        .unwrap();
    }
}
