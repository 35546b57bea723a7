use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// String key-value storage. Durable storage survives restarts; session storage doesn't.
pub trait Storage: Send {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One JSON file per key in a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs_err::read_to_string(path)?))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        write_atomically(&path, value)
            .with_context(|| format!("Couldn't save {}", path.display()))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            fs_err::remove_file(path)?;
        }
        Ok(())
    }
}

/// Readers never see a half-written file.
pub fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let mut file = fs_err::File::create(&tmp_path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    fs_err::rename(tmp_path, path)?;
    Ok(())
}

#[derive(Default)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.load("bucket_list").unwrap(), None);
        storage.save("bucket_list", "[]").unwrap();

        let reopened = FileStorage::new(dir.path().join("nested"));
        assert_eq!(
            reopened.load("bucket_list").unwrap().as_deref(),
            Some("[]")
        );
        assert!(!dir.path().join("nested/bucket_list.tmp").exists());

        storage.remove("bucket_list").unwrap();
        assert_eq!(reopened.load("bucket_list").unwrap(), None);
    }
}
