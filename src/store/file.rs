use super::{RemoteStore, StoreBackend, wire};
use crate::core::{BindError, Result, Table};
use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Backend keeping one JSON document per master key under
/// `<root>/<store_name>/<encoded key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self, store_name: &str) -> Result<FileStore> {
        if store_name.is_empty() || store_name.contains(['/', '\\']) || store_name == ".." {
            return Err(BindError::InvalidName(format!(
                "store name '{}' cannot be used as a directory",
                store_name
            )));
        }
        Ok(FileStore {
            name: store_name.to_string(),
            dir: self.root.join(store_name),
        })
    }
}

impl StoreBackend for FileBackend {
    fn open_store(&self, store_name: &str) -> Result<Arc<dyn RemoteStore>> {
        let store: Arc<dyn RemoteStore> = Arc::new(self.store(store_name)?);
        Ok(store)
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    name: String,
    dir: PathBuf,
}

impl FileStore {
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

#[async_trait]
impl RemoteStore for FileStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_record(&self, key: &str) -> Result<Option<Table>> {
        let path = self.record_path(key);
        match fs::read(&path).await {
            Ok(bytes) => wire::decode_document(&bytes).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(BindError::Store(format!(
                "Failed to read '{}': {}",
                path.display(),
                err
            ))),
        }
    }

    async fn put_record(&self, key: &str, record: &Table) -> Result<()> {
        let path = self.record_path(key);
        let bytes = wire::encode_document(record)?;
        atomic_write(&path, &bytes).await?;
        debug!(
            "record written: store='{}' key='{}' bytes={}",
            self.name,
            key,
            bytes.len()
        );
        Ok(())
    }
}

// Keys are arbitrary strings; anything outside a safe file-name alphabet is
// percent-encoded so distinct keys never collide on disk.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|err| {
            BindError::Store(format!(
                "Failed to create parent directory '{}': {}",
                parent.display(),
                err
            ))
        })?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await.map_err(|err| {
        BindError::Store(format!(
            "Failed to write temp file '{}': {}",
            tmp.display(),
            err
        ))
    })?;

    fs::rename(&tmp, path).await.map_err(|err| {
        BindError::Store(format!(
            "Failed to rename temp file '{}' -> '{}': {}",
            tmp.display(),
            path.display(),
            err
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_percent_encoded() {
        assert_eq!(encode_key("player_42"), "player_42");
        assert_eq!(encode_key("a/b c"), "a%2Fb%20c");
        assert_ne!(encode_key("a.b"), encode_key("a_b"));
    }

    #[test]
    fn store_names_cannot_escape_root() {
        let backend = FileBackend::new("/tmp/unused");
        assert!(backend.store("../evil").is_err());
        assert!(backend.store("").is_err());
        assert!(backend.store("PlayerData").is_ok());
    }
}
