use async_trait::async_trait;
use candlewick_core::store::error::StoreError;
use candlewick_core::store::port::BlobStore;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// # Summary
/// 本地文件系统上的对象存储，对象位于 `<root>/<bucket>/<key>`。
///
/// # Invariants
/// - 对象键必须是相对路径，且不包含 `..`，防止越出根目录。
/// - 写入先落到临时文件再原子重命名，读取方永远看不到写了一半的序列。
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// # Summary
    /// 把 (bucket, key) 解析为本地路径。
    ///
    /// # Returns
    /// 含绝对路径或上级目录的键返回 `StoreError::Io`。
    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || bucket.is_empty() || key.is_empty() {
            return Err(StoreError::Io(format!("Invalid object path: {}/{}", bucket, key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("{}/{}", bucket, key)))
            }
            Err(e) => Err(StoreError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    /// # Summary
    /// 整体覆盖写入对象。
    ///
    /// # Logic
    /// 1. 确保父目录存在。
    /// 2. 写入同目录下的 `.tmp` 文件。
    /// 3. 重命名覆盖目标文件。
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.resolve(bucket, key)?;
        let io = |e: std::io::Error| StoreError::Io(format!("{}: {}", path.display(), e));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await.map_err(io)?;
        tokio::fs::rename(&tmp, &path).await.map_err(io)?;
        debug!(path = %path.display(), size = bytes.len(), "object written");
        Ok(())
    }
}

/// # Summary
/// 基于 DashMap 的内存对象存储，用于测试与演练模式。
///
/// # Invariants
/// - 不做持久化，进程退出即丢失。
#[derive(Default)]
pub struct MemBlobStore {
    // (bucket/key) -> 对象内容
    objects: DashMap<String, Vec<u8>>,
}

impl MemBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个对象
    pub fn with(self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.objects.insert(Self::path(bucket, key), bytes.into());
        self
    }

    /// 直接读取对象内容，不存在时返回 None
    pub fn snapshot(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .get(&Self::path(bucket, key))
            .map(|v| v.value().clone())
    }

    fn path(bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, key)
    }
}

#[async_trait]
impl BlobStore for MemBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = Self::path(bucket, key);
        self.objects
            .get(&path)
            .map(|v| v.value().clone())
            .ok_or(StoreError::NotFound(path))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.objects.insert(Self::path(bucket, key), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("bucket", "data/btc.csv", b"a\n".to_vec()).await.unwrap();
        store.put("bucket", "data/btc.csv", b"a\nb\n".to_vec()).await.unwrap();

        assert_eq!(store.get("bucket", "data/btc.csv").await.unwrap(), b"a\nb\n");
        assert!(dir.path().join("bucket/data/btc.csv").exists());
        assert!(!dir.path().join("bucket/data/btc.csv.tmp").exists());
    }

    #[tokio::test]
    async fn test_fs_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(matches!(
            store.get("bucket", "data/eth.csv").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(matches!(
            store.put("bucket", "../outside.csv", Vec::new()).await,
            Err(StoreError::Io(_))
        ));
        assert!(matches!(
            store.get("bucket", "/etc/passwd").await,
            Err(StoreError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_mem_store() {
        let store = MemBlobStore::new().with("b", "k", "x");
        assert_eq!(store.get("b", "k").await.unwrap(), b"x");
        assert!(matches!(store.get("b", "other").await, Err(StoreError::NotFound(_))));

        store.put("b", "k", b"y".to_vec()).await.unwrap();
        assert_eq!(store.snapshot("b", "k"), Some(b"y".to_vec()));
    }
}
