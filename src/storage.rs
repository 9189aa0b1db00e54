//! Flat file storage for templates, generated documents and uploaded logos.
//!
//! Every bucket is a single directory; names never contain path separators.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use tempfile::NamedTempFile;
use utoipa::ToSchema;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Templates,
    Generated,
    Uploads,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Templates, Bucket::Generated, Bucket::Uploads];
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredFile {
    #[schema(example = "Privacy_Policy_1b4e28ba-2fa1-11d2-883f-0016d3cca427.docx")]
    pub name: String,
    #[schema(example = 18342)]
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reject names that could escape the bucket directory.
pub fn validate_file_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
pub trait ObjectStorage {
    /// Create the backing location of every bucket if missing.
    async fn ensure_buckets(&self) -> Result<(), StorageError>;

    /// Store `data` under `name`, failing with `AlreadyExists` instead of overwriting.
    async fn put_new(&self, bucket: Bucket, name: &str, data: Vec<u8>) -> Result<(), StorageError>;

    async fn read(&self, bucket: Bucket, name: &str) -> Result<Vec<u8>, StorageError>;

    async fn stat(&self, bucket: Bucket, name: &str) -> Result<Option<StoredFile>, StorageError>;

    /// All visible regular files of a bucket, sorted by name. A missing bucket is empty.
    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredFile>, StorageError>;

    /// Directory name of a bucket, as clients see it in paths.
    fn bucket_label(&self, bucket: Bucket) -> String;
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    templates_dir: PathBuf,
    generated_dir: PathBuf,
    uploads_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            templates_dir: config.templates_dir.clone(),
            generated_dir: config.generated_dir.clone(),
            uploads_dir: config.uploads_dir.clone(),
        }
    }

    pub fn dir(&self, bucket: Bucket) -> &Path {
        match bucket {
            Bucket::Templates => &self.templates_dir,
            Bucket::Generated => &self.generated_dir,
            Bucket::Uploads => &self.uploads_dir,
        }
    }

    fn path_of(&self, bucket: Bucket, name: &str) -> Result<PathBuf, StorageError> {
        validate_file_name(name)?;
        Ok(self.dir(bucket).join(name))
    }
}

fn stored_file(name: String, metadata: &std::fs::Metadata) -> StoredFile {
    let last_modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    StoredFile {
        name,
        size: metadata.len(),
        last_modified,
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn ensure_buckets(&self) -> Result<(), StorageError> {
        for bucket in Bucket::ALL {
            tokio::fs::create_dir_all(self.dir(bucket)).await?;
        }
        Ok(())
    }

    async fn put_new(&self, bucket: Bucket, name: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let target = self.path_of(bucket, name)?;
        let dir = self.dir(bucket).to_path_buf();
        let display_name = name.to_string();

        // Write to a sibling temp file, then link it into place without clobbering.
        let result = tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            std::fs::create_dir_all(&dir)?;
            let mut temp = NamedTempFile::new_in(&dir)?;
            temp.write_all(&data)?;
            temp.flush()?;
            temp.persist_noclobber(&target).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists(display_name.clone())
                } else {
                    StorageError::Io(e.error)
                }
            })?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        if result.is_ok() {
            debug!("Stored {} in {:?}", name, bucket);
        }
        result
    }

    async fn read(&self, bucket: Bucket, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(bucket, name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn stat(&self, bucket: Bucket, name: &str) -> Result<Option<StoredFile>, StorageError> {
        let path = self.path_of(bucket, name)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(stored_file(name.to_string(), &metadata))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(&self, bucket: Bucket) -> Result<Vec<StoredFile>, StorageError> {
        let dir = self.dir(bucket);
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Directory {} does not exist, listing as empty", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 file name in {}", dir.display());
                continue;
            };
            // In-flight temp files from put_new are hidden.
            if name.starts_with('.') {
                continue;
            }
            files.push(stored_file(name, &metadata));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn bucket_label(&self, bucket: Bucket) -> String {
        self.dir(bucket)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_in(dir: &Path) -> LocalStorage {
        LocalStorage::new(&AppConfig::with_base_dir(dir))
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("Acme_Privacy_2025.docx").is_ok());
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("..").is_err());
        assert!(validate_file_name("../../etc/passwd").is_err());
        assert!(validate_file_name("sub/file.docx").is_err());
        assert!(validate_file_name("sub\\file.docx").is_err());
    }

    #[tokio::test]
    async fn test_put_new_refuses_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = storage_in(tmp.path());
        storage.ensure_buckets().await.unwrap();

        storage
            .put_new(Bucket::Generated, "a.txt", b"first".to_vec())
            .await
            .unwrap();
        let err = storage
            .put_new(Bucket::Generated, "a.txt", b"second".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        let bytes = storage.read(Bucket::Generated, "a.txt").await.unwrap();
        assert_eq!(bytes, b"first");
    }

    #[tokio::test]
    async fn test_list_and_stat() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = storage_in(tmp.path());
        storage.ensure_buckets().await.unwrap();

        storage.put_new(Bucket::Templates, "b.docx", vec![1, 2, 3]).await.unwrap();
        storage.put_new(Bucket::Templates, "a.txt", vec![1]).await.unwrap();

        let files = storage.list(Bucket::Templates).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.docx"]);

        let stat = storage.stat(Bucket::Templates, "b.docx").await.unwrap().unwrap();
        assert_eq!(stat.size, 3);
        assert!(storage.stat(Bucket::Templates, "missing.docx").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_bucket_lists_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = storage_in(&tmp.path().join("nowhere"));
        assert!(storage.list(Bucket::Generated).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = storage_in(tmp.path());
        let err = storage.read(Bucket::Generated, "nope.docx").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_bucket_label_is_dir_name() {
        let storage = storage_in(Path::new("/srv/data"));
        assert_eq!(storage.bucket_label(Bucket::Generated), "generated_docs");
    }
}
