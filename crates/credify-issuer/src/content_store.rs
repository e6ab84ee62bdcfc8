//! Content-addressed stores
//!
//! An object's id is the URL-safe base64 SHA-256 of its bytes, so
//! uploading the same bytes twice yields the same URI and stores nothing
//! new.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use credify_core::{ContentStore, CredifyError, UploadTags};
use credify_crypto::sha256;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

pub const DEFAULT_BASE_URI: &str = "https://arweave.net/";
pub const APP_NAME: &str = "Credify";

/// Content id of `bytes`
pub fn content_id(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(sha256(bytes))
}

fn join_uri(base: &str, id: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), id)
}

/// Tags for a certificate image upload
pub fn image_tags(certificate_id: &str) -> UploadTags {
    let mut tags = UploadTags::new();
    tags.insert("Content-Type".into(), "image/png".into());
    tags.insert("App-Name".into(), APP_NAME.into());
    tags.insert("Type".into(), "certificate-image".into());
    tags.insert("Filename".into(), format!("certificate-{}.png", certificate_id));
    tags
}

/// Tags for a metadata JSON upload
pub fn metadata_tags(certificate_id: &str) -> UploadTags {
    let mut tags = UploadTags::new();
    tags.insert("Content-Type".into(), "application/json".into());
    tags.insert("App-Name".into(), APP_NAME.into());
    tags.insert("Type".into(), "certificate-metadata".into());
    tags.insert("Filename".into(), format!("metadata-{}.json", certificate_id));
    tags
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub tags: UploadTags,
}

/// In-memory store (for development/testing)
pub struct InMemoryContentStore {
    base_uri: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    quota_bytes: Option<u64>,
}

impl InMemoryContentStore {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            objects: RwLock::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    /// Reject uploads once the stored total would exceed `bytes`
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    fn id_from_uri<'a>(&self, uri: &'a str) -> &'a str {
        uri.rsplit('/').next().unwrap_or(uri)
    }

    /// Fetch an object by URI or bare id
    pub fn get(&self, uri: &str) -> Option<StoredObject> {
        let objects = self.objects.read().ok()?;
        objects.get(self.id_from_uri(uri)).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stored_bytes(&self) -> u64 {
        self.objects
            .read()
            .map(|o| o.values().map(|v| v.bytes.len() as u64).sum())
            .unwrap_or(0)
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URI)
    }
}

#[async_trait::async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upload(&self, bytes: &[u8], tags: &UploadTags) -> Result<String, CredifyError> {
        let id = content_id(bytes);
        let mut objects = self
            .objects
            .write()
            .map_err(|_| CredifyError::policy("content store is unusable: lock poisoned"))?;

        if !objects.contains_key(&id) {
            if let Some(quota) = self.quota_bytes {
                let used: u64 = objects.values().map(|v| v.bytes.len() as u64).sum();
                if used + bytes.len() as u64 > quota {
                    return Err(CredifyError::policy(format!(
                        "quota exceeded: {} of {} bytes used",
                        used, quota
                    )));
                }
            }
            objects.insert(
                id.clone(),
                StoredObject {
                    bytes: bytes.to_vec(),
                    tags: tags.clone(),
                },
            );
        }

        debug!(id = %id, size = bytes.len(), "Stored object in memory");
        Ok(join_uri(&self.base_uri, &id))
    }
}

/// Filesystem store writing `<dir>/<id>` and a `<id>.tags.json` sidecar
pub struct FsContentStore {
    dir: PathBuf,
    base_uri: String,
}

impl FsContentStore {
    /// Open a store rooted at `dir`, creating the directory if absent
    pub async fn open(dir: impl Into<PathBuf>, base_uri: impl Into<String>) -> Result<Self, CredifyError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;
        Ok(Self {
            dir,
            base_uri: base_uri.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn object_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }
}

fn io_error(err: std::io::Error) -> CredifyError {
    match err.kind() {
        ErrorKind::PermissionDenied => CredifyError::policy(format!("storage refused: {}", err)),
        _ => CredifyError::transport(format!("storage I/O: {}", err)),
    }
}

#[async_trait::async_trait]
impl ContentStore for FsContentStore {
    async fn upload(&self, bytes: &[u8], tags: &UploadTags) -> Result<String, CredifyError> {
        let id = content_id(bytes);
        let path = self.object_path(&id);

        if !tokio::fs::try_exists(&path).await.map_err(io_error)? {
            tokio::fs::write(&path, bytes).await.map_err(io_error)?;
            let sidecar = serde_json::to_vec_pretty(tags)?;
            tokio::fs::write(self.dir.join(format!("{}.tags.json", id)), sidecar)
                .await
                .map_err(io_error)?;
            debug!(path = %path.display(), size = bytes.len(), "Wrote object to disk");
        }

        Ok(join_uri(&self.base_uri, &id))
    }
}
