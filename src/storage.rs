use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};

/// StorageService
///
/// The contract for the object store holding uploaded dish and restaurant images.
/// Handlers only see this trait, so tests can swap in `MockStorageService`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it does not exist. Called once at startup
    /// in `Env::Local` to provision MinIO.
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` under `key` and returns the public URL of the object.
    ///
    /// # Arguments
    /// * `key`: The object key, e.g. `uploads/1718000000000-pizza.jpg`.
    /// * `content_type`: The MIME type recorded on the object.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String>;
}

/// S3StorageClient
///
/// `StorageService` over any S3-compatible endpoint (MinIO locally, a managed
/// bucket in production). Path-style addressing is forced because MinIO requires it.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Ok(format!("{}/{}/{}", self.endpoint, self.bucket_name, key))
    }
}

/// sanitize_key
///
/// Reduces a client-supplied file name to a safe key segment: directory
/// components are dropped and anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn sanitize_key(name: &str) -> String {
    let base = name
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .last()
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// MockStorageService
///
/// In-memory `StorageService` for tests. Records every stored key so assertions
/// can check what the handler wrote.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every write fails.
    pub should_fail: bool,
    stored: Arc<Mutex<Vec<(String, usize, String)>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// (key, byte length, content type) of every stored object, in write order.
    pub fn stored(&self) -> Vec<(String, usize, String)> {
        self.stored.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        if let Ok(mut stored) = self.stored.lock() {
            stored.push((key.to_string(), bytes.len(), content_type.to_string()));
        }
        Ok(format!("http://localhost:9000/mock-bucket/{}", key))
    }
}

/// StorageState
///
/// The shared handle to the object store stored in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
