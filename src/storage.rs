use crate::base::{Config, IxError, IxResult};
use async_trait::async_trait;
use rocket::tokio::fs;
use rusoto_core::RusotoError;
use rusoto_s3::{HeadObjectRequest, PutObjectRequest, S3, S3Client};
use slog_scope::info;
use std::path::PathBuf;
use uuid::Uuid;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> IxResult<()>;
    async fn exists(&self, key: &str) -> IxResult<bool>;
}

pub struct S3Store {
    client: S3Client,
    bucket: String,
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> IxResult<()> {
        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: String::from(key),
            content_type: Some(String::from(content_type)),
            body: Some(bytes.into()),
            ..Default::default()
        };
        self.client
            .put_object(request)
            .await
            .map_err(|e| IxError::StorageWriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> IxResult<bool> {
        let request = HeadObjectRequest {
            bucket: self.bucket.clone(),
            key: String::from(key),
            ..Default::default()
        };
        match self.client.head_object(request).await {
            Ok(_) => Ok(true),
            Err(RusotoError::Service(_)) => Ok(false),
            Err(RusotoError::Unknown(response)) if response.status.as_u16() == 404 => Ok(false),
            Err(e) => Err(IxError::StorageWriteFailed(e.to_string())),
        }
    }
}

pub struct LocalStore {
    root: PathBuf,
    bucket: String,
}

impl LocalStore {
    fn path_of(&self, key: &str) -> PathBuf {
        let mut full = self.root.clone();
        full.push(&self.bucket);
        for part in key.split('/') {
            full.push(part);
        }
        full
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, _content_type: &str, bytes: Vec<u8>) -> IxResult<()> {
        let full = self.path_of(key);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| IxError::StorageWriteFailed(e.to_string()))?;
        }
        fs::write(&full, bytes)
            .await
            .map_err(|e| IxError::StorageWriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> IxResult<bool> {
        Ok(fs::metadata(self.path_of(key)).await.is_ok())
    }
}

pub struct Placement {
    backend: Box<dyn ObjectStore>,
    bucket: String,
    base_url: String,
}

impl Placement {
    pub fn from_config(config: &Config) -> Placement {
        let bucket = config.storage_bucket.clone();
        let backend: Box<dyn ObjectStore> = match config.storage_backend.as_str() {
            "local" => {
                let root = config
                    .storage_root
                    .as_ref()
                    .expect("storage_root is required for the local backend")
                    .original()
                    .to_path_buf();
                Box::new(LocalStore {
                    root,
                    bucket: bucket.clone(),
                })
            }
            _ => Box::new(S3Store {
                client: S3Client::new(config.storage_region()),
                bucket: bucket.clone(),
            }),
        };
        Placement {
            backend,
            bucket,
            base_url: String::from(config.storage_base_url.trim_end_matches('/')),
        }
    }

    // Key layout is {owner}/{file}; an existing object is never overwritten.
    pub async fn place(
        &self,
        owner: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> IxResult<String> {
        let key = format!("{}/{}", owner, file_name);
        if self.backend.exists(&key).await? {
            return Err(IxError::StorageWriteFailed(format!(
                "object already exists at {}",
                key
            )));
        }
        let size = bytes.len();
        self.backend.put(&key, content_type, bytes).await?;
        info!("stored invoice object"; "key" => %key, "bytes" => size);
        Ok(self.public_url(&key))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, key)
    }
}
