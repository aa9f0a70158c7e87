use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::{byte_stream::ByteStream, DateTime};
use axum::{async_trait, body::Body};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::info;

use crate::config::StorageConfig;

/// An object opened for reading; `body` streams from the store.
pub struct StoredObject {
    pub body: Body,
    pub content_type: String,
    pub last_modified: OffsetDateTime,
}

/// Object store holding uploaded files. Missing keys are `Ok(None)`.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn get_object(&self, key: &str) -> anyhow::Result<Option<StoredObject>>;
    async fn object_last_modified(&self, key: &str) -> anyhow::Result<Option<OffsetDateTime>>;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
        })
    }

    /// Creates the bucket unless it already exists.
    pub async fn ensure_bucket(&self) -> anyhow::Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => {
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .context("s3 create_bucket")?;
                info!(bucket = %self.bucket, "bucket created");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("s3 head_bucket")),
        }
    }
}

fn to_offset(dt: Option<&DateTime>) -> anyhow::Result<OffsetDateTime> {
    match dt {
        Some(dt) => OffsetDateTime::from_unix_timestamp(dt.secs()).context("object timestamp"),
        None => Ok(OffsetDateTime::UNIX_EPOCH),
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> anyhow::Result<Option<StoredObject>> {
        let out = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(out) => out,
            Err(e) if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) => {
                return Ok(None)
            }
            Err(e) => return Err(anyhow::Error::new(e).context("s3 get_object")),
        };

        let content_type = out
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let last_modified = to_offset(out.last_modified())?;
        let chunks = futures::stream::unfold(out.body, |mut body| async move {
            body.next().await.map(|chunk| (chunk, body))
        });
        Ok(Some(StoredObject {
            body: Body::from_stream(chunks),
            content_type,
            last_modified,
        }))
    }

    async fn object_last_modified(&self, key: &str) -> anyhow::Result<Option<OffsetDateTime>> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(out) => to_offset(out.last_modified()).map(Some),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("s3 head_object")),
        }
    }
}
