//! Bucket-scoped operations with endpoint binding
//!
//! A [`CosSession`] is what request handlers hold. It owns the base client
//! and the endpoint directory; each bucket-scoped call binds a fresh handle
//! to the bucket's region and runs the operation on it.

use crate::cos::binder::{BucketLocation, EndpointBinder};
use crate::cos::client::CosClient;
use crate::cos::credentials::{resolve, ServiceCredential};
use crate::cos::directory::EndpointDirectory;
use crate::cos::error::Result;
use crate::cos::locator::{region_of, resolve_url};
use crate::cos::types::{BucketDescriptor, ListObjectsResult, ObjectInfo, PutOptions};
use crate::settings::Settings;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CosSession {
    base: CosClient,
    binder: EndpointBinder,
}

impl CosSession {
    /// Resolve the credential, build the base client and fetch the endpoint directory.
    ///
    /// Fails if the directory cannot be loaded; bucket-scoped operations
    /// cannot work without it.
    pub async fn connect(settings: &Settings, credential: &ServiceCredential) -> Result<Self> {
        let resolved = resolve(credential)?;
        let base = CosClient::build(
            &settings.default_endpoint,
            &resolved,
            &settings.client_options(),
        )
        .await?;

        let directory_url = settings.directory_url_for(credential);
        let directory = EndpointDirectory::fetch(&directory_url, settings.directory_timeout()).await?;

        tracing::info!(
            "Session ready: {} auth, {} regions known",
            resolved.mode().as_str(),
            directory.regions().len()
        );

        Ok(Self::from_parts(base, Arc::new(directory)))
    }

    pub fn from_parts(base: CosClient, directory: Arc<EndpointDirectory>) -> Self {
        Self {
            base,
            binder: EndpointBinder::new(directory),
        }
    }

    pub fn base_client(&self) -> &CosClient {
        &self.base
    }

    pub fn directory(&self) -> &EndpointDirectory {
        self.binder.directory()
    }

    /// Client bound to the endpoint of `bucket`
    pub async fn client_for(&self, bucket: &str) -> Result<CosClient> {
        self.binder.bind(&self.base, bucket).await
    }

    pub async fn locate(&self, bucket: &str) -> Result<BucketLocation> {
        self.binder.locate(&self.base, bucket).await
    }

    pub async fn list_buckets(&self, prefix: &str) -> Result<Vec<BucketDescriptor>> {
        self.base.list_buckets_extended(prefix).await
    }

    /// Create a bucket. With a location constraint the request goes to the
    /// endpoint of the constraint's region.
    pub async fn create_bucket(&self, bucket: &str, location_constraint: Option<&str>) -> Result<()> {
        let client = match location_constraint {
            Some(constraint) => {
                let descriptor = BucketDescriptor::new(bucket, constraint);
                let region = region_of(&descriptor)?;
                let endpoint = resolve_url(self.directory(), &region)?;
                self.base.with_endpoint(&endpoint)?
            }
            None => self.base.clone(),
        };
        client.create_bucket(bucket, location_constraint).await
    }

    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<()> {
        let client = self.client_for(bucket).await?;
        tracing::debug!("PUT {}/{} ({} bytes) via {}", bucket, key, data.len(), client.endpoint());
        client.put_object(bucket, key, data, options).await
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.client_for(bucket).await?.get_object(bucket, key).await
    }

    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
        self.client_for(bucket).await?.head_object(bucket, key).await
    }

    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client_for(bucket).await?.delete_object(bucket, key).await
    }

    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> Result<ListObjectsResult> {
        self.client_for(bucket)
            .await?
            .list_objects(bucket, prefix, continuation_token, max_keys)
            .await
    }
}
