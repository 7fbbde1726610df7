//! Per-bucket endpoint binding
//!
//! Before a bucket-scoped operation, the binder looks the bucket up in the
//! extended bucket listing, derives its region, resolves the region's public
//! URL and hands back a handle bound to it. The base handle is never
//! mutated, so operations against buckets in different regions can run
//! concurrently from the same base.

use crate::cos::client::CosClient;
use crate::cos::directory::EndpointDirectory;
use crate::cos::error::{CosError, Result};
use crate::cos::locator::{region_of, resolve_url};
use crate::cos::types::BucketDescriptor;
use async_trait::async_trait;
use std::sync::Arc;

/// A client handle that can list buckets and be re-targeted at another endpoint
#[async_trait]
pub trait RegionalClient: Sized + Send + Sync {
    fn endpoint(&self) -> &str;

    /// New handle bound to `endpoint`, sharing this handle's credentials
    fn with_endpoint(&self, endpoint: &str) -> Result<Self>;

    /// Buckets whose name starts with `prefix`, with location constraints
    async fn list_buckets_extended(&self, prefix: &str) -> Result<Vec<BucketDescriptor>>;
}

#[async_trait]
impl RegionalClient for CosClient {
    fn endpoint(&self) -> &str {
        CosClient::endpoint(self)
    }

    fn with_endpoint(&self, endpoint: &str) -> Result<Self> {
        CosClient::with_endpoint(self, endpoint)
    }

    async fn list_buckets_extended(&self, prefix: &str) -> Result<Vec<BucketDescriptor>> {
        CosClient::list_buckets_extended(self, prefix).await
    }
}

/// Where a bucket lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLocation {
    pub bucket: BucketDescriptor,
    pub region: String,
    pub endpoint: String,
}

/// Resolves bucket endpoints against a shared endpoint directory
#[derive(Debug, Clone)]
pub struct EndpointBinder {
    directory: Arc<EndpointDirectory>,
}

impl EndpointBinder {
    pub fn new(directory: Arc<EndpointDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &EndpointDirectory {
        &self.directory
    }

    /// Find `bucket` and the endpoint serving it
    pub async fn locate<C: RegionalClient>(&self, client: &C, bucket: &str) -> Result<BucketLocation> {
        let candidates = client.list_buckets_extended(bucket).await?;
        let descriptor = select_bucket(candidates, bucket)?;
        let region = region_of(&descriptor)?;
        let endpoint = resolve_url(&self.directory, &region)?;

        tracing::debug!(
            "Bucket {} is in region {} served by {}",
            descriptor.name,
            region,
            endpoint
        );

        Ok(BucketLocation {
            bucket: descriptor,
            region,
            endpoint,
        })
    }

    /// A handle derived from `base` and bound to the endpoint of `bucket`
    pub async fn bind<C: RegionalClient>(&self, base: &C, bucket: &str) -> Result<C> {
        let location = self.locate(base, bucket).await?;
        base.with_endpoint(&location.endpoint)
    }

    /// Re-target `handle` at the endpoint of `bucket`.
    ///
    /// On failure the handle keeps its previous endpoint.
    pub async fn rebind<C: RegionalClient>(&self, handle: &mut C, bucket: &str) -> Result<()> {
        let bound = self.bind(handle, bucket).await?;
        *handle = bound;
        Ok(())
    }
}

/// An exact name match wins; otherwise the first listed bucket is taken.
fn select_bucket(mut candidates: Vec<BucketDescriptor>, bucket: &str) -> Result<BucketDescriptor> {
    if let Some(exact) = candidates.iter().position(|b| b.name == bucket) {
        return Ok(candidates.swap_remove(exact));
    }

    match candidates.into_iter().next() {
        Some(first) => {
            tracing::warn!(
                "No bucket named exactly '{}', using first prefix match '{}'",
                bucket,
                first.name
            );
            Ok(first)
        }
        None => Err(CosError::BucketNotFound(bucket.to_string())),
    }
}
