//! Storage client handle
//!
//! [`CosClient`] wraps an `aws_sdk_s3::Client` bound to one endpoint. HMAC
//! credentials are handed to the SDK and requests are SigV4 signed. IAM
//! credentials are exchanged for a bearer token which is attached to every
//! request by an interceptor, with SigV4 signing switched off.

use crate::cos::credentials::{AuthMode, ResolvedCredential};
use crate::cos::error::{CosError, Result};
use crate::cos::token::{IamTokenProvider, DEFAULT_IAM_TOKEN_URL};
use crate::cos::types::{
    to_chrono, BucketDescriptor, ListObjectsResult, ObjectEntry, ObjectInfo, PutOptions,
};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::interceptors::{
    AfterDeserializationInterceptorContextRef, BeforeTransmitInterceptorContextMut,
};
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{ConfigBag, Credentials, Intercept, Region, RuntimeComponents};
use aws_sdk_s3::error::{BoxError, DisplayErrorContext};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Region identifier the storage API expects in every request
pub const DEFAULT_SIGNING_REGION: &str = "ibm";

/// Construction options shared by every handle derived from a client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub signing_region: String,
    pub force_path_style: bool,
    /// Bound on each storage call, retries included
    pub request_timeout: Duration,
    pub iam_token_url: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            signing_region: DEFAULT_SIGNING_REGION.to_string(),
            force_path_style: false,
            request_timeout: Duration::from_secs(30),
            iam_token_url: DEFAULT_IAM_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Clone)]
enum Auth {
    Hmac,
    Iam {
        tokens: Arc<IamTokenProvider>,
        service_instance_id: String,
    },
}

/// Authenticated storage client bound to a single endpoint
#[derive(Clone)]
pub struct CosClient {
    inner: Client,
    endpoint: String,
    auth: Auth,
}

impl CosClient {
    /// Build a client for `endpoint`. No request is sent until the first operation.
    pub async fn build(
        endpoint: &str,
        credential: &ResolvedCredential,
        options: &ClientOptions,
    ) -> Result<Self> {
        let endpoint = validate_endpoint(endpoint)?;

        let loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(options.signing_region.clone()))
            .endpoint_url(&endpoint)
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(options.request_timeout)
                    .build(),
            );

        let (loader, auth) = match credential {
            ResolvedCredential::Hmac {
                access_key_id,
                secret_access_key,
            } => {
                let credentials =
                    Credentials::new(access_key_id, secret_access_key, None, None, "cos-hmac");
                (loader.credentials_provider(credentials), Auth::Hmac)
            }
            ResolvedCredential::Iam {
                api_key,
                resource_instance_id,
            } => {
                let tokens =
                    IamTokenProvider::new(api_key, &options.iam_token_url, options.request_timeout)?;
                let auth = Auth::Iam {
                    tokens: Arc::new(tokens),
                    service_instance_id: resource_instance_id.clone(),
                };
                (loader.no_credentials(), auth)
            }
        };

        let sdk_config = loader.load().await;
        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(options.force_path_style)
            .build();

        tracing::debug!(
            "Built {} client for {}",
            credential.mode().as_str(),
            endpoint
        );

        Ok(Self {
            inner: Client::from_conf(config),
            endpoint,
            auth,
        })
    }

    /// A handle sharing this client's credentials but bound to another endpoint
    pub fn with_endpoint(&self, endpoint: &str) -> Result<Self> {
        let endpoint = validate_endpoint(endpoint)?;
        if endpoint == self.endpoint {
            return Ok(self.clone());
        }

        let config = self
            .inner
            .config()
            .to_builder()
            .endpoint_url(&endpoint)
            .build();

        Ok(Self {
            inner: Client::from_conf(config),
            endpoint,
            auth: self.auth.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn auth_mode(&self) -> AuthMode {
        match self.auth {
            Auth::Hmac => AuthMode::Hmac,
            Auth::Iam { .. } => AuthMode::Iam,
        }
    }

    /// Headers needed by the current auth mode, fetching a token if required
    async fn auth_headers(&self) -> Result<AuthHeaders> {
        match &self.auth {
            Auth::Hmac => Ok(AuthHeaders::default()),
            Auth::Iam {
                tokens,
                service_instance_id,
            } => Ok(AuthHeaders {
                bearer: Some(tokens.token().await?),
                service_instance_id: service_instance_id.clone(),
            }),
        }
    }

    /// List buckets whose name starts with `prefix`, including their location constraints
    pub async fn list_buckets_extended(&self, prefix: &str) -> Result<Vec<BucketDescriptor>> {
        let capture = ExtendedListing::default();

        let mut request = self.inner.list_buckets();
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }

        let response = request
            .customize()
            .interceptor(capture.clone())
            .interceptor(self.auth_headers().await?)
            .send()
            .await
            .map_err(|e| CosError::storage("ListBuckets", DisplayErrorContext(e)))?;

        if let Some(body) = capture.take()? {
            let xml = String::from_utf8_lossy(&body);
            return parse_extended_listing(&xml);
        }

        tracing::warn!("Extended bucket listing body unavailable, location constraints unknown");
        Ok(response
            .buckets()
            .iter()
            .map(|b| BucketDescriptor {
                name: b.name().unwrap_or_default().to_string(),
                creation_date: b.creation_date().map(to_chrono),
                ..Default::default()
            })
            .collect())
    }

    /// List all buckets of the service instance
    pub async fn list_buckets(&self) -> Result<Vec<BucketDescriptor>> {
        self.list_buckets_extended("").await
    }

    /// Create a bucket, optionally with a location constraint such as `us-south-standard`
    pub async fn create_bucket(&self, bucket: &str, location_constraint: Option<&str>) -> Result<()> {
        let mut request = self.inner.create_bucket().bucket(bucket);

        if let Some(constraint) = location_constraint {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(constraint))
                    .build(),
            );
        }

        request
            .customize()
            .interceptor(self.auth_headers().await?)
            .send()
            .await
            .map_err(|e| CosError::storage("CreateBucket", DisplayErrorContext(e)))?;

        Ok(())
    }

    /// List objects in a bucket with optional prefix, one page at a time
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> Result<ListObjectsResult> {
        let mut request = self
            .inner
            .list_objects_v2()
            .bucket(bucket)
            .delimiter("/")
            .max_keys(max_keys);

        if let Some(p) = prefix {
            request = request.prefix(p);
        }

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .customize()
            .interceptor(self.auth_headers().await?)
            .send()
            .await
            .map_err(|e| CosError::storage("ListObjectsV2", DisplayErrorContext(e)))?;

        let mut objects = Vec::new();

        // Common prefixes are folders
        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                objects.push(ObjectEntry {
                    key: p.to_string(),
                    size: 0,
                    last_modified: None,
                    is_folder: true,
                    etag: None,
                    storage_class: None,
                });
            }
        }

        for obj in response.contents() {
            objects.push(ObjectEntry {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0).max(0) as u64,
                last_modified: obj.last_modified().map(to_chrono),
                is_folder: false,
                etag: obj.e_tag().map(|s| s.to_string()),
                storage_class: obj.storage_class().map(|s| s.as_str().to_string()),
            });
        }

        Ok(ListObjectsResult {
            objects,
            next_token: response.next_continuation_token().map(|s| s.to_string()),
            is_truncated: response.is_truncated().unwrap_or(false),
        })
    }

    /// Download an object to bytes
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .customize()
            .interceptor(self.auth_headers().await?)
            .send()
            .await
            .map_err(|e| CosError::storage("GetObject", DisplayErrorContext(e)))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| CosError::storage("GetObject", e))?;
        Ok(data.into_bytes().to_vec())
    }

    /// Object metadata, or `None` if the object does not exist
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
        let result = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .customize()
            .interceptor(self.auth_headers().await?)
            .send()
            .await;

        match result {
            Ok(response) => Ok(Some(ObjectInfo {
                key: key.to_string(),
                size: response.content_length().unwrap_or(0).max(0) as u64,
                content_type: response.content_type().map(|s| s.to_string()),
                etag: response.e_tag().map(|s| s.to_string()),
                last_modified: response.last_modified().map(to_chrono),
                metadata: response.metadata().cloned().unwrap_or_default(),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(CosError::storage("HeadObject", DisplayErrorContext(e))),
        }
    }

    pub async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.head_object(bucket, key).await?.is_some())
    }

    /// Upload bytes as an object
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &PutOptions,
    ) -> Result<()> {
        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .set_content_type(options.content_type.clone());

        if !options.metadata.is_empty() {
            request = request.set_metadata(Some(options.metadata.clone()));
        }

        request
            .customize()
            .interceptor(self.auth_headers().await?)
            .send()
            .await
            .map_err(|e| CosError::storage("PutObject", DisplayErrorContext(e)))?;

        Ok(())
    }

    /// Delete an object
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .customize()
            .interceptor(self.auth_headers().await?)
            .send()
            .await
            .map_err(|e| CosError::storage("DeleteObject", DisplayErrorContext(e)))?;

        Ok(())
    }
}

impl fmt::Debug for CosClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosClient")
            .field("endpoint", &self.endpoint)
            .field("auth_mode", &self.auth_mode())
            .finish()
    }
}

/// Accepts absolute http(s) URLs or bare host names (taken as https)
fn validate_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = crate::cos::locator::normalize_endpoint(endpoint.trim());
    let parsed = url::Url::parse(&endpoint)
        .map_err(|e| CosError::ClientConstruction(format!("invalid endpoint '{}': {}", endpoint, e)))?;

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(CosError::ClientConstruction(format!(
            "endpoint '{}' has no host",
            endpoint
        )));
    }

    Ok(endpoint)
}

/// Adds IAM bearer headers to a request; does nothing for HMAC handles
#[derive(Clone, Default)]
struct AuthHeaders {
    bearer: Option<String>,
    service_instance_id: String,
}

impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("has_bearer", &self.bearer.is_some())
            .field("service_instance_id", &self.service_instance_id)
            .finish()
    }
}

impl Intercept for AuthHeaders {
    fn name(&self) -> &'static str {
        "CosAuthHeaders"
    }

    fn modify_before_transmit(
        &self,
        context: &mut BeforeTransmitInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> std::result::Result<(), BoxError> {
        let Some(bearer) = &self.bearer else {
            return Ok(());
        };

        let headers = context.request_mut().headers_mut();
        headers.try_insert("authorization", format!("Bearer {}", bearer))?;
        if !self.service_instance_id.is_empty() {
            headers.try_insert("ibm-service-instance-id", self.service_instance_id.clone())?;
        }
        Ok(())
    }
}

/// Turns a ListBuckets call into the extended variant and keeps the raw
/// response body, since the SDK model has no location constraint field.
#[derive(Debug, Clone, Default)]
struct ExtendedListing {
    body: Arc<Mutex<Option<Bytes>>>,
}

impl ExtendedListing {
    fn take(&self) -> Result<Option<Bytes>> {
        let mut body = self
            .body
            .lock()
            .map_err(|_| CosError::storage("ListBuckets", "extended listing buffer poisoned"))?;
        Ok(body.take())
    }
}

impl Intercept for ExtendedListing {
    fn name(&self) -> &'static str {
        "CosExtendedListing"
    }

    fn modify_before_signing(
        &self,
        context: &mut BeforeTransmitInterceptorContextMut<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> std::result::Result<(), BoxError> {
        let request = context.request_mut();
        let uri = request.uri().to_string();
        let separator = if uri.contains('?') { '&' } else { '?' };
        request.set_uri(format!("{}{}extended", uri, separator))?;
        Ok(())
    }

    fn read_after_deserialization(
        &self,
        context: &AfterDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> std::result::Result<(), BoxError> {
        if let Some(bytes) = context.response().body().bytes() {
            let mut body = self
                .body
                .lock()
                .map_err(|_| "extended listing buffer poisoned")?;
            *body = Some(Bytes::copy_from_slice(bytes));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExtendedBucketList {
    #[serde(default)]
    buckets: ExtendedBuckets,
}

#[derive(Deserialize, Default)]
struct ExtendedBuckets {
    #[serde(rename = "Bucket", default)]
    bucket: Vec<ExtendedBucket>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExtendedBucket {
    name: String,
    #[serde(default)]
    creation_date: Option<String>,
    #[serde(default)]
    location_constraint: String,
}

/// Parse the XML body of an extended bucket listing
pub(crate) fn parse_extended_listing(xml: &str) -> Result<Vec<BucketDescriptor>> {
    let list: ExtendedBucketList = quick_xml::de::from_str(xml)
        .map_err(|e| CosError::storage("ListBuckets", format!("malformed extended listing: {}", e)))?;

    Ok(list
        .buckets
        .bucket
        .into_iter()
        .map(|b| BucketDescriptor {
            name: b.name,
            location_constraint: b.location_constraint,
            region: None,
            creation_date: b
                .creation_date
                .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
                .map(|d| d.with_timezone(&Utc)),
        })
        .collect())
}
