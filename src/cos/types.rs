//! Bucket and object data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A bucket as reported by the extended bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDescriptor {
    pub name: String,
    /// Region and storage class, e.g. `us-south-standard`
    #[serde(default)]
    pub location_constraint: String,
    /// Explicit region override; takes precedence over the location constraint
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
}

impl BucketDescriptor {
    pub fn new(name: &str, location_constraint: &str) -> Self {
        Self {
            name: name.to_string(),
            location_constraint: location_constraint.to_string(),
            ..Default::default()
        }
    }
}

/// An entry of an object listing (file or folder)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub is_folder: bool,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
}

impl ObjectEntry {
    /// Get a human-readable size string
    pub fn size_string(&self) -> String {
        if self.is_folder {
            return String::from("-");
        }

        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size >= GB {
            format!("{:.2} GB", self.size as f64 / GB as f64)
        } else if self.size >= MB {
            format!("{:.2} MB", self.size as f64 / MB as f64)
        } else if self.size >= KB {
            format!("{:.2} KB", self.size as f64 / KB as f64)
        } else {
            format!("{} B", self.size)
        }
    }
}

/// One page of an object listing
#[derive(Debug, Clone, Default)]
pub struct ListObjectsResult {
    pub objects: Vec<ObjectEntry>,
    /// Continuation token for the next page
    pub next_token: Option<String>,
    pub is_truncated: bool,
}

/// Object metadata returned by a HEAD request
#[derive(Debug, Clone, Default)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

/// Optional fields of an upload
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    /// User metadata, sent as `x-amz-meta-*` headers
    pub metadata: HashMap<String, String>,
}

impl PutOptions {
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// `cos://bucket/key` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosUrl {
    pub bucket: String,
    pub key: String,
}

impl CosUrl {
    /// Parse a `cos://` or `s3://` URL
    pub fn parse(url: &str) -> Option<Self> {
        let rest = url
            .strip_prefix("cos://")
            .or_else(|| url.strip_prefix("s3://"))?;

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return None;
        }

        Some(CosUrl {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl std::fmt::Display for CosUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "cos://{}", self.bucket)
        } else {
            write!(f, "cos://{}/{}", self.bucket, self.key)
        }
    }
}

/// Convert an SDK timestamp to chrono
pub(crate) fn to_chrono(d: &aws_sdk_s3::primitives::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(d.secs(), d.subsec_nanos()).unwrap_or_default()
}
