//! Endpoint directory
//!
//! The provider publishes a JSON document mapping every region to the URLs
//! that serve it, partitioned by locality class:
//!
//! ```json
//! { "service-endpoints": {
//!     "cross-region": { "us": { "public": { "us-geo": "s3.us.example.com" }, "private": {} } },
//!     "regional":     { "us-south": { "public": { "us-south": "s3.us-south.example.com" } } },
//!     "single-site":  { "ams03": { "public": { "ams03": "s3.ams03.example.com" } } }
//! } }
//! ```
//!
//! The directory is fetched once per session and is read-only afterwards.

use crate::cos::error::{CosError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Resiliency tier a region belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalityClass {
    CrossRegion,
    Regional,
    SingleSite,
}

impl LocalityClass {
    /// Lookup order used when resolving a region
    pub const PRIORITY: [LocalityClass; 3] = [
        LocalityClass::CrossRegion,
        LocalityClass::Regional,
        LocalityClass::SingleSite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocalityClass::CrossRegion => "cross-region",
            LocalityClass::Regional => "regional",
            LocalityClass::SingleSite => "single-site",
        }
    }
}

/// URLs published for one region, keyed by visibility tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEndpoints {
    #[serde(default)]
    pub public: BTreeMap<String, String>,
    #[serde(default)]
    pub private: BTreeMap<String, String>,
    #[serde(default)]
    pub direct: BTreeMap<String, String>,
}

/// Region topology of the storage service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDirectory {
    #[serde(rename = "cross-region", default)]
    pub cross_region: HashMap<String, RegionEndpoints>,
    #[serde(default)]
    pub regional: HashMap<String, RegionEndpoints>,
    #[serde(rename = "single-site", default)]
    pub single_site: HashMap<String, RegionEndpoints>,
}

#[derive(Deserialize)]
struct DirectoryDocument {
    #[serde(rename = "service-endpoints")]
    service_endpoints: EndpointDirectory,
}

impl EndpointDirectory {
    /// Fetch and parse the directory with a single GET.
    ///
    /// Transport failures (including the timeout) map to
    /// [`CosError::DirectoryFetch`]; a non-2xx status or an unexpected body
    /// maps to [`CosError::DirectoryParse`].
    pub async fn fetch(url: &str, timeout: Duration) -> Result<Self> {
        let fetch_error = |e: reqwest::Error| CosError::DirectoryFetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(fetch_error)?;

        tracing::info!("Fetching endpoint directory from {}", url);

        let response = client.get(url).send().await.map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CosError::DirectoryParse {
                url: url.to_string(),
                message: format!("unexpected status {}", status),
            });
        }

        let body = response.text().await.map_err(fetch_error)?;
        let directory = Self::from_json(&body).map_err(|e| match e {
            CosError::DirectoryParse { message, .. } => CosError::DirectoryParse {
                url: url.to_string(),
                message,
            },
            other => other,
        })?;

        tracing::debug!(
            "Endpoint directory loaded: {} cross-region, {} regional, {} single-site regions",
            directory.cross_region.len(),
            directory.regional.len(),
            directory.single_site.len()
        );

        Ok(directory)
    }

    /// Parse a directory document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: DirectoryDocument =
            serde_json::from_str(json).map_err(|e| CosError::DirectoryParse {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(document.service_endpoints)
    }

    /// Region entries of one locality class
    pub fn class(&self, class: LocalityClass) -> &HashMap<String, RegionEndpoints> {
        match class {
            LocalityClass::CrossRegion => &self.cross_region,
            LocalityClass::Regional => &self.regional,
            LocalityClass::SingleSite => &self.single_site,
        }
    }

    /// Find a region, searching locality classes in [`LocalityClass::PRIORITY`] order
    pub fn lookup(&self, region: &str) -> Option<(LocalityClass, &RegionEndpoints)> {
        LocalityClass::PRIORITY
            .iter()
            .find_map(|class| self.class(*class).get(region).map(|entry| (*class, entry)))
    }

    /// All region keys, sorted
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = LocalityClass::PRIORITY
            .iter()
            .flat_map(|class| self.class(*class).keys().map(String::as_str))
            .collect();
        regions.sort_unstable();
        regions.dedup();
        regions
    }
}
