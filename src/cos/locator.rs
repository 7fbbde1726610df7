//! Bucket region derivation and regional URL lookup

use crate::cos::directory::EndpointDirectory;
use crate::cos::error::{CosError, Result};
use crate::cos::types::BucketDescriptor;

/// Visibility tag preferred when a region publishes several public URLs
pub const PREFERRED_PUBLIC_TAG: &str = "default";

/// Region key of a bucket.
///
/// An explicit `region` is used verbatim. Otherwise the region is the part of
/// the location constraint before its last hyphen, so `us-south-standard`
/// becomes `us-south`.
pub fn region_of(descriptor: &BucketDescriptor) -> Result<String> {
    if let Some(region) = descriptor.region.as_deref().filter(|r| !r.is_empty()) {
        return Ok(region.to_string());
    }

    match descriptor.location_constraint.rfind('-') {
        Some(idx) if idx > 0 => Ok(descriptor.location_constraint[..idx].to_string()),
        _ => Err(CosError::MalformedLocation {
            bucket: descriptor.name.clone(),
            constraint: descriptor.location_constraint.clone(),
        }),
    }
}

/// Public URL serving `region`.
///
/// Locality classes are searched cross-region, regional, single-site; the
/// first hit wins. Within the region's `public` map the `default` tag is
/// taken if present, else the lexicographically smallest tag.
pub fn resolve_url(directory: &EndpointDirectory, region: &str) -> Result<String> {
    let (class, entry) = directory
        .lookup(region)
        .ok_or_else(|| CosError::RegionNotFound(region.to_string()))?;

    let url = entry
        .public
        .get(PREFERRED_PUBLIC_TAG)
        .or_else(|| entry.public.values().next())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| CosError::NoPublicEndpoint(region.to_string()))?;

    let url = normalize_endpoint(url);
    tracing::debug!("Region {} ({}) resolves to {}", region, class.as_str(), url);
    Ok(url)
}

/// The directory publishes bare host names; the SDK needs absolute URLs.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    match endpoint.split_once("://") {
        Some((scheme, rest))
            if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http") =>
        {
            format!("{}://{}", scheme.to_ascii_lowercase(), rest)
        }
        _ => format!("https://{}", endpoint),
    }
}
