//! Object storage access layer
//!
//! This module provides:
//! - [`credentials`] - service credential parsing and IAM/HMAC mode selection
//! - [`client::CosClient`] - authenticated handle bound to one endpoint
//! - [`directory::EndpointDirectory`] - published region topology
//! - [`locator`] - bucket region derivation and regional URL lookup
//! - [`binder::EndpointBinder`] - per-bucket endpoint binding
//! - [`session::CosSession`] - bucket-scoped operations for request handlers

pub mod binder;
pub mod client;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod locator;
pub mod session;
pub mod token;
pub mod types;

// Re-export commonly used types
pub use binder::{BucketLocation, EndpointBinder, RegionalClient};
pub use client::{ClientOptions, CosClient};
pub use credentials::{resolve, AuthMode, ResolvedCredential, ServiceCredential};
pub use directory::{EndpointDirectory, LocalityClass, RegionEndpoints};
pub use error::{CosError, Result};
pub use session::CosSession;
pub use types::{BucketDescriptor, CosUrl, ListObjectsResult, ObjectEntry, ObjectInfo, PutOptions};
