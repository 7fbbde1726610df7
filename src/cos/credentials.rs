//! Service credential loading and authentication mode selection
//!
//! A service credential is the JSON document the provider issues for a
//! storage instance. It carries one or both of:
//! - an IAM API key plus the resource instance id it belongs to
//! - an HMAC key pair (`cos_hmac_keys`) for SigV4-signed requests
//!
//! [`resolve`] picks exactly one of them, preferring the API key.

use crate::cos::error::{CosError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Authentication scheme used by a client handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMode {
    /// API key exchanged for a bearer token
    Iam,
    /// Static access key / secret key pair
    Hmac,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Iam => "IAM",
            AuthMode::Hmac => "HMAC",
        }
    }
}

/// HMAC key pair as it appears in a service credential
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct HmacKeys {
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
}

/// Service credential document
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ServiceCredential {
    #[serde(default, rename = "apikey")]
    pub api_key: String,
    #[serde(default)]
    pub resource_instance_id: String,
    #[serde(default, rename = "cos_hmac_keys")]
    pub hmac: HmacKeys,
    /// URL of the endpoint directory for this instance
    #[serde(default)]
    pub endpoints: Option<String>,
}

impl ServiceCredential {
    /// Parse a service credential from its JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CosError::Credential(format!("invalid credential document: {}", e)))
    }

    /// Load a service credential from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CosError::Settings(format!("failed to read credentials from {:?}: {}", path, e))
        })?;
        Self::from_json(&contents)
    }

    /// Credential using API key authentication
    pub fn iam(api_key: &str, resource_instance_id: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            resource_instance_id: resource_instance_id.to_string(),
            ..Default::default()
        }
    }

    /// Credential using an HMAC key pair
    pub fn hmac(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            hmac: HmacKeys {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
            },
            ..Default::default()
        }
    }
}

impl fmt::Debug for ServiceCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredential")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("resource_instance_id", &self.resource_instance_id)
            .field("has_hmac_keys", &!self.hmac.access_key_id.is_empty())
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Authentication material selected from a [`ServiceCredential`]
#[derive(Clone, PartialEq, Eq)]
pub enum ResolvedCredential {
    Iam {
        api_key: String,
        resource_instance_id: String,
    },
    Hmac {
        access_key_id: String,
        secret_access_key: String,
    },
}

impl ResolvedCredential {
    pub fn mode(&self) -> AuthMode {
        match self {
            ResolvedCredential::Iam { .. } => AuthMode::Iam,
            ResolvedCredential::Hmac { .. } => AuthMode::Hmac,
        }
    }
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedCredential::Iam {
                resource_instance_id,
                ..
            } => f
                .debug_struct("Iam")
                .field("api_key", &"<redacted>")
                .field("resource_instance_id", resource_instance_id)
                .finish(),
            ResolvedCredential::Hmac { access_key_id, .. } => f
                .debug_struct("Hmac")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Select the authentication mode for a credential.
///
/// A non-empty API key always wins, whatever HMAC fields are present. The
/// resource instance id is not checked here; an empty one fails when the
/// first request is sent.
pub fn resolve(credential: &ServiceCredential) -> Result<ResolvedCredential> {
    let resolved = if !credential.api_key.is_empty() {
        ResolvedCredential::Iam {
            api_key: credential.api_key.clone(),
            resource_instance_id: credential.resource_instance_id.clone(),
        }
    } else if !credential.hmac.access_key_id.is_empty() {
        ResolvedCredential::Hmac {
            access_key_id: credential.hmac.access_key_id.clone(),
            secret_access_key: credential.hmac.secret_access_key.clone(),
        }
    } else {
        return Err(CosError::Credential(
            "credential has neither an apikey nor cos_hmac_keys.access_key_id".to_string(),
        ));
    };

    tracing::debug!("Resolved credential mode: {}", resolved.mode().as_str());
    Ok(resolved)
}
