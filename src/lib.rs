//! Region-aware access layer for IBM Cloud Object Storage style services
//!
//! Resolves service credentials to an authentication mode, discovers the
//! regional endpoint of each bucket from the published endpoint directory,
//! and runs object operations against the right region.

pub mod cos;
pub mod settings;
