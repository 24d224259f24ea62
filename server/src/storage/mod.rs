//! Storage module
//!
//! Blob storage gateway used by the form workflow. Two backends implement
//! [`BlobStorage`]: Azure Blob Storage over its REST API, and a local
//! directory tree for development.

pub mod azure;
pub mod blob_store;
pub mod connection_string;
pub mod keys;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub use azure::AzureBlobStorage;
pub use blob_store::BlobStore;
pub use connection_string::ConnectionString;

/// Characters left as-is in a URL path segment (RFC 3986 unreserved)
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Join a base URL with a container and key, percent-encoding both
pub(crate) fn object_url(base: &str, container: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        utf8_percent_encode(container, PATH_SEGMENT),
        utf8_percent_encode(key, PATH_SEGMENT)
    )
}

/// Capability set the form workflow needs from a blob backend
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Create the container if it does not exist yet.
    ///
    /// Succeeds whether or not the container already existed.
    async fn ensure_container(&self, container: &str) -> Result<()>;

    /// Write `data` under `key` inside `container`, replacing any existing
    /// object, and return the URL the object can be fetched from.
    async fn upload(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String>;
}
