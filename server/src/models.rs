//! Form models
//!
//! `UploadForm` is what the client submits; `SavedForm` is the record
//! persisted to blob storage.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Content type assumed for an avatar part that declares none
pub const DEFAULT_AVATAR_CONTENT_TYPE: &str = "application/octet-stream";

/// Uploaded avatar image
#[derive(Debug, Clone)]
pub struct AvatarFile {
    /// Filename as sent by the client
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// A multipart form submission
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    /// Raw password, hashed before anything is persisted
    pub password: String,
    pub avatar: AvatarFile,
}

/// Persisted form record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SavedForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar_url: String,
    pub gender: String,
    /// SHA-256 hex digest of the submitted password
    pub password: String,
}
