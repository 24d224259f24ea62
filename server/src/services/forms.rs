//! Forms service
//!
//! Persists a form submission as two blobs: the avatar image, then a JSON
//! record pointing at it. The image must be stored first since the record
//! embeds its URL. Nothing is rolled back if the record upload fails, so an
//! orphaned image can be left behind.

use crate::crypto::hash_password;
use crate::error::Result;
use crate::models::{SavedForm, UploadForm};
use crate::storage::{keys, BlobStorage};
use bytes::Bytes;
use std::sync::Arc;

/// Content type of stored form records
pub const RECORD_CONTENT_TYPE: &str = "application/json";

/// Service for storing form submissions
#[derive(Clone)]
pub struct FormService {
    storage: Arc<dyn BlobStorage>,
    image_container: String,
    json_container: String,
}

impl FormService {
    pub fn new(
        storage: Arc<dyn BlobStorage>,
        image_container: impl Into<String>,
        json_container: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            image_container: image_container.into(),
            json_container: json_container.into(),
        }
    }

    /// Store a submission and return the URL of its JSON record
    pub async fn save_form(&self, form: UploadForm) -> Result<String> {
        let UploadForm {
            first_name,
            last_name,
            email,
            gender,
            password,
            avatar,
        } = form;

        tracing::info!(
            "Saving form submission (avatar: {} bytes)",
            avatar.data.len()
        );

        let image_key = keys::image_key(&avatar.file_name);
        let avatar_url = self
            .upload(
                &self.image_container,
                &image_key,
                avatar.data,
                &avatar.content_type,
            )
            .await?;

        let record = SavedForm {
            first_name,
            last_name,
            email,
            avatar_url,
            gender,
            password: hash_password(&password),
        };

        let json = serde_json::to_vec_pretty(&record)?;
        let record_key = keys::record_key();
        let record_url = self
            .upload(
                &self.json_container,
                &record_key,
                Bytes::from(json),
                RECORD_CONTENT_TYPE,
            )
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    "Record upload failed, avatar left without a record: {} ({})",
                    record.avatar_url,
                    e
                )
            })?;

        tracing::info!("Form saved: {}", record_url);

        Ok(record_url)
    }

    async fn upload(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String> {
        self.storage.ensure_container(container).await?;
        self.storage.upload(container, key, data, content_type).await
    }
}
