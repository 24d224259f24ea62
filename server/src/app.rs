//! Application state and initialization
//!
//! This module builds the storage backend selected by the configuration and
//! wires it into the services shared by every request.

use crate::config::{AppConfig, BackendConfig};
use crate::error::Result;
use crate::services::FormService;
use crate::storage::{AzureBlobStorage, BlobStorage, BlobStore, ConnectionString};
use std::path::PathBuf;
use std::sync::Arc;

/// Central application state shared by all request handlers
#[derive(Clone)]
pub struct AppState {
    pub forms_service: FormService,
    /// Root of the local blob directory, when that backend is active
    pub local_blob_root: Option<PathBuf>,
}

/// Application setup - called once on startup
pub async fn setup(config: &AppConfig) -> Result<AppState> {
    tracing::info!("Initializing application");

    let mut local_blob_root = None;
    let storage: Arc<dyn BlobStorage> = match &config.storage.backend {
        BackendConfig::Azure { connection_string } => {
            let connection: ConnectionString = connection_string.parse()?;
            tracing::info!("Using Azure blob storage at {}", connection.blob_endpoint);
            Arc::new(AzureBlobStorage::new(connection)?)
        }
        BackendConfig::Local { root, .. } => {
            let store = BlobStore::new(root.clone(), config.local_public_base_url());
            store.initialize().await?;
            local_blob_root = Some(root.clone());
            Arc::new(store)
        }
    };

    let forms_service = FormService::new(
        storage,
        config.storage.image_container.clone(),
        config.storage.json_container.clone(),
    );

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        forms_service,
        local_blob_root,
    })
}
