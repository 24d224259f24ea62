//! HTTP routes
//!
//! - `forms`: the multipart form endpoint
//!
//! The router also serves the local blob directory (when that backend is
//! active) and an optional static site for every other path.

pub mod forms;

use crate::app::AppState;
use crate::config::{ServerConfig, LOCAL_BLOB_ROUTE};
use crate::error::{AppError, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::post;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use forms::post_form;

/// Build the application router
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let local_blob_root = state.local_blob_root.clone();

    let mut app = Router::new()
        .route("/form", post(post_form))
        .with_state(state);

    if let Some(root) = local_blob_root {
        app = app.nest_service(LOCAL_BLOB_ROUTE, ServeDir::new(root));
    }

    if let Some(static_dir) = &config.static_dir {
        tracing::info!("Serving static files from {:?}", static_dir);
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    Ok(app
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins)?)
        .layer(TraceLayer::new_for_http()))
}

/// CORS for the configured front-end origins, with credentials
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            if origin.trim() == "*" {
                return Err(AppError::Config(
                    "wildcard origin cannot be combined with credentials".to_string(),
                ));
            }
            HeaderValue::from_str(origin)
                .map_err(|e| AppError::Config(format!("Invalid CORS origin {:?}: {}", origin, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
