//! Azure Blob Storage backend
//!
//! Talks to the Blob service REST API directly over reqwest. Requests are
//! authorized either with a Shared Key signature or with a SAS token taken
//! from the connection string.

use crate::crypto::sign_hmac_sha256;
use crate::error::{AppError, Result};
use crate::storage::connection_string::{ConnectionString, Credentials};
use crate::storage::{object_url, BlobStorage};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};

/// REST API version sent with every request
pub const API_VERSION: &str = "2021-08-06";

const ERROR_CODE_HEADER: &str = "x-ms-error-code";
const CONTAINER_EXISTS: &str = "ContainerAlreadyExists";

/// Blob storage gateway backed by an Azure Storage account
#[derive(Clone)]
pub struct AzureBlobStorage {
    client: reqwest::Client,
    connection: ConnectionString,
}

impl AzureBlobStorage {
    pub fn new(connection: ConnectionString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("form-uploader/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, connection))
    }

    pub fn with_client(client: reqwest::Client, connection: ConnectionString) -> Self {
        Self { client, connection }
    }

    /// URL an object is reachable at (never carries the SAS token)
    pub fn blob_url(&self, container: &str, key: &str) -> String {
        object_url(&self.connection.blob_endpoint, container, key)
    }

    fn container_url(&self, container: &str) -> Result<Url> {
        // Reuse the object URL encoding, then drop the empty key segment
        let url = object_url(&self.connection.blob_endpoint, container, "");
        let url = format!("{}?restype=container", url.trim_end_matches('/'));
        Url::parse(&url).map_err(|e| AppError::Storage(format!("Invalid container URL: {}", e)))
    }

    fn object_url(&self, container: &str, key: &str) -> Result<Url> {
        Url::parse(&self.blob_url(container, key))
            .map_err(|e| AppError::Storage(format!("Invalid blob URL: {}", e)))
    }

    /// Authorize and send one request
    async fn send(
        &self,
        method: Method,
        mut url: Url,
        mut headers: HeaderMap,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<reqwest::Response> {
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        headers.insert("x-ms-date", header_value(&date)?);
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, header_value(content_type)?);
        }

        match &self.connection.credentials {
            Credentials::SharedKey {
                account_name,
                account_key,
            } => {
                let to_sign = string_to_sign(&method, &url, &headers, account_name);
                let signature = sign_hmac_sha256(account_key, &to_sign)?;
                headers.insert(
                    "authorization",
                    header_value(&format!("SharedKey {}:{}", account_name, signature))?,
                );
            }
            Credentials::SharedAccessSignature(token) => {
                let query = match url.query() {
                    Some(existing) => format!("{}&{}", existing, token),
                    None => token.clone(),
                };
                url.set_query(Some(&query));
            }
        }

        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        Ok(response)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Storage(format!("Invalid header value {:?}: {}", value, e)))
}

/// Build the Shared Key string-to-sign for a request.
///
/// Only the headers this client ever sends are filled in; the other
/// standard header slots stay empty.
pub fn string_to_sign(method: &Method, url: &Url, headers: &HeaderMap, account: &str) -> String {
    // Zero length is signed as an empty string
    let content_length = match header_str(headers, CONTENT_LENGTH) {
        "0" => "",
        other => other,
    };

    let mut ms_headers: Vec<(String, &str)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or_default()))
        .collect();
    ms_headers.sort();

    let canonical_headers: String = ms_headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();

    let mut canonical_resource = format!("/{}{}", account, url.path());
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
        .collect();
    params.sort();
    for (name, value) in params {
        canonical_resource.push_str(&format!("\n{}:{}", name, value));
    }

    format!(
        "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n{}{}",
        method.as_str(),
        content_length,
        header_str(headers, CONTENT_TYPE),
        canonical_headers,
        canonical_resource
    )
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Turn a non-success response into a storage error
async fn storage_error(operation: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let code = error_code(&response).unwrap_or_default();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("{} failed: {} {} {}", operation, status, code, body);
    AppError::Storage(format!("{} failed with status {} {}", operation, status, code))
}

fn error_code(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(ERROR_CODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl BlobStorage for AzureBlobStorage {
    async fn ensure_container(&self, container: &str) -> Result<()> {
        let url = self.container_url(container)?;
        let response = self
            .send(Method::PUT, url, HeaderMap::new(), None, Bytes::new())
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!("Created blob container: {}", container);
                Ok(())
            }
            StatusCode::CONFLICT if error_code(&response).as_deref() == Some(CONTAINER_EXISTS) => {
                tracing::debug!("Blob container already exists: {}", container);
                Ok(())
            }
            _ => Err(storage_error("Create container", response).await),
        }
    }

    async fn upload(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String> {
        let size = data.len();
        let url = self.object_url(container, key)?;

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));

        let response = self
            .send(Method::PUT, url, headers, Some(content_type), data)
            .await?;

        if !response.status().is_success() {
            return Err(storage_error("Upload blob", response).await);
        }

        tracing::debug!("Uploaded blob: {}/{} ({} bytes)", container, key, size);

        Ok(self.blob_url(container, key))
    }
}
