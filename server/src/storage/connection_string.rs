//! Azure Storage connection string parsing
//!
//! Accepts the `Key=Value;Key=Value` format handed out by the Azure portal,
//! SAS-only strings with an explicit `BlobEndpoint`, and the
//! `UseDevelopmentStorage=true` shortcut for the local emulator.

use crate::error::{AppError, Result};
use std::fmt;
use std::str::FromStr;

/// Account name of the local storage emulator
pub const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Publicly documented key of the local storage emulator
pub const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Blob endpoint of the local storage emulator
pub const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// How requests to the storage account are authorized
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Requests are signed with the account key
    SharedKey {
        account_name: String,
        account_key: String,
    },
    /// A SAS token is appended to every request query
    SharedAccessSignature(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::SharedKey { account_name, .. } => f
                .debug_struct("SharedKey")
                .field("account_name", account_name)
                .field("account_key", &"<redacted>")
                .finish(),
            Credentials::SharedAccessSignature(_) => {
                f.debug_tuple("SharedAccessSignature").field(&"<redacted>").finish()
            }
        }
    }
}

/// Parsed connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Base URL of the blob service, without a trailing slash
    pub blob_endpoint: String,
    pub credentials: Credentials,
}

impl ConnectionString {
    /// Connection to the local storage emulator
    pub fn development() -> Self {
        Self {
            blob_endpoint: DEV_BLOB_ENDPOINT.to_string(),
            credentials: Credentials::SharedKey {
                account_name: DEV_ACCOUNT_NAME.to_string(),
                account_key: DEV_ACCOUNT_KEY.to_string(),
            },
        }
    }
}

impl FromStr for ConnectionString {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let mut protocol = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut endpoint_suffix = None;
        let mut blob_endpoint = None;
        let mut sas = None;

        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Values (keys, SAS tokens) may contain '=' themselves
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                AppError::Config(format!("Malformed connection string segment: {:?}", pair))
            })?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "usedevelopmentstorage" if value.eq_ignore_ascii_case("true") => {
                    return Ok(ConnectionString::development());
                }
                "defaultendpointsprotocol" => protocol = Some(value),
                "accountname" => account_name = Some(value),
                "accountkey" => account_key = Some(value),
                "endpointsuffix" => endpoint_suffix = Some(value),
                "blobendpoint" => blob_endpoint = Some(value),
                "sharedaccesssignature" => sas = Some(value),
                other => tracing::debug!("Ignoring connection string key: {}", other),
            }
        }

        let blob_endpoint = match (blob_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(account)) => format!(
                "{}://{}.blob.{}",
                protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
                account,
                endpoint_suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX)
            ),
            (None, None) => {
                return Err(AppError::Config(
                    "Connection string needs either AccountName or BlobEndpoint".to_string(),
                ))
            }
        };

        let credentials = match (account_key, sas) {
            (Some(account_key), _) => Credentials::SharedKey {
                account_name: account_name.ok_or_else(|| {
                    AppError::Config("AccountKey given without AccountName".to_string())
                })?,
                account_key,
            },
            (None, Some(token)) => {
                Credentials::SharedAccessSignature(token.trim_start_matches('?').to_string())
            }
            (None, None) => {
                return Err(AppError::Config(
                    "Connection string has neither AccountKey nor SharedAccessSignature"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            blob_endpoint,
            credentials,
        })
    }
}
