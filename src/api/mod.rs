//! Capability registry: typed REST clients handed to sandboxed functions.
//!
//! Each worker declares its capabilities as a map of name → configuration.
//! Dispatch runs on the config's `type` tag; recognized types become typed
//! clients bound to the shared token provider, unrecognized types are handed
//! to the function as plain configuration.

pub mod material_tracing_server;
pub mod pdf_server;
pub mod printer_server;
pub mod product_server;
mod request;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::auth::{AuthError, TokenProvider};
use crate::function::WorkerMeta;
pub use material_tracing_server::MaterialTracingServerClient;
pub use pdf_server::PdfServerClient;
pub use printer_server::PrinterServerClient;
pub use product_server::ProductServerClient;
pub(crate) use request::RestClient;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to load resource")]
    Resource,
    #[error("error while creating pdf (status {status})")]
    PdfRender { status: u16 },
    #[error("capability config is missing required field `{field}`")]
    InvalidConfig { field: String },
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// One worker capability configuration, discriminated by its `type` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityConfig {
    PdfServer { url: String },
    MaterialTracingServer { url: String },
    ProductServer { url: String, catalog_id: String },
    PrinterServer { url: String },
    /// Unrecognized `type` (or no tag at all): passed through unchanged so
    /// functions can consume configs this worker version predates.
    Unknown(Value),
}

impl CapabilityConfig {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Ok(Self::Unknown(value.clone()));
        };

        match kind {
            "pdf-server" => Ok(Self::PdfServer {
                url: required_str(value, "url")?,
            }),
            "material-tracing-server" => Ok(Self::MaterialTracingServer {
                url: required_str(value, "url")?,
            }),
            "product-server" => Ok(Self::ProductServer {
                url: required_str(value, "url")?,
                catalog_id: required_str(value, "catalogId")?,
            }),
            "printer-server" => Ok(Self::PrinterServer {
                url: required_str(value, "url")?,
            }),
            _ => Ok(Self::Unknown(value.clone())),
        }
    }
}

fn required_str(value: &Value, field: &str) -> Result<String, ApiError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ApiError::InvalidConfig {
            field: field.to_string(),
        })
}

/// A capability bound and ready to expose inside the sandbox.
pub enum Capability {
    PdfServer(PdfServerClient),
    MaterialTracingServer(MaterialTracingServerClient),
    ProductServer(ProductServerClient),
    PrinterServer(PrinterServerClient),
    Passthrough(Value),
}

/// Builds one client per configured capability, sharing a single HTTP
/// client and the process-wide token provider. Performs no I/O.
pub fn build_capabilities(
    meta: &WorkerMeta,
    tokens: Arc<dyn TokenProvider>,
) -> Result<Vec<(String, Capability)>, ApiError> {
    let http = reqwest::Client::new();

    meta.api
        .iter()
        .map(|(name, raw)| {
            let capability = match CapabilityConfig::from_value(raw)? {
                CapabilityConfig::PdfServer { url } => {
                    Capability::PdfServer(PdfServerClient::new(http.clone(), url, tokens.clone()))
                }
                CapabilityConfig::MaterialTracingServer { url } => {
                    Capability::MaterialTracingServer(MaterialTracingServerClient::new(
                        http.clone(),
                        url,
                        tokens.clone(),
                    ))
                }
                CapabilityConfig::ProductServer { url, catalog_id } => Capability::ProductServer(
                    ProductServerClient::new(http.clone(), url, catalog_id, tokens.clone()),
                ),
                CapabilityConfig::PrinterServer { url } => Capability::PrinterServer(
                    PrinterServerClient::new(http.clone(), url, tokens.clone()),
                ),
                CapabilityConfig::Unknown(raw) => Capability::Passthrough(raw),
            };
            Ok((name.clone(), capability))
        })
        .collect()
}
