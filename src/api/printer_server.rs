//! Client for the receipt-printer service: print job submission.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{ApiError, RestClient};
use crate::auth::TokenProvider;

#[derive(Clone)]
pub struct PrinterServerClient {
    rest: RestClient,
}

impl PrinterServerClient {
    pub fn new(http: reqwest::Client, url: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            rest: RestClient::new(http, url, tokens),
        }
    }

    fn jobs_path(printer_id: &str) -> String {
        format!("/v1/printers/{printer_id}/jobs")
    }

    /// Receipt data items (text, alignment, cut, newline, ...) are passed
    /// through as the sandbox supplied them; the printer service validates.
    fn job_body(data: Vec<Value>, external_id: Option<&str>) -> Value {
        let mut body = json!({ "data": data });
        if let Some(external_id) = external_id {
            body["externalId"] = Value::String(external_id.to_string());
        }
        body
    }

    pub async fn create_receipt_job(
        &self,
        printer_id: &str,
        data: Vec<Value>,
        external_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let body = Self::job_body(data, external_id);
        self.rest.post(&Self::jobs_path(printer_id), &body).await
    }
}
