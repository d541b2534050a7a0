//! Client for the PDF rendering service.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error};

use super::ApiError;
use crate::auth::TokenProvider;

#[derive(Clone)]
pub struct PdfServerClient {
    http: reqwest::Client,
    url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl PdfServerClient {
    pub fn new(http: reqwest::Client, url: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { http, url, tokens }
    }

    /// Render options used when the caller passes none: A4 at 300 dpi.
    pub fn default_render_options() -> Value {
        json!({
            "viewport": {"width": 2480, "height": 3508},
            "export": {"format": "A4"},
        })
    }

    fn render_url(&self) -> String {
        format!("{}/pdf/_actions/render", self.url)
    }

    /// Renders HTML to PDF bytes. The service answers 201 on success with a
    /// binary body; anything else is a render failure.
    pub async fn render_pdf(&self, html: &str, options: &Value) -> Result<Vec<u8>, ApiError> {
        let token = self.tokens.get_access_token().await?;
        let url = self.render_url();
        debug!(%url, "rendering pdf");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({
                "content": {"html": html},
                "options": options,
            }))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            error!(%url, status = status.as_u16(), body, "error while creating pdf");
            return Err(ApiError::PdfRender {
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
