//! Shared authorized-request helper used by the JSON capability clients.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::error;

use super::ApiError;
use crate::auth::TokenProvider;

#[derive(Clone)]
pub(crate) struct RestClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl RestClient {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            tokens,
        }
    }

    /// Assembles a bearer-authorized request without sending it.
    pub(crate) fn build_request(
        &self,
        token: &str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Request, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, &url).bearer_auth(token);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    pub(crate) async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        self.execute(Method::GET, path, query, None).await
    }

    pub(crate) async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let token = self.tokens.get_access_token().await?;
        let request = self.build_request(&token, method, path, query, body)?;
        let url = request.url().clone();

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%url, status = status.as_u16(), body, "failed to load resource");
            return Err(ApiError::Resource);
        }

        Ok(response.json().await?)
    }
}
