//! Client for the product catalog service.
//!
//! All lookups are scoped to the catalog configured with the capability.

use std::sync::Arc;

use serde_json::Value;

use super::{ApiError, RestClient};
use crate::auth::TokenProvider;

#[derive(Clone)]
pub struct ProductServerClient {
    rest: RestClient,
    catalog_id: String,
}

impl ProductServerClient {
    pub fn new(
        http: reqwest::Client,
        url: String,
        catalog_id: String,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            rest: RestClient::new(http, url, tokens),
            catalog_id,
        }
    }

    fn item_path(&self, item_id: &str) -> String {
        format!("/v1/catalogs/{}/items/{item_id}", self.catalog_id)
    }

    fn attribute_elements_path(&self, attribute_id: &str) -> String {
        format!(
            "/v1/catalogs/{}/attributes/{attribute_id}/elements",
            self.catalog_id
        )
    }

    pub async fn get_item(&self, item_id: &str) -> Result<Value, ApiError> {
        self.rest.get(&self.item_path(item_id), &[]).await
    }

    /// Lists the elements of an attribute. `include` expands related
    /// resources; an empty list omits the parameter.
    pub async fn list_attribute_elements(
        &self,
        attribute_id: &str,
        include: &[String],
    ) -> Result<Value, ApiError> {
        let query: Vec<(&str, String)> = include
            .iter()
            .map(|value| ("include", value.clone()))
            .collect();
        self.rest
            .get(&self.attribute_elements_path(attribute_id), &query)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::StaticTokens;
    use reqwest::header::AUTHORIZATION;
    use reqwest::Method;

    fn client() -> ProductServerClient {
        ProductServerClient::new(
            reqwest::Client::new(),
            "https://x".to_string(),
            "c1".to_string(),
            Arc::new(StaticTokens("token-123")),
        )
    }

    #[test]
    fn test_item_request_url_and_header() {
        let client = client();
        let request = client
            .rest
            .build_request("token-123", Method::GET, &client.item_path("i1"), &[], None)
            .unwrap();

        assert_eq!(request.url().as_str(), "https://x/v1/catalogs/c1/items/i1");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer token-123");
    }

    #[test]
    fn test_attribute_elements_include_params() {
        let client = client();
        let query = [("include", "elements".to_string())];
        let request = client
            .rest
            .build_request(
                "t",
                Method::GET,
                &client.attribute_elements_path("a1"),
                &query,
                None,
            )
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://x/v1/catalogs/c1/attributes/a1/elements?include=elements"
        );
    }

    #[test]
    fn test_empty_include_omits_query() {
        let client = client();
        let request = client
            .rest
            .build_request(
                "t",
                Method::GET,
                &client.attribute_elements_path("a1"),
                &[],
                None,
            )
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://x/v1/catalogs/c1/attributes/a1/elements"
        );
    }
}
