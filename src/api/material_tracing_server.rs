//! Client for the material tracing service: part and part-type lookups.

use std::sync::Arc;

use serde_json::Value;

use super::{ApiError, RestClient};
use crate::auth::TokenProvider;

#[derive(Clone)]
pub struct MaterialTracingServerClient {
    rest: RestClient,
}

impl MaterialTracingServerClient {
    pub fn new(http: reqwest::Client, url: String, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            rest: RestClient::new(http, url, tokens),
        }
    }

    fn part_path(part_id: &str) -> String {
        format!("/v1/parts/{part_id}")
    }

    fn part_type_path(part_type_id: &str) -> String {
        format!("/v1/part-types/{part_type_id}")
    }

    pub async fn get_part(&self, part_id: &str) -> Result<Value, ApiError> {
        self.rest.get(&Self::part_path(part_id), &[]).await
    }

    pub async fn get_part_type(&self, part_type_id: &str) -> Result<Value, ApiError> {
        self.rest.get(&Self::part_type_path(part_type_id), &[]).await
    }
}
