use serde::Deserialize;
use std::collections::BTreeMap;

use crate::auth::AuthConfig;
use crate::function::WorkerMeta;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    /// Capability configurations, one `[api.<name>]` table each. Kept raw
    /// here; typed dispatch happens in the capability registry.
    #[serde(default)]
    pub api: BTreeMap<String, serde_json::Value>,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Expand environment variables like ${WORKER_CLIENT_SECRET}
        let expanded = shellexpand::env(&content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// The declared capability set, in the shape `execute` consumes.
    pub fn worker_meta(&self) -> WorkerMeta {
        WorkerMeta {
            api: self.api.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_minimal_config() {
        let file = write_config(
            r#"
[auth]
token_endpoint = "https://login.example/oauth/token"
client_id = "worker"
client_secret = "s3cret"
"#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.auth.client_id, "worker");
        assert!(config.api.is_empty());
    }

    #[test]
    fn test_load_expands_env_vars() {
        std::env::set_var("TEST_WORKER_SECRET", "from-env");
        let file = write_config(
            r#"
[auth]
token_endpoint = "https://login.example/oauth/token"
client_id = "worker"
client_secret = "${TEST_WORKER_SECRET}"
"#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.auth.client_secret, "from-env");
    }

    #[test]
    fn test_api_tables_kept_raw() {
        let file = write_config(
            r#"
[auth]
token_endpoint = "https://login.example/oauth/token"
client_id = "worker"
client_secret = "s3cret"

[api.catalog]
type = "product-server"
url = "https://products.example"
catalogId = "c1"

[api.custom]
type = "webhook-server"
url = "https://hooks.example"
"#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        let meta = config.worker_meta();
        assert_eq!(meta.api["catalog"]["catalogId"], "c1");
        // Unknown capability types survive config loading untouched.
        assert_eq!(meta.api["custom"]["type"], "webhook-server");
    }
}
