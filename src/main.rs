mod api;
mod auth;
mod config;
mod function;
mod sandbox;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::AuthClient;
use crate::config::Config;
use crate::function::FunctionVersion;
use crate::sandbox::FunctionExecuter;

fn print_help() {
    println!(
        "\
function-worker v{}

Runs a worker function in the capability-scoped sandbox.

USAGE:
    function-worker [OPTIONS] <FUNCTION_FILE> [ARGS_JSON]

ARGUMENTS:
    FUNCTION_FILE    Path to the function module. Must export run(...args).
    ARGS_JSON        Positional arguments as a JSON array [default: []]

OPTIONS:
    -c, --config <PATH>    Path to TOML configuration file
                           [default: config/worker.toml]
    -h, --help             Print this help message and exit
    -V, --version          Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG                Log level filter for tracing
                            (e.g. debug, function_worker=debug,warn)
    WORKER_CLIENT_SECRET    Client secret for the token endpoint
                            (when referenced from the config)

EXAMPLES:
    function-worker demos/hello.js '[2, 3]'
    function-worker -c /etc/worker.toml demos/file-reader-demo.js",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    let mut config_path = "config/worker.toml".to_string();
    let mut positional = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("function-worker v{}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                config_path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a path"))?;
            }
            _ => positional.push(arg),
        }
    }

    // Initialize logging (RUST_LOG=debug for debug mode)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("function_worker=info")),
        )
        .init();

    let Some(function_path) = positional.first() else {
        print_help();
        std::process::exit(2);
    };

    let call_args: Vec<serde_json::Value> = match positional.get(1) {
        Some(raw) => {
            serde_json::from_str(raw).map_err(|e| anyhow!("ARGS_JSON must be a JSON array: {e}"))?
        }
        None => Vec::new(),
    };

    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;
    info!("Capabilities: {} configured", config.api.len());

    let code = std::fs::read_to_string(function_path)?;
    let function_id = Path::new(function_path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("local")
        .to_string();

    // A synthetic single-use version; in deployment these come from the
    // function catalog.
    let version = FunctionVersion {
        id: "local".to_string(),
        function_id,
        external_id: None,
        is_active: true,
        code,
        publish_time: Utc::now(),
        creation_time: Utc::now(),
    };

    let auth = Arc::new(AuthClient::new(config.auth.clone()));
    let executer = FunctionExecuter::new(auth);

    info!("Executing {} with {} argument(s)", function_path, call_args.len());
    let result = executer
        .execute(&version, &config.worker_meta(), call_args)
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
