//! Execution sandbox for untrusted function modules.
//!
//! Each invocation gets a fresh engine context carrying only the composed
//! surface (console façade, encoding helpers, `Blob`/`FileReader`, the
//! capability namespace). The submitted source is compiled as an isolated
//! module whose imports all fail, its exported `run` is invoked with the
//! caller's arguments, and the outcome is normalized into an
//! [`ExecutionResult`]. Infrastructure failures (context build, compile,
//! link) propagate as [`SandboxError`] instead.
//!
//! The engine is single-threaded and `!Send`, so each invocation runs on a
//! blocking thread; capability calls bridge back into the async runtime
//! through the handle captured at invocation start.

mod api_bridge;
mod blob;
mod context;
mod encoding;
mod file_reader;
mod module;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use boa_engine::builtins::promise::PromiseState;
use boa_engine::module::Module;
use boa_engine::object::builtins::JsPromise;
use boa_engine::object::JsObject;
use boa_engine::{js_string, Context, JsError, JsString, JsValue, Source};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::api::{self, Capability};
use crate::auth::AuthClient;
use crate::function::{FunctionVersion, WorkerMeta};
use context::build_context;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("could not build capability clients: {0}")]
    Capabilities(String),
    #[error("could not build execution context: {0}")]
    Context(String),
    #[error("failed to compile function module: {0}")]
    Compile(String),
    #[error("failed to link function module: {0}")]
    Link(String),
    #[error("sandbox execution task failed: {0}")]
    Internal(String),
}

/// Error shape preserved from the sandboxed throw site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerializedError {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl SerializedError {
    fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }
}

/// Outcome of one invocation: exactly one arm, tagged `isError` on the
/// wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success(Value),
    Failure(SerializedError),
}

impl ExecutionResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ExecutionResult", 2)?;
        match self {
            Self::Success(result) => {
                state.serialize_field("isError", &false)?;
                state.serialize_field("result", result)?;
            }
            Self::Failure(error) => {
                state.serialize_field("isError", &true)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Runs function versions against their declared capability set.
pub struct FunctionExecuter {
    auth: Arc<AuthClient>,
}

impl FunctionExecuter {
    pub fn new(auth: Arc<AuthClient>) -> Self {
        Self { auth }
    }

    /// Executes one function version with positional JSON arguments.
    ///
    /// Function-logic failures land in the returned [`ExecutionResult`];
    /// malformed submissions and infrastructure faults come back as
    /// [`SandboxError`].
    pub async fn execute(
        &self,
        version: &FunctionVersion,
        meta: &WorkerMeta,
        args: Vec<Value>,
    ) -> Result<ExecutionResult, SandboxError> {
        let capabilities = api::build_capabilities(meta, self.auth.clone())
            .map_err(|e| SandboxError::Capabilities(e.to_string()))?;

        debug!(
            function_id = %version.function_id,
            capabilities = capabilities.len(),
            "starting sandboxed invocation"
        );

        let handle = Handle::current();
        let function_id = version.function_id.clone();
        let code = version.code.clone();

        tokio::task::spawn_blocking(move || {
            run_module(&function_id, &code, capabilities, &args, handle)
        })
        .await
        .map_err(|e| SandboxError::Internal(e.to_string()))?
    }
}

/// One full Build → Load → Invoke → Finish cycle on the blocking thread.
fn run_module(
    function_id: &str,
    code: &str,
    capabilities: Vec<(String, Capability)>,
    args: &[Value],
    handle: Handle,
) -> Result<ExecutionResult, SandboxError> {
    let mut context = build_context(function_id, capabilities, handle)?;

    let module = Module::parse(Source::from_bytes(code.as_bytes()), None, &mut context)
        .map_err(|e| SandboxError::Compile(e.to_string()))?;

    // Load resolves the dependency graph; every import fails here, before
    // any user code runs.
    let load = module.load(&mut context);
    context.run_jobs();
    match load.state() {
        PromiseState::Fulfilled(_) => {}
        PromiseState::Rejected(reason) => {
            return Err(SandboxError::Link(JsError::from_opaque(reason).to_string()));
        }
        PromiseState::Pending => {
            return Err(SandboxError::Link("module load did not complete".to_string()));
        }
    }

    module
        .link(&mut context)
        .map_err(|e| SandboxError::Link(e.to_string()))?;

    // Top-level code runs here; a throw at this point is the function's
    // own failure, not a malformed submission.
    let evaluation = module.evaluate(&mut context);
    context.run_jobs();
    match evaluation.state() {
        PromiseState::Fulfilled(_) => {}
        PromiseState::Rejected(reason) => {
            return Ok(ExecutionResult::Failure(serialize_js_error(
                JsError::from_opaque(reason),
                &mut context,
            )));
        }
        PromiseState::Pending => {
            return Ok(ExecutionResult::Failure(SerializedError::new(
                "Error",
                "module evaluation did not settle",
            )));
        }
    }

    let outcome = invoke_run(&module, args, &mut context);

    // Drain remaining jobs so reads scheduled late still fire their
    // handlers (observable through the logging façade).
    context.run_jobs();

    match outcome {
        Ok(value) => Ok(ExecutionResult::Success(json_result(&value, &mut context))),
        Err(error) => Ok(ExecutionResult::Failure(serialize_js_error(
            error,
            &mut context,
        ))),
    }
}

/// Calls the exported `run` and settles its result.
fn invoke_run(
    module: &Module,
    args: &[Value],
    context: &mut Context,
) -> Result<JsValue, JsError> {
    let namespace = module.namespace(context);
    let run = namespace.get(js_string!("run"), context)?;
    let Some(run) = run.as_callable().cloned() else {
        return Err(boa_engine::JsNativeError::typ()
            .with_message("run is not a function")
            .into());
    };

    let mut js_args = Vec::with_capacity(args.len());
    for arg in args {
        js_args.push(JsValue::from_json(arg, context)?);
    }

    let value = run.call(&JsValue::undefined(), &js_args, context)?;
    settle(value, context)
}

/// Awaits a promise-valued result by draining the job queue; plain values
/// pass through.
fn settle(value: JsValue, context: &mut Context) -> Result<JsValue, JsError> {
    let Some(object) = value.as_object() else {
        return Ok(value);
    };
    let Ok(promise) = JsPromise::from_object(object.clone()) else {
        return Ok(value);
    };

    context.run_jobs();
    match promise.state() {
        PromiseState::Fulfilled(value) => Ok(value),
        PromiseState::Rejected(reason) => Err(JsError::from_opaque(reason)),
        PromiseState::Pending => Err(boa_engine::JsNativeError::error()
            .with_message("function result promise never settled")
            .into()),
    }
}

/// Converts the completion value for the wire. `undefined` becomes `null`;
/// values JSON cannot express degrade to `null` with a note in the log.
fn json_result(value: &JsValue, context: &mut Context) -> Value {
    if value.is_undefined() {
        return Value::Null;
    }
    match value.to_json(context) {
        Ok(json) => json,
        Err(e) => {
            warn!("function result is not JSON-serializable: {e}");
            Value::Null
        }
    }
}

/// Preserves name/message/stack from the thrown value, tolerating non-Error
/// throws.
fn serialize_js_error(error: JsError, context: &mut Context) -> SerializedError {
    let value = error.to_opaque(context);

    if let Some(object) = value.as_object() {
        let name = string_property(object, "name", context).unwrap_or_else(|| "Error".to_string());
        let message = string_property(object, "message", context).unwrap_or_default();
        let stack = string_property(object, "stack", context);
        return SerializedError {
            name,
            message,
            stack,
        };
    }

    if let Some(text) = value.as_string() {
        return SerializedError::new("Error", text.to_std_string_escaped());
    }

    SerializedError::new("Error", value.display().to_string())
}

fn string_property(object: &JsObject, key: &str, context: &mut Context) -> Option<String> {
    let value = object.get(JsString::from(key), context).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    Some(value.to_string(context).ok()?.to_std_string_escaped())
}

/// Event timestamps, milliseconds since the epoch.
pub(crate) fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use chrono::Utc;
    use serde_json::json;

    fn executer() -> FunctionExecuter {
        FunctionExecuter::new(Arc::new(AuthClient::new(AuthConfig {
            token_endpoint: "http://127.0.0.1:9/token".to_string(),
            client_id: "worker".to_string(),
            client_secret: "secret".to_string(),
        })))
    }

    fn version(code: &str) -> FunctionVersion {
        FunctionVersion {
            id: "v1".to_string(),
            function_id: "fn-test".to_string(),
            external_id: None,
            is_active: true,
            code: code.to_string(),
            publish_time: Utc::now(),
            creation_time: Utc::now(),
        }
    }

    async fn run(code: &str, args: Vec<Value>) -> ExecutionResult {
        executer()
            .execute(&version(code), &WorkerMeta::default(), args)
            .await
            .expect("invocation should not fail at the infrastructure level")
    }

    async fn run_err(code: &str) -> SandboxError {
        executer()
            .execute(&version(code), &WorkerMeta::default(), vec![])
            .await
            .expect_err("invocation should fail before user code runs")
    }

    fn success(result: ExecutionResult) -> Value {
        match result {
            ExecutionResult::Success(value) => value,
            ExecutionResult::Failure(error) => panic!("unexpected function error: {error:?}"),
        }
    }

    fn failure(result: ExecutionResult) -> SerializedError {
        match result {
            ExecutionResult::Failure(error) => error,
            ExecutionResult::Success(value) => panic!("unexpected success: {value}"),
        }
    }

    // ── Sandbox runtime ───────────────────────────────────

    #[tokio::test]
    async fn test_run_with_positional_args() {
        let result = run(
            "export function run(a, b) { return a + b; }",
            vec![json!(1), json!(2)],
        )
        .await;
        assert_eq!(success(result), json!(3));
    }

    #[tokio::test]
    async fn test_async_run_is_awaited() {
        let result = run(
            "export async function run() { return 'later'; }",
            vec![],
        )
        .await;
        assert_eq!(success(result), json!("later"));
    }

    #[tokio::test]
    async fn test_run_exported_as_const_arrow() {
        let result = run("export const run = () => 7;", vec![]).await;
        assert_eq!(success(result), json!(7));
    }

    #[tokio::test]
    async fn test_object_argument_round_trip() {
        let result = run(
            "export function run(order) { return order.lines.length === 2; }",
            vec![json!({"lines": [{"sku": "a"}, {"sku": "b"}]})],
        )
        .await;
        assert_eq!(success(result), json!(true));
    }

    #[tokio::test]
    async fn test_undefined_result_becomes_null() {
        let result = run("export function run() {}", vec![]).await;
        assert_eq!(success(result), Value::Null);
    }

    #[tokio::test]
    async fn test_thrown_error_is_captured() {
        let result = run(
            "export function run() { throw new TypeError('bad input'); }",
            vec![],
        )
        .await;
        let error = failure(result);
        assert_eq!(error.name, "TypeError");
        assert_eq!(error.message, "bad input");
    }

    #[tokio::test]
    async fn test_async_rejection_is_captured() {
        let result = run(
            "export async function run() { throw new Error('later failure'); }",
            vec![],
        )
        .await;
        let error = failure(result);
        assert_eq!(error.name, "Error");
        assert_eq!(error.message, "later failure");
    }

    #[tokio::test]
    async fn test_non_error_throw_is_captured() {
        let result = run("export function run() { throw 'plain'; }", vec![]).await;
        assert_eq!(failure(result).message, "plain");
    }

    #[tokio::test]
    async fn test_top_level_throw_is_captured() {
        let result = run(
            "throw new Error('boom'); export function run() { return 1; }",
            vec![],
        )
        .await;
        assert_eq!(failure(result).message, "boom");
    }

    #[tokio::test]
    async fn test_missing_run_export_is_captured() {
        let result = run("export const other = 1;", vec![]).await;
        let error = failure(result);
        assert_eq!(error.name, "TypeError");
        assert!(error.message.contains("run"));
    }

    #[tokio::test]
    async fn test_never_settling_promise_is_captured() {
        let result = run(
            "export function run() { return new Promise(() => {}); }",
            vec![],
        )
        .await;
        assert!(failure(result).message.contains("never settled"));
    }

    #[tokio::test]
    async fn test_import_fails_before_execution() {
        let error = run_err(
            "import fs from 'fs';\nexport function run() { return fs; }",
        )
        .await;
        assert!(matches!(&error, SandboxError::Link(message) if message.contains("module not found")));
    }

    #[tokio::test]
    async fn test_syntax_error_fails_before_execution() {
        let error = run_err("export function run( {").await;
        assert!(matches!(error, SandboxError::Compile(_)));
    }

    #[tokio::test]
    async fn test_no_ambient_host_globals() {
        let result = run(
            "export function run() { return [typeof require, typeof process, typeof globalThis.fetch]; }",
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!(["undefined", "undefined", "undefined"])
        );
    }

    #[tokio::test]
    async fn test_console_facade_is_callable() {
        let result = run(
            "export function run() { console.log('hi', {a: 1}); console.error('bad'); return true; }",
            vec![],
        )
        .await;
        assert_eq!(success(result), json!(true));
    }

    // ── Encoding helpers ──────────────────────────────────

    #[tokio::test]
    async fn test_btoa_atob_round_trip() {
        let result = run(
            "export function run() { return [btoa('hello'), atob(btoa('héllo'))]; }",
            vec![],
        )
        .await;
        assert_eq!(success(result), json!(["aGVsbG8=", "héllo"]));
    }

    #[tokio::test]
    async fn test_atob_rejects_invalid_base64() {
        let result = run("export function run() { return atob('!!!'); }", vec![]).await;
        assert!(failure(result).message.contains("base64"));
    }

    #[tokio::test]
    async fn test_text_encoder_decoder_round_trip() {
        let result = run(
            r#"export function run() {
                const bytes = new TextEncoder().encode('héllo');
                return { lengthOk: bytes.length === 6, text: new TextDecoder().decode(bytes) };
            }"#,
            vec![],
        )
        .await;
        assert_eq!(success(result), json!({"lengthOk": true, "text": "héllo"}));
    }

    // ── Capability namespace ──────────────────────────────

    fn meta_with(api: Value) -> WorkerMeta {
        serde_json::from_value(json!({ "api": api })).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_capability_passes_through_raw() {
        let meta = meta_with(json!({
            "custom": {"type": "webhook-server", "url": "https://hooks.example"},
        }));
        let result = executer()
            .execute(
                &version("export function run() { return api.custom.url; }"),
                &meta,
                vec![],
            )
            .await
            .unwrap();
        assert_eq!(success(result), json!("https://hooks.example"));
    }

    #[tokio::test]
    async fn test_configured_capabilities_expose_methods() {
        let meta = meta_with(json!({
            "mypdf": {"type": "pdf-server", "url": "https://pdf.example"},
            "catalog": {"type": "product-server", "url": "https://products.example", "catalogId": "c1"},
            "tracing": {"type": "material-tracing-server", "url": "https://trace.example"},
            "printing": {"type": "printer-server", "url": "https://print.example"},
        }));
        let result = executer()
            .execute(
                &version(
                    r#"export function run() {
                        return [
                            typeof api.mypdf.renderPdf,
                            typeof api.catalog.items.get,
                            typeof api.catalog.attributes.elements.listByAttributeId,
                            typeof api.tracing.parts.get,
                            typeof api.tracing.partTypes.get,
                            typeof api.printing.printers.jobs.createReceiptJob,
                        ];
                    }"#,
                ),
                &meta,
                vec![],
            )
            .await
            .unwrap();
        assert_eq!(
            success(result),
            json!(["function", "function", "function", "function", "function", "function"])
        );
    }

    #[tokio::test]
    async fn test_invalid_capability_config_is_infrastructure_error() {
        let meta = meta_with(json!({
            "catalog": {"type": "product-server", "url": "https://products.example"},
        }));
        let error = executer()
            .execute(&version("export function run() {}"), &meta, vec![])
            .await
            .expect_err("missing catalogId should fail capability construction");
        assert!(matches!(error, SandboxError::Capabilities(_)));
    }

    // ── Blob reader state machine ─────────────────────────

    #[tokio::test]
    async fn test_read_as_text_event_sequence() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    const events = [];
                    reader.onloadstart = () => events.push('loadstart');
                    reader.onprogress = (e) =>
                        events.push(`progress:${e.loaded}:${e.total}:${e.lengthComputable}`);
                    reader.onload = () => events.push('load');
                    reader.onerror = () => events.push('error');
                    reader.onabort = () => events.push('abort');
                    reader.onloadend = () => {
                        events.push('loadend');
                        resolve({ events, result: reader.result, state: reader.readyState });
                    };
                    reader.readAsText(new Blob(['Hello, World!']));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!({
                "events": ["loadstart", "progress:1:1:true", "load", "loadend"],
                "result": "Hello, World!",
                "state": 2,
            })
        );
    }

    #[tokio::test]
    async fn test_read_as_data_url_untyped_blob() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    reader.onloadend = () => resolve(reader.result);
                    reader.readAsDataURL(new Blob(['Hello']));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!("data:application/octet-stream;base64,SGVsbG8=")
        );
    }

    #[tokio::test]
    async fn test_read_as_data_url_uses_blob_type() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    reader.onloadend = () => resolve(reader.result);
                    reader.readAsDataURL(new Blob(['x'], { type: 'text/plain' }));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(success(result), json!("data:text/plain;base64,eA=="));
    }

    #[tokio::test]
    async fn test_read_as_array_buffer() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    reader.onload = () =>
                        resolve({
                            isBuffer: reader.result instanceof ArrayBuffer,
                            byteLengthOk: reader.result.byteLength === 3,
                        });
                    reader.readAsArrayBuffer(new Blob(['abc']));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!({"isBuffer": true, "byteLengthOk": true})
        );
    }

    #[tokio::test]
    async fn test_read_as_binary_string_keeps_high_bytes() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    reader.onload = () =>
                        resolve([...reader.result].map((c) => c.charCodeAt(0)).join(','));
                    reader.readAsBinaryString(new Blob([new Uint8Array([72, 101, 255])]));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(success(result), json!("72,101,255"));
    }

    #[tokio::test]
    async fn test_read_while_loading_throws_without_state_change() {
        let result = run(
            r#"export function run() {
                const reader = new FileReader();
                reader.readAsText(new Blob(['a']));
                let thrown = null;
                try {
                    reader.readAsText(new Blob(['b']));
                } catch (e) {
                    thrown = e.message;
                }
                return { thrown, state: reader.readyState };
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!({"thrown": "The FileReader is already reading", "state": 1})
        );
    }

    #[tokio::test]
    async fn test_abort_during_loading_preempts_load() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    const events = [];
                    reader.onloadstart = () => events.push('loadstart');
                    reader.onload = () => events.push('load');
                    reader.onabort = () => events.push('abort');
                    reader.onloadend = () => {
                        events.push('loadend');
                        resolve({
                            events,
                            error: reader.error ? reader.error.message : null,
                            state: reader.readyState,
                        });
                    };
                    reader.readAsText(new Blob(['payload']));
                    reader.abort();
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!({
                "events": ["loadstart", "abort", "loadend"],
                "error": "The operation was aborted",
                "state": 2,
            })
        );
    }

    #[tokio::test]
    async fn test_abort_outside_loading_is_noop() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    const events = [];
                    reader.onabort = () => events.push('abort');
                    reader.abort(); // EMPTY: no events, no state change
                    const stateAfterEmptyAbort = reader.readyState;
                    reader.onloadend = () => {
                        events.push('loadend');
                        reader.abort(); // DONE: still a no-op
                        resolve({
                            events,
                            stateAfterEmptyAbort,
                            state: reader.readyState,
                            error: reader.error,
                        });
                    };
                    reader.readAsText(new Blob(['x']));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!({
                "events": ["loadend"],
                "stateAfterEmptyAbort": 0,
                "state": 2,
                "error": null,
            })
        );
    }

    #[tokio::test]
    async fn test_reader_rearms_after_done() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    let first = null;
                    reader.onload = () => {
                        if (first === null) {
                            first = reader.result;
                            reader.readAsText(new Blob(['second']));
                        } else {
                            resolve([first, reader.result]);
                        }
                    };
                    reader.readAsText(new Blob(['first']));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(success(result), json!(["first", "second"]));
    }

    #[tokio::test]
    async fn test_non_blob_argument_reports_error_event() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    const events = [];
                    reader.onload = () => events.push('load');
                    reader.onerror = (e) => events.push('error:' + e.error.message);
                    reader.onloadend = () =>
                        resolve({ events, state: reader.readyState, hasError: reader.error !== null });
                    reader.readAsText('not a blob');
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!({
                "events": ["error:parameter 1 is not of type 'Blob'"],
                "state": 2,
                "hasError": true,
            })
        );
    }

    #[tokio::test]
    async fn test_handler_assignment_is_last_write_wins() {
        let result = run(
            r#"export function run() {
                return new Promise((resolve) => {
                    const reader = new FileReader();
                    let wrong = false;
                    reader.onload = () => { wrong = true; };
                    reader.onload = () => resolve(!wrong);
                    reader.readAsText(new Blob(['x']));
                });
            }"#,
            vec![],
        )
        .await;
        assert_eq!(success(result), json!(true));
    }

    #[tokio::test]
    async fn test_blob_surface() {
        let result = run(
            r#"export async function run() {
                const blob = new Blob(['Hello, ', new Blob(['World']), '!'], { type: 'text/plain' });
                return {
                    sizeOk: blob.size === 13,
                    type: blob.type,
                    text: await blob.text(),
                };
            }"#,
            vec![],
        )
        .await;
        assert_eq!(
            success(result),
            json!({"sizeOk": true, "type": "text/plain", "text": "Hello, World!"})
        );
    }

    #[tokio::test]
    async fn test_file_reader_constants() {
        let result = run(
            r#"export function run() {
                const reader = new FileReader();
                return [FileReader.EMPTY, FileReader.LOADING, FileReader.DONE,
                        reader.EMPTY, reader.LOADING, reader.DONE];
            }"#,
            vec![],
        )
        .await;
        assert_eq!(success(result), json!([0, 1, 2, 0, 1, 2]));
    }

    // ── Result wire shape ─────────────────────────────────

    #[test]
    fn test_execution_result_wire_shape() {
        let success = serde_json::to_value(ExecutionResult::Success(json!({"ok": 1}))).unwrap();
        assert_eq!(success, json!({"isError": false, "result": {"ok": 1}}));

        let failure = serde_json::to_value(ExecutionResult::Failure(SerializedError::new(
            "TypeError",
            "bad input",
        )))
        .unwrap();
        assert_eq!(
            failure,
            json!({"isError": true, "error": {"name": "TypeError", "message": "bad input"}})
        );
    }
}
