//! Per-invocation execution context assembly.
//!
//! Pure composition: a fresh engine context gets exactly the allow-listed
//! surface (logging façade, encoding helpers, `Blob`/`FileReader`, and the
//! capability namespace). Nothing reachable from the context aliases host
//! state beyond what is registered here.

use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsResult, JsString, JsValue, NativeFunction};
use boa_gc::{empty_trace, Finalize, Trace};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, error, info, trace, warn};

use super::api_bridge::register_api_namespace;
use super::blob::Blob;
use super::encoding::register_encoding;
use super::file_reader::FileReader;
use super::module::RejectingModuleLoader;
use super::SandboxError;
use crate::api::Capability;

const CONSOLE_METHODS: [&str; 6] = ["log", "trace", "debug", "info", "warn", "error"];

/// Builds the isolated context for one invocation.
pub(crate) fn build_context(
    function_id: &str,
    capabilities: Vec<(String, Capability)>,
    handle: Handle,
) -> Result<Context, SandboxError> {
    let mut context = Context::builder()
        .module_loader(std::rc::Rc::new(RejectingModuleLoader))
        .build()
        .map_err(|e| SandboxError::Context(e.to_string()))?;

    register_console(&mut context, function_id).map_err(|e| SandboxError::Context(e.to_string()))?;
    register_encoding(&mut context).map_err(|e| SandboxError::Context(e.to_string()))?;
    context
        .register_global_class::<Blob>()
        .map_err(|e| SandboxError::Context(e.to_string()))?;
    context
        .register_global_class::<FileReader>()
        .map_err(|e| SandboxError::Context(e.to_string()))?;
    register_api_namespace(&mut context, capabilities, handle)
        .map_err(|e| SandboxError::Context(e.to_string()))?;

    Ok(context)
}

#[derive(Finalize)]
struct ConsoleCapture {
    function_id: String,
    method: &'static str,
}

unsafe impl Trace for ConsoleCapture {
    empty_trace!();
}

/// The `console` façade: all six methods forward structured records to the
/// host logger, never to the host's stdout.
fn register_console(context: &mut Context, function_id: &str) -> JsResult<()> {
    let mut console = ObjectInitializer::new(context);
    for method in CONSOLE_METHODS {
        let log_fn = unsafe {
            NativeFunction::from_closure_with_captures(
                |_this, args, captures, ctx| {
                    let data: Vec<Value> = args
                        .iter()
                        .map(|arg| match arg.to_json(ctx) {
                            Ok(value) => value,
                            Err(_) => Value::String(arg.display().to_string()),
                        })
                        .collect();
                    emit_function_log(captures.method, &captures.function_id, data);
                    Ok(JsValue::undefined())
                },
                ConsoleCapture {
                    function_id: function_id.to_string(),
                    method,
                },
            )
        };
        console.function(log_fn, JsString::from(method), 0);
    }
    let console = console.build();
    context.register_global_property(js_string!("console"), console, Attribute::all())?;
    Ok(())
}

fn emit_function_log(method: &str, function_id: &str, data: Vec<Value>) {
    let data = Value::Array(data);
    match method {
        "trace" => trace!(target: "function", %function_id, method, %data, "log from function"),
        "debug" => debug!(target: "function", %function_id, method, %data, "log from function"),
        "warn" => warn!(target: "function", %function_id, method, %data, "log from function"),
        "error" => error!(target: "function", %function_id, method, %data, "log from function"),
        _ => info!(target: "function", %function_id, method, %data, "log from function"),
    }
}
