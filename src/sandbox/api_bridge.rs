//! JavaScript bindings for the capability clients.
//!
//! Builds the object graph sandboxed code sees under the `api` global and
//! bridges each method into the async Rust client through the runtime
//! handle captured at invocation start. The engine runs on a dedicated
//! blocking thread, so `block_on` here never parks a runtime worker.

use boa_engine::object::builtins::{JsArray, JsArrayBuffer};
use boa_engine::object::{FunctionObjectBuilder, JsObject, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsArgs, JsNativeError, JsResult, JsString, JsValue, NativeFunction,
};
use boa_gc::{empty_trace, Finalize, Trace};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::api::{
    Capability, MaterialTracingServerClient, PdfServerClient, PrinterServerClient,
    ProductServerClient,
};

/// Registers the capability namespace as the global `api` object.
pub(crate) fn register_api_namespace(
    context: &mut Context,
    capabilities: Vec<(String, Capability)>,
    handle: Handle,
) -> JsResult<()> {
    let mut entries = Vec::with_capacity(capabilities.len());
    for (name, capability) in capabilities {
        let value = match capability {
            Capability::PdfServer(client) => pdf_object(client, &handle, context)?.into(),
            Capability::MaterialTracingServer(client) => {
                material_tracing_object(client, &handle, context)?.into()
            }
            Capability::ProductServer(client) => product_object(client, &handle, context)?.into(),
            Capability::PrinterServer(client) => printer_object(client, &handle, context)?.into(),
            Capability::Passthrough(raw) => JsValue::from_json(&raw, context)?,
        };
        entries.push((name, value));
    }

    let mut api = ObjectInitializer::new(context);
    for (name, value) in entries {
        api.property(JsString::from(name), value, Attribute::all());
    }
    let api = api.build();
    context.register_global_property(js_string!("api"), api, Attribute::all())?;
    Ok(())
}

/// Wraps a native closure into a named function object.
fn bind_method(
    context: &mut Context,
    name: &str,
    length: usize,
    function: NativeFunction,
) -> JsObject {
    FunctionObjectBuilder::new(context.realm(), function)
        .name(JsString::from(name))
        .length(length)
        .constructor(false)
        .build()
        .into()
}

fn capability_error(error: impl std::fmt::Display) -> JsNativeError {
    JsNativeError::error().with_message(error.to_string())
}

fn string_arg(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(args
        .get_or_undefined(index)
        .to_string(context)?
        .to_std_string_escaped())
}

// ── pdf-server ────────────────────────────────────────

#[derive(Finalize)]
struct PdfCapture {
    client: PdfServerClient,
    handle: Handle,
}

unsafe impl Trace for PdfCapture {
    empty_trace!();
}

fn pdf_object(
    client: PdfServerClient,
    handle: &Handle,
    context: &mut Context,
) -> JsResult<JsObject> {
    let render = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, args, captures, ctx| {
                let html = string_arg(args, 0, ctx)?;
                let options = match args.get(1) {
                    Some(value) if !value.is_undefined() => value.to_json(ctx)?,
                    _ => PdfServerClient::default_render_options(),
                };
                let data = captures
                    .handle
                    .block_on(captures.client.render_pdf(&html, &options))
                    .map_err(capability_error)?;
                let buffer = JsArrayBuffer::from_byte_block(data, ctx)?;
                let result = ObjectInitializer::new(ctx)
                    .property(js_string!("data"), buffer, Attribute::all())
                    .build();
                Ok(result.into())
            },
            PdfCapture {
                client,
                handle: handle.clone(),
            },
        )
    };
    let render = bind_method(context, "renderPdf", 2, render);

    Ok(ObjectInitializer::new(context)
        .property(js_string!("renderPdf"), render, Attribute::all())
        .build())
}

// ── material-tracing-server ───────────────────────────

#[derive(Finalize)]
struct MaterialTracingCapture {
    client: MaterialTracingServerClient,
    handle: Handle,
}

unsafe impl Trace for MaterialTracingCapture {
    empty_trace!();
}

fn material_tracing_object(
    client: MaterialTracingServerClient,
    handle: &Handle,
    context: &mut Context,
) -> JsResult<JsObject> {
    let get_part = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, args, captures, ctx| {
                let part_id = string_arg(args, 0, ctx)?;
                let part = captures
                    .handle
                    .block_on(captures.client.get_part(&part_id))
                    .map_err(capability_error)?;
                JsValue::from_json(&part, ctx)
            },
            MaterialTracingCapture {
                client: client.clone(),
                handle: handle.clone(),
            },
        )
    };
    let get_part = bind_method(context, "get", 1, get_part);

    let get_part_type = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, args, captures, ctx| {
                let part_type_id = string_arg(args, 0, ctx)?;
                let part_type = captures
                    .handle
                    .block_on(captures.client.get_part_type(&part_type_id))
                    .map_err(capability_error)?;
                JsValue::from_json(&part_type, ctx)
            },
            MaterialTracingCapture {
                client,
                handle: handle.clone(),
            },
        )
    };
    let get_part_type = bind_method(context, "get", 1, get_part_type);

    let parts = ObjectInitializer::new(context)
        .property(js_string!("get"), get_part, Attribute::all())
        .build();
    let part_types = ObjectInitializer::new(context)
        .property(js_string!("get"), get_part_type, Attribute::all())
        .build();

    Ok(ObjectInitializer::new(context)
        .property(js_string!("parts"), parts, Attribute::all())
        .property(js_string!("partTypes"), part_types, Attribute::all())
        .build())
}

// ── product-server ────────────────────────────────────

#[derive(Finalize)]
struct ProductCapture {
    client: ProductServerClient,
    handle: Handle,
}

unsafe impl Trace for ProductCapture {
    empty_trace!();
}

fn product_object(
    client: ProductServerClient,
    handle: &Handle,
    context: &mut Context,
) -> JsResult<JsObject> {
    let get_item = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, args, captures, ctx| {
                let item_id = string_arg(args, 0, ctx)?;
                let item = captures
                    .handle
                    .block_on(captures.client.get_item(&item_id))
                    .map_err(capability_error)?;
                JsValue::from_json(&item, ctx)
            },
            ProductCapture {
                client: client.clone(),
                handle: handle.clone(),
            },
        )
    };
    let get_item = bind_method(context, "get", 1, get_item);

    let list_elements = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, args, captures, ctx| {
                let attribute_id = string_arg(args, 0, ctx)?;
                let include = include_option(args.get_or_undefined(1), ctx)?;
                let elements = captures
                    .handle
                    .block_on(
                        captures
                            .client
                            .list_attribute_elements(&attribute_id, &include),
                    )
                    .map_err(capability_error)?;
                JsValue::from_json(&elements, ctx)
            },
            ProductCapture {
                client,
                handle: handle.clone(),
            },
        )
    };
    let list_elements = bind_method(context, "listByAttributeId", 2, list_elements);

    let items = ObjectInitializer::new(context)
        .property(js_string!("get"), get_item, Attribute::all())
        .build();
    let elements = ObjectInitializer::new(context)
        .property(js_string!("listByAttributeId"), list_elements, Attribute::all())
        .build();
    let attributes = ObjectInitializer::new(context)
        .property(js_string!("elements"), elements, Attribute::all())
        .build();

    Ok(ObjectInitializer::new(context)
        .property(js_string!("items"), items, Attribute::all())
        .property(js_string!("attributes"), attributes, Attribute::all())
        .build())
}

/// Extracts `{include: [...]}` from an options argument, tolerating a
/// missing options object or field.
fn include_option(options: &JsValue, context: &mut Context) -> JsResult<Vec<String>> {
    let Some(options) = options.as_object() else {
        return Ok(Vec::new());
    };
    let include = options.get(js_string!("include"), context)?;
    let Some(include) = include.as_object() else {
        return Ok(Vec::new());
    };
    let include = JsArray::from_object(include.clone())?;
    let length = include.length(context)?;
    let mut values = Vec::new();
    for index in 0..length {
        let value = include.get(index, context)?;
        values.push(value.to_string(context)?.to_std_string_escaped());
    }
    Ok(values)
}

// ── printer-server ────────────────────────────────────

#[derive(Finalize)]
struct PrinterCapture {
    client: PrinterServerClient,
    handle: Handle,
}

unsafe impl Trace for PrinterCapture {
    empty_trace!();
}

fn printer_object(
    client: PrinterServerClient,
    handle: &Handle,
    context: &mut Context,
) -> JsResult<JsObject> {
    let create_job = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, args, captures, ctx| {
                let printer_id = string_arg(args, 0, ctx)?;
                let data = match args.get(1) {
                    Some(value) if !value.is_undefined() => match value.to_json(ctx)? {
                        Value::Array(items) => items,
                        other => vec![other],
                    },
                    _ => Vec::new(),
                };
                let external_id = match args.get(2).and_then(JsValue::as_object) {
                    Some(options) => {
                        let value = options.get(js_string!("externalId"), ctx)?;
                        if value.is_undefined() || value.is_null() {
                            None
                        } else {
                            Some(value.to_string(ctx)?.to_std_string_escaped())
                        }
                    }
                    None => None,
                };
                let job = captures
                    .handle
                    .block_on(captures.client.create_receipt_job(
                        &printer_id,
                        data,
                        external_id.as_deref(),
                    ))
                    .map_err(capability_error)?;
                JsValue::from_json(&job, ctx)
            },
            PrinterCapture {
                client,
                handle: handle.clone(),
            },
        )
    };
    let create_job = bind_method(context, "createReceiptJob", 3, create_job);

    let jobs = ObjectInitializer::new(context)
        .property(js_string!("createReceiptJob"), create_job, Attribute::all())
        .build();
    let printers = ObjectInitializer::new(context)
        .property(js_string!("jobs"), jobs, Attribute::all())
        .build();

    Ok(ObjectInitializer::new(context)
        .property(js_string!("printers"), printers, Attribute::all())
        .build())
}
