//! Browser-style `FileReader` for sandboxed functions.
//!
//! Emulates asynchronous, event-driven reading of a [`Blob`] as text, raw
//! bytes, base64 data URL, or binary string. Ready state within one read
//! cycle only moves EMPTY → LOADING → DONE; a new read call re-arms a DONE
//! reader. Event handlers are single-slot `on*` properties: assigning a
//! handler replaces the previous one, and firing invokes at most the
//! currently assigned handler, synchronously.
//!
//! `loadstart` fires synchronously inside the read call; the byte read
//! itself runs as a deferred job on the engine's microtask queue so handlers
//! can be attached after the call, exactly like against the DOM API.

use base64::Engine;
use boa_engine::class::{Class, ClassBuilder};
use boa_engine::object::builtins::{JsArrayBuffer, JsPromise};
use boa_engine::object::{FunctionObjectBuilder, JsObject, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{
    js_string, Context, JsArgs, JsData, JsError, JsNativeError, JsResult, JsString, JsValue,
    NativeFunction,
};
use boa_gc::{custom_trace, Finalize, Trace};

use super::blob::Blob;
use super::now_ms;

const EMPTY: u32 = 0;
const LOADING: u32 = 1;
const DONE: u32 = 2;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

#[derive(Debug, Clone, Copy)]
enum ReadMode {
    Text,
    ArrayBuffer,
    DataUrl,
    BinaryString,
}

#[derive(Debug, Default, Trace, Finalize, JsData)]
pub struct FileReader {
    ready_state: u32,
    aborted: bool,
}

impl Class for FileReader {
    const NAME: &'static str = "FileReader";
    const LENGTH: usize = 0;

    fn data_constructor(
        _new_target: &JsValue,
        _args: &[JsValue],
        _context: &mut Context,
    ) -> JsResult<Self> {
        Ok(Self::default())
    }

    fn object_constructor(
        instance: &JsObject,
        _args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<()> {
        instance.set(js_string!("readyState"), EMPTY, true, context)?;
        instance.set(js_string!("result"), JsValue::null(), true, context)?;
        instance.set(js_string!("error"), JsValue::null(), true, context)?;
        for handler in [
            "onloadstart",
            "onprogress",
            "onload",
            "onabort",
            "onerror",
            "onloadend",
        ] {
            instance.set(JsString::from(handler), JsValue::null(), true, context)?;
        }
        Ok(())
    }

    fn init(class: &mut ClassBuilder<'_>) -> JsResult<()> {
        class.method(
            js_string!("readAsText"),
            1,
            NativeFunction::from_fn_ptr(Self::read_as_text),
        );
        class.method(
            js_string!("readAsArrayBuffer"),
            1,
            NativeFunction::from_fn_ptr(Self::read_as_array_buffer),
        );
        class.method(
            js_string!("readAsDataURL"),
            1,
            NativeFunction::from_fn_ptr(Self::read_as_data_url),
        );
        class.method(
            js_string!("readAsBinaryString"),
            1,
            NativeFunction::from_fn_ptr(Self::read_as_binary_string),
        );
        class.method(
            js_string!("abort"),
            0,
            NativeFunction::from_fn_ptr(Self::abort),
        );

        // Ready-state constants, on the constructor and on instances via
        // the prototype.
        for (name, value) in [("EMPTY", EMPTY), ("LOADING", LOADING), ("DONE", DONE)] {
            class.property(JsString::from(name), value, Attribute::all());
            class.static_property(JsString::from(name), value, Attribute::all());
        }
        Ok(())
    }
}

impl FileReader {
    fn read_as_text(this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        Self::start_read(this, args, ReadMode::Text, context)
    }

    fn read_as_array_buffer(
        this: &JsValue,
        args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<JsValue> {
        Self::start_read(this, args, ReadMode::ArrayBuffer, context)
    }

    fn read_as_data_url(
        this: &JsValue,
        args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<JsValue> {
        Self::start_read(this, args, ReadMode::DataUrl, context)
    }

    fn read_as_binary_string(
        this: &JsValue,
        args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<JsValue> {
        Self::start_read(this, args, ReadMode::BinaryString, context)
    }

    /// Shared entry of the four read modes. Throws synchronously while a
    /// read is in flight, without touching any state.
    fn start_read(
        this: &JsValue,
        args: &[JsValue],
        mode: ReadMode,
        context: &mut Context,
    ) -> JsResult<JsValue> {
        let reader = this
            .as_object()
            .cloned()
            .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a FileReader"))?;

        {
            let mut state = reader
                .downcast_mut::<FileReader>()
                .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a FileReader"))?;
            if state.ready_state == LOADING {
                return Err(JsNativeError::error()
                    .with_message("The FileReader is already reading")
                    .into());
            }
            state.ready_state = LOADING;
            state.aborted = false;
        }

        reader.set(js_string!("readyState"), LOADING, true, context)?;
        reader.set(js_string!("result"), JsValue::null(), true, context)?;
        reader.set(js_string!("error"), JsValue::null(), true, context)?;

        fire_event(&reader, "loadstart", context)?;

        schedule_completion(reader, args.get_or_undefined(0).clone(), mode, context);
        Ok(JsValue::undefined())
    }

    /// Effective only while LOADING: flags the pending read as aborted and
    /// delivers `abort` + `loadend` before the deferred job can run.
    fn abort(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        let reader = this
            .as_object()
            .cloned()
            .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a FileReader"))?;

        let transitioned = {
            let mut state = reader
                .downcast_mut::<FileReader>()
                .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a FileReader"))?;
            if state.ready_state == LOADING {
                state.aborted = true;
                state.ready_state = DONE;
                true
            } else {
                false
            }
        };

        if transitioned {
            reader.set(js_string!("readyState"), DONE, true, context)?;
            let error: JsError = JsNativeError::error()
                .with_message("The operation was aborted")
                .into();
            reader.set(js_string!("error"), error.to_opaque(context), true, context)?;
            fire_event(&reader, "abort", context)?;
            fire_event(&reader, "loadend", context)?;
        }

        Ok(JsValue::undefined())
    }
}

#[derive(Finalize)]
struct PendingRead {
    reader: JsObject,
    blob: JsValue,
    mode: ReadMode,
}

unsafe impl Trace for PendingRead {
    custom_trace!(this, mark, {
        mark(&this.reader);
        mark(&this.blob);
    });
}

/// Queues the byte read behind the current job, via a then-callback on an
/// already-resolved promise.
fn schedule_completion(reader: JsObject, blob: JsValue, mode: ReadMode, context: &mut Context) {
    let job = unsafe {
        NativeFunction::from_closure_with_captures(
            |_this, _args, captures, ctx| complete_read(captures, ctx),
            PendingRead { reader, blob, mode },
        )
    };
    let job = FunctionObjectBuilder::new(context.realm(), job)
        .name(js_string!(""))
        .length(0)
        .constructor(false)
        .build();
    let _ = JsPromise::resolve(JsValue::undefined(), context).then(Some(job), None, context);
}

fn complete_read(pending: &PendingRead, context: &mut Context) -> JsResult<JsValue> {
    {
        let state = pending
            .reader
            .downcast_ref::<FileReader>()
            .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a FileReader"))?;
        // Aborted since scheduling: the abort path already delivered the
        // terminal events, discard silently.
        if state.aborted {
            return Ok(JsValue::undefined());
        }
    }

    match read_blob(&pending.blob, pending.mode, context) {
        Ok(result) => {
            mark_done(&pending.reader, context)?;
            pending
                .reader
                .set(js_string!("result"), result, true, context)?;
            fire_event(&pending.reader, "progress", context)?;
            fire_event(&pending.reader, "load", context)?;
            fire_event(&pending.reader, "loadend", context)?;
        }
        Err(error) => {
            mark_done(&pending.reader, context)?;
            pending.reader.set(
                js_string!("error"),
                error.to_opaque(context),
                true,
                context,
            )?;
            fire_event(&pending.reader, "error", context)?;
            fire_event(&pending.reader, "loadend", context)?;
        }
    }

    Ok(JsValue::undefined())
}

fn mark_done(reader: &JsObject, context: &mut Context) -> JsResult<()> {
    {
        let mut state = reader
            .downcast_mut::<FileReader>()
            .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a FileReader"))?;
        state.ready_state = DONE;
    }
    reader.set(js_string!("readyState"), DONE, true, context)?;
    Ok(())
}

/// Produces the mode-specific result from the blob argument.
fn read_blob(blob: &JsValue, mode: ReadMode, context: &mut Context) -> JsResult<JsValue> {
    let type_error = || JsNativeError::typ().with_message("parameter 1 is not of type 'Blob'");

    let object = blob.as_object().ok_or_else(type_error)?;
    let (bytes, content_type) = {
        let blob = object.downcast_ref::<Blob>().ok_or_else(type_error)?;
        (blob.bytes().to_vec(), blob.content_type().to_string())
    };

    match mode {
        ReadMode::Text => Ok(JsString::from(String::from_utf8_lossy(&bytes).into_owned()).into()),
        ReadMode::ArrayBuffer => {
            Ok(JsArrayBuffer::from_byte_block(bytes, context)?.into())
        }
        ReadMode::DataUrl => {
            let mime = if content_type.is_empty() {
                "application/octet-stream"
            } else {
                content_type.as_str()
            };
            let data_url = format!("data:{mime};base64,{}", B64.encode(&bytes));
            Ok(JsString::from(data_url).into())
        }
        ReadMode::BinaryString => {
            let binary: String = bytes.iter().map(|&byte| char::from(byte)).collect();
            Ok(JsString::from(binary).into())
        }
    }
}

/// Invokes the single-slot handler for `kind`, if one is assigned. Event
/// payloads carry `{type, target, timeStamp}`, plus `error` on error events
/// and the progress triple on progress events.
fn fire_event(reader: &JsObject, kind: &str, context: &mut Context) -> JsResult<()> {
    let handler = reader.get(JsString::from(format!("on{kind}")), context)?;
    let Some(callable) = handler.as_callable().cloned() else {
        return Ok(());
    };

    let error_value = if kind == "error" {
        Some(reader.get(js_string!("error"), context)?)
    } else {
        None
    };

    let mut event = ObjectInitializer::new(context);
    event
        .property(js_string!("type"), JsString::from(kind), Attribute::all())
        .property(js_string!("target"), reader.clone(), Attribute::all())
        .property(js_string!("timeStamp"), now_ms(), Attribute::all());
    if let Some(error_value) = error_value {
        event.property(js_string!("error"), error_value, Attribute::all());
    }
    if kind == "progress" {
        event
            .property(js_string!("loaded"), 1, Attribute::all())
            .property(js_string!("total"), 1, Attribute::all())
            .property(js_string!("lengthComputable"), true, Attribute::all());
    }
    let event = event.build();

    callable.call(&JsValue::from(reader.clone()), &[event.into()], context)?;
    Ok(())
}
