//! `Blob`: an immutable, typed, in-memory byte sequence.
//!
//! Mirrors the browser surface the blob reader consumes: parts-array
//! constructor, `size`/`type` properties, promise-returning `text()` and
//! `arrayBuffer()`.

use boa_engine::class::{Class, ClassBuilder};
use boa_engine::object::builtins::{JsArray, JsArrayBuffer, JsPromise, JsUint8Array};
use boa_engine::object::JsObject;
use boa_engine::{
    js_string, Context, JsArgs, JsData, JsNativeError, JsResult, JsString, JsValue, NativeFunction,
};
use boa_gc::{Finalize, Trace};

#[derive(Debug, Clone, Default, Trace, Finalize, JsData)]
pub struct Blob {
    bytes: Vec<u8>,
    content_type: String,
}

impl Blob {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Copies out the state needed by a method body so no GC borrow is held
    /// while re-entering the engine.
    fn cloned_data(this: &JsValue) -> JsResult<Blob> {
        let object = this
            .as_object()
            .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a Blob"))?;
        let blob = object
            .downcast_ref::<Blob>()
            .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a Blob"))?;
        Ok(blob.clone())
    }

    fn text(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        let blob = Self::cloned_data(this)?;
        let text = String::from_utf8_lossy(&blob.bytes).into_owned();
        Ok(JsPromise::resolve(JsString::from(text), context).into())
    }

    fn array_buffer(this: &JsValue, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        let blob = Self::cloned_data(this)?;
        let buffer = JsArrayBuffer::from_byte_block(blob.bytes.clone(), context)?;
        Ok(JsPromise::resolve(JsValue::from(buffer), context).into())
    }
}

impl Class for Blob {
    const NAME: &'static str = "Blob";
    const LENGTH: usize = 0;

    fn data_constructor(
        _new_target: &JsValue,
        args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<Self> {
        let mut bytes = Vec::new();

        let parts = args.get_or_undefined(0);
        if !parts.is_undefined() && !parts.is_null() {
            let object = parts
                .as_object()
                .ok_or_else(|| JsNativeError::typ().with_message("Blob parts must be an array"))?;
            let parts = JsArray::from_object(object.clone())?;
            let length = parts.length(context)?;
            for index in 0..length {
                let part = parts.get(index, context)?;
                append_part(&mut bytes, &part, context)?;
            }
        }

        let content_type = match args.get_or_undefined(1).as_object() {
            Some(options) => {
                let value = options.get(js_string!("type"), context)?;
                if value.is_undefined() {
                    String::new()
                } else {
                    value.to_string(context)?.to_std_string_escaped()
                }
            }
            None => String::new(),
        };

        Ok(Self {
            bytes,
            content_type,
        })
    }

    fn object_constructor(
        instance: &JsObject,
        _args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<()> {
        let (size, content_type) = {
            let blob = instance
                .downcast_ref::<Blob>()
                .ok_or_else(|| JsNativeError::typ().with_message("`this` is not a Blob"))?;
            (blob.bytes.len(), blob.content_type.clone())
        };
        let size = i32::try_from(size)
            .map_or_else(|_| JsValue::from(size as f64), JsValue::from);
        instance.set(js_string!("size"), size, true, context)?;
        instance.set(
            js_string!("type"),
            JsString::from(content_type),
            true,
            context,
        )?;
        Ok(())
    }

    fn init(class: &mut ClassBuilder<'_>) -> JsResult<()> {
        class.method(
            js_string!("text"),
            0,
            NativeFunction::from_fn_ptr(Self::text),
        );
        class.method(
            js_string!("arrayBuffer"),
            0,
            NativeFunction::from_fn_ptr(Self::array_buffer),
        );
        Ok(())
    }
}

/// Appends one constructor part: nested blobs and binary views keep their
/// bytes, everything else stringifies to UTF-8.
fn append_part(bytes: &mut Vec<u8>, part: &JsValue, context: &mut Context) -> JsResult<()> {
    if let Some(object) = part.as_object() {
        let nested = object.downcast_ref::<Blob>().map(|blob| blob.bytes.clone());
        if let Some(nested) = nested {
            bytes.extend_from_slice(&nested);
            return Ok(());
        }
        if let Ok(view) = JsUint8Array::from_object(object.clone()) {
            extend_from_uint8_array(bytes, &view, context)?;
            return Ok(());
        }
        if let Ok(buffer) = JsArrayBuffer::from_object(object.clone()) {
            let view = JsUint8Array::from_array_buffer(buffer, context)?;
            extend_from_uint8_array(bytes, &view, context)?;
            return Ok(());
        }
    }

    let text = part.to_string(context)?;
    bytes.extend_from_slice(text.to_std_string_escaped().as_bytes());
    Ok(())
}

pub(crate) fn extend_from_uint8_array(
    bytes: &mut Vec<u8>,
    view: &JsUint8Array,
    context: &mut Context,
) -> JsResult<()> {
    let length = view.length(context)?;
    for index in 0..length {
        let value = view.get(index, context)?;
        bytes.push(value.to_number(context)? as u8);
    }
    Ok(())
}
