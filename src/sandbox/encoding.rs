//! Encoding helpers exposed as sandbox globals.
//!
//! `btoa`/`atob` convert between UTF-8 text and standard base64 (the
//! emulated host treated input as UTF-8 rather than Latin-1, and sandboxed
//! code depends on that). `TextEncoder`/`TextDecoder` cover the text↔bytes
//! primitives.

use base64::Engine;
use boa_engine::class::{Class, ClassBuilder};
use boa_engine::object::builtins::{JsArrayBuffer, JsUint8Array};
use boa_engine::{
    js_string, Context, JsArgs, JsData, JsNativeError, JsResult, JsString, JsValue, NativeFunction,
};
use boa_gc::{Finalize, Trace};

use super::blob::extend_from_uint8_array;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

pub(crate) fn register_encoding(context: &mut Context) -> JsResult<()> {
    context.register_global_callable(js_string!("btoa"), 1, NativeFunction::from_fn_ptr(btoa))?;
    context.register_global_callable(js_string!("atob"), 1, NativeFunction::from_fn_ptr(atob))?;
    context.register_global_class::<TextEncoder>()?;
    context.register_global_class::<TextDecoder>()?;
    Ok(())
}

fn btoa(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let text = args
        .get_or_undefined(0)
        .to_string(context)?
        .to_std_string_escaped();
    Ok(JsString::from(B64.encode(text.as_bytes())).into())
}

fn atob(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let encoded = args
        .get_or_undefined(0)
        .to_string(context)?
        .to_std_string_escaped();
    let bytes = B64.decode(encoded.as_bytes()).map_err(|_| {
        JsNativeError::error().with_message("atob: the string to be decoded is not valid base64")
    })?;
    Ok(JsString::from(String::from_utf8_lossy(&bytes).into_owned()).into())
}

#[derive(Debug, Default, Trace, Finalize, JsData)]
pub struct TextEncoder;

impl TextEncoder {
    fn encode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        let text = args
            .get_or_undefined(0)
            .to_string(context)?
            .to_std_string_escaped();
        let array = JsUint8Array::from_iter(text.into_bytes(), context)?;
        Ok(array.into())
    }
}

impl Class for TextEncoder {
    const NAME: &'static str = "TextEncoder";
    const LENGTH: usize = 0;

    fn data_constructor(
        _new_target: &JsValue,
        _args: &[JsValue],
        _context: &mut Context,
    ) -> JsResult<Self> {
        Ok(Self)
    }

    fn init(class: &mut ClassBuilder<'_>) -> JsResult<()> {
        class.method(
            js_string!("encode"),
            1,
            NativeFunction::from_fn_ptr(Self::encode),
        );
        Ok(())
    }
}

#[derive(Debug, Default, Trace, Finalize, JsData)]
pub struct TextDecoder;

impl TextDecoder {
    fn decode(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
        let input = args.get_or_undefined(0);
        if input.is_undefined() {
            return Ok(JsString::from("").into());
        }

        let object = input.as_object().ok_or_else(|| {
            JsNativeError::typ().with_message("TextDecoder.decode expects a buffer source")
        })?;

        let mut bytes = Vec::new();
        if let Ok(view) = JsUint8Array::from_object(object.clone()) {
            extend_from_uint8_array(&mut bytes, &view, context)?;
        } else if let Ok(buffer) = JsArrayBuffer::from_object(object.clone()) {
            let view = JsUint8Array::from_array_buffer(buffer, context)?;
            extend_from_uint8_array(&mut bytes, &view, context)?;
        } else {
            return Err(JsNativeError::typ()
                .with_message("TextDecoder.decode expects a buffer source")
                .into());
        }

        Ok(JsString::from(String::from_utf8_lossy(&bytes).into_owned()).into())
    }
}

impl Class for TextDecoder {
    const NAME: &'static str = "TextDecoder";
    const LENGTH: usize = 0;

    fn data_constructor(
        _new_target: &JsValue,
        _args: &[JsValue],
        _context: &mut Context,
    ) -> JsResult<Self> {
        Ok(Self)
    }

    fn init(class: &mut ClassBuilder<'_>) -> JsResult<()> {
        class.method(
            js_string!("decode"),
            1,
            NativeFunction::from_fn_ptr(Self::decode),
        );
        Ok(())
    }
}
