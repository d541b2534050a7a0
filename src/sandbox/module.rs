//! Module loading policy for submitted function code.

use boa_engine::module::{Module, ModuleLoader, Referrer};
use boa_engine::{Context, JsNativeError, JsResult, JsString};

/// Loader that refuses every import. Function modules are self-contained;
/// nothing outside the submitted source text ever executes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RejectingModuleLoader;

impl ModuleLoader for RejectingModuleLoader {
    fn load_imported_module(
        &self,
        _referrer: Referrer,
        specifier: JsString,
        finish_load: Box<dyn FnOnce(JsResult<Module>, &mut Context)>,
        context: &mut Context,
    ) {
        let message = format!("module not found: {}", specifier.to_std_string_escaped());
        finish_load(
            Err(JsNativeError::typ().with_message(message).into()),
            context,
        );
    }
}
