//! Input types for one sandboxed invocation.
//!
//! Both are produced by the (external) function catalog and treated as
//! read-only for the duration of a single `execute` call.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable, versioned unit of submitted function source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionVersion {
    pub id: String,
    pub function_id: String,
    pub external_id: Option<String>,
    pub is_active: bool,
    /// Source text of the function module. Must export `run(...args)`.
    pub code: String,
    pub publish_time: DateTime<Utc>,
    pub creation_time: DateTime<Utc>,
}

/// Declared capability configurations available to one execution context.
///
/// Keys are the capability names the sandboxed code sees under the `api`
/// global; values are the raw per-capability configuration objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerMeta {
    pub api: BTreeMap<String, serde_json::Value>,
}
