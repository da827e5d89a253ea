//! HTTP semantics helpers.
//!
//! Tool annotations for listed tools are derived from RFC 9110-style method semantics.

use reqwest::Method;
use serde::Serialize;

/// Behavioral hints advertised alongside each tool in a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

/// Generate tool annotations based on HTTP method semantics.
///
/// `openWorldHint` is always `true` for HTTP tools (they talk to an external system). For
/// extension methods only `openWorldHint` is set.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let open_world_hint = Some(true);

    let (read_only, destructive, idempotent) = if method == Method::GET
        || method == Method::HEAD
        || method == Method::OPTIONS
    {
        (Some(true), Some(false), Some(true))
    } else if method == Method::POST {
        (Some(false), Some(false), Some(false))
    } else if method == Method::PUT || method == Method::DELETE {
        (Some(false), Some(true), Some(true))
    } else if method == Method::PATCH {
        // PATCH may or may not be idempotent; do not guess.
        (Some(false), Some(true), None)
    } else {
        (None, None, None)
    };

    ToolAnnotations {
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint,
    }
}

/// Annotations for a tool answered in-process.
#[must_use]
pub fn local_annotations() -> ToolAnnotations {
    ToolAnnotations {
        read_only_hint: Some(true),
        destructive_hint: Some(false),
        idempotent_hint: Some(true),
        open_world_hint: Some(false),
    }
}
