//! Building outbound requests from a route template and validated arguments.

use crate::descriptor::{ParamLocation, ParamSpec, RouteTemplate};
use crate::runtime::{HttpToolsError, Result};
use crate::template::{placeholders, render_template, value_to_string};
use crate::validation::ValidatedArgs;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use url::Url;

/// Where outbound requests go and what every request carries.
///
/// `vars` fills path placeholders that do not come from tool arguments (e.g. `{instance}`).
#[derive(Clone)]
pub struct UpstreamTarget {
    pub base_url: Url,
    pub vars: HashMap<String, String>,
    pub headers: Vec<(String, String)>,
}

impl std::fmt::Debug for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values carry credentials.
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("UpstreamTarget")
            .field("base_url", &self.base_url.as_str())
            .field("vars", &self.vars)
            .field("headers", &header_names)
            .finish()
    }
}

impl UpstreamTarget {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            vars: HashMap::new(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// A fully built request, ready to send.
#[derive(Clone, Serialize)]
pub struct OutboundRequest {
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    #[serde(serialize_with = "serialize_url")]
    pub url: Url,
    #[serde(skip)]
    pub headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl std::fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl OutboundRequest {
    /// Value of the first query pair named `key`, percent-decoded.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[must_use]
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

fn serialize_method<S: serde::Serializer>(m: &Method, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(m.as_str())
}

fn serialize_url<S: serde::Serializer>(u: &Url, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(u.as_str())
}

/// Assemble the outbound request for one tool call.
///
/// Header order is: `Content-Type: application/json`, then the target's headers.
///
/// # Errors
///
/// Returns a config error if a path placeholder cannot be resolved, or a runtime error if the
/// resulting URL does not parse.
pub fn build_request(
    route: &RouteTemplate,
    params: &[ParamSpec],
    args: &ValidatedArgs,
    target: &UpstreamTarget,
) -> Result<OutboundRequest> {
    let mut path_values: HashMap<&str, String> = HashMap::new();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut body: Map<String, Value> = Map::new();

    for param in params {
        let Some(value) = args.get(&param.name) else {
            continue;
        };
        match param.location {
            ParamLocation::Path => {
                path_values.insert(param.wire_name(), value_to_string(value));
            }
            ParamLocation::Query => {
                query.push((param.wire_name().to_string(), value_to_string(value)));
            }
            ParamLocation::Body => {
                body.insert(param.wire_name().to_string(), value.clone());
            }
        }
    }

    let mut path = render_template(&route.path, |key| {
        path_values
            .get(key)
            .cloned()
            .or_else(|| target.vars.get(key).cloned())
    });
    if let Some(missing) = placeholders(&path).first() {
        return Err(HttpToolsError::Config(format!(
            "Unresolved placeholder '{{{missing}}}' in path '{}'",
            route.path
        )));
    }
    if !path.starts_with('/') {
        path = format!("/{path}");
    }

    let url = build_url(&target.base_url, &path, &query)?;

    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    headers.extend(target.headers.iter().cloned());

    let body = (route.method != Method::GET && route.method != Method::HEAD)
        .then_some(Value::Object(body));

    Ok(OutboundRequest {
        method: route.method.clone(),
        url,
        headers,
        body,
    })
}

fn build_url(base_url: &Url, path: &str, query: &[(String, String)]) -> Result<Url> {
    let url = format!("{}{}", base_url.as_str().trim_end_matches('/'), path);
    let mut url =
        Url::parse(&url).map_err(|e| HttpToolsError::Runtime(format!("Invalid URL: {e}")))?;

    if !query.is_empty() {
        let mut qs = String::new();
        for (i, (key, value)) in query.iter().enumerate() {
            if i > 0 {
                qs.push('&');
            }
            qs.push_str(&encode_query_component(key));
            qs.push('=');
            qs.push_str(&encode_query_component(value));
        }
        url.set_query(Some(&qs));
    }

    Ok(url)
}

// Keeps values verbatim where the query grammar allows it; only bytes that would split the pair
// (`&`, `=`, `#`, whitespace, non-ASCII) are percent-encoded.
fn encode_query_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) || is_reserved_but_safe_in_pairs(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

fn is_reserved_but_safe_in_pairs(b: u8) -> bool {
    matches!(
        b,
        b':' | b'/'
            | b'?'
            | b'@'
            | b'!'
            | b'$'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
    )
}
