//! Static tool descriptors.
//!
//! A descriptor is the compiled form of one tool: its name, the arguments it accepts and where
//! each argument lands in the outbound request, and what the tool does when called. Descriptors
//! are built once at startup and never mutated.

use crate::reply::ReplyFormat;
use crate::validation::ValidatedArgs;
use reqwest::Method;
use serde_json::{Value, json};

/// JSON type accepted for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Boolean,
    StringArray,
}

impl ParamKind {
    /// JSON Schema fragment for this kind.
    #[must_use]
    pub fn schema(self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Boolean => json!({ "type": "boolean" }),
            Self::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }

    /// Human-readable name used in validation messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::StringArray => "array of strings",
        }
    }

    pub(crate) fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

/// Where a validated argument is placed in the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Body,
}

/// One declared tool argument.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub location: ParamLocation,
    /// Name used on the wire when it differs from the tool-facing name.
    pub http_name: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl ParamSpec {
    /// A required parameter of the given kind, sent in the JSON body by default.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            location: ParamLocation::Body,
            http_name: None,
            required: true,
            default: None,
            description: None,
        }
    }

    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::String)
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Boolean)
    }

    #[must_use]
    pub fn string_array(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::StringArray)
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Optional with a default applied during validation.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn in_query(mut self) -> Self {
        self.location = ParamLocation::Query;
        self
    }

    #[must_use]
    pub fn in_path(mut self) -> Self {
        self.location = ParamLocation::Path;
        self
    }

    #[must_use]
    pub fn sent_as(mut self, http_name: impl Into<String>) -> Self {
        self.http_name = Some(http_name.into());
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The name this parameter carries in the outbound request.
    #[must_use]
    pub fn wire_name(&self) -> &str {
        self.http_name.as_deref().unwrap_or(&self.name)
    }
}

/// Outbound HTTP route: method plus a path template such as `/group/create/{instance}`.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    pub method: Method,
    pub path: String,
}

impl RouteTemplate {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }
}

/// Handler for tools answered in-process.
pub type LocalHandler = fn(&ValidatedArgs) -> String;

/// What calling the tool does.
#[derive(Clone)]
pub enum ToolAction {
    /// Forward to the upstream API and render the response.
    Upstream {
        route: RouteTemplate,
        reply: ReplyFormat,
    },
    /// Answer locally without any outbound call.
    Local(LocalHandler),
}

impl std::fmt::Debug for ToolAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upstream { route, reply } => f
                .debug_struct("Upstream")
                .field("route", route)
                .field("reply", reply)
                .finish(),
            Self::Local(_) => f.write_str("Local"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub action: ToolAction,
}

impl ToolDescriptor {
    #[must_use]
    pub fn upstream(
        name: impl Into<String>,
        description: impl Into<String>,
        route: RouteTemplate,
        reply: ReplyFormat,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            action: ToolAction::Upstream { route, reply },
        }
    }

    #[must_use]
    pub fn local(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: LocalHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            action: ToolAction::Local(handler),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn method(&self) -> Option<&Method> {
        match &self.action {
            ToolAction::Upstream { route, .. } => Some(&route.method),
            ToolAction::Local(_) => None,
        }
    }

    /// JSON Schema describing the accepted arguments.
    ///
    /// `required` is always present (possibly empty) so callers can rely on its shape.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<Value> = Vec::new();

        for param in &self.params {
            let mut prop = param.kind.schema();
            if let Some(description) = &param.description {
                prop["description"] = json!(description);
            }
            if let Some(default) = &param.default {
                prop["default"] = default.clone();
            }
            properties.insert(param.name.clone(), prop);

            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
