//! Tool dispatch: resolve, validate, build, execute, render.
//!
//! The dispatcher is the only component that talks to the Evolution API. Transports never see
//! descriptors or outbound requests; they get a [`CallToolResult`] or a [`ToolCallError`].

use crate::catalog;
use crate::config::UpstreamConfig;
use crate::error::{Result, ToolCallError};
use crate::protocol::CallToolResult;
use crate::registry::ToolRegistry;
use evolution_http_tools::descriptor::{ToolAction, ToolDescriptor};
use evolution_http_tools::request::{OutboundRequest, UpstreamTarget, build_request};
use evolution_http_tools::runtime::{HttpToolsError, UpstreamClient, redact_url};
use evolution_http_tools::semantics::{ToolAnnotations, annotations_for_method, local_annotations};
use evolution_http_tools::validation::{ValidatedArgs, validate_arguments};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One entry of a tool listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
}

impl ToolInfo {
    fn from_descriptor(tool: &ToolDescriptor) -> Self {
        let annotations = tool
            .method()
            .map_or_else(local_annotations, annotations_for_method);
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema(),
            annotations,
        }
    }
}

/// What a call resolves to before anything is executed.
#[derive(Debug)]
pub enum PreparedCall {
    /// Request that would be sent upstream.
    Upstream(OutboundRequest),
    /// Tool answered in-process; no request is involved.
    Local { tool: String },
}

/// Client and target for upstream tools. Absent when the catalog is only listed or when only
/// local tools are called.
struct Upstream {
    client: UpstreamClient,
    target: UpstreamTarget,
}

pub struct Dispatcher {
    registry: ToolRegistry,
    upstream: Option<Upstream>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: ToolRegistry, upstream: UpstreamClient, target: UpstreamTarget) -> Self {
        Self {
            registry,
            upstream: Some(Upstream {
                client: upstream,
                target,
            }),
        }
    }

    /// Dispatcher without an upstream API: listing and local tools work, upstream tools fail
    /// with [`ToolCallError::Request`].
    ///
    /// # Errors
    ///
    /// Returns a config error if the catalog contains duplicate names.
    pub fn catalog_only(demo_tools: bool) -> Result<Self> {
        Ok(Self {
            registry: ToolRegistry::new(catalog::catalog(demo_tools))?,
            upstream: None,
        })
    }

    /// Build the dispatcher for the Evolution catalog.
    ///
    /// # Errors
    ///
    /// Returns a config error if the catalog contains duplicate names.
    pub fn from_config(config: &UpstreamConfig, demo_tools: bool) -> Result<Self> {
        let registry = ToolRegistry::new(catalog::catalog(demo_tools))?;
        info!(
            tools = registry.len(),
            instance = %config.instance_id,
            api_base = %redact_url(&config.api_base_url),
            "tool registry ready"
        );
        Ok(Self::new(
            registry,
            UpstreamClient::new(config.timeout),
            config.target(),
        ))
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Whether calling `name` sends a request to the Evolution API.
    #[must_use]
    pub fn needs_upstream(&self, name: &str) -> bool {
        self.registry
            .lookup(name)
            .is_some_and(|tool| tool.method().is_some())
    }

    /// Tool listing in catalog order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.registry
            .list()
            .iter()
            .map(ToolInfo::from_descriptor)
            .collect()
    }

    /// Execute one tool call.
    ///
    /// Upstream failures (connection errors, non-2xx answers) are not errors here: they come back
    /// as a result with `isError: true` and the tool's failure text.
    ///
    /// # Errors
    ///
    /// Returns [`ToolCallError::UnknownTool`] or [`ToolCallError::InvalidArguments`] before any
    /// outbound call is made, and [`ToolCallError::Request`] if the request cannot be assembled.
    pub async fn handle(
        &self,
        name: &str,
        arguments: Value,
    ) -> std::result::Result<CallToolResult, ToolCallError> {
        let (tool, args) = self.resolve(name, &arguments)?;

        let (route, reply) = match &tool.action {
            ToolAction::Local(handler) => {
                debug!(tool = %name, "local tool call");
                return Ok(CallToolResult::text(handler(&args)));
            }
            ToolAction::Upstream { route, reply } => (route, reply),
        };

        let upstream = self.upstream_for(name)?;
        let request =
            build_request(route, &tool.params, &args, &upstream.target).map_err(|e| {
                ToolCallError::Request {
                    tool: name.to_string(),
                    source: e,
                }
            })?;

        let started = Instant::now();
        match upstream.client.execute(&request).await {
            Ok(response) => {
                info!(
                    tool = %name,
                    status = response.status,
                    elapsed_ms = elapsed_ms(started),
                    "tool call succeeded"
                );
                Ok(CallToolResult::text(
                    reply.render_success(&args, &response.body),
                ))
            }
            Err(e) => {
                warn!(
                    tool = %name,
                    url = %redact_url(&request.url),
                    elapsed_ms = elapsed_ms(started),
                    error = %e,
                    "upstream call failed"
                );
                Ok(CallToolResult::error_text(
                    reply.render_failure(&upstream_message(&e)),
                ))
            }
        }
    }

    /// Resolve, validate and build without executing.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::handle`], minus the outbound call.
    pub fn prepare(
        &self,
        name: &str,
        arguments: &Value,
    ) -> std::result::Result<PreparedCall, ToolCallError> {
        let (tool, args) = self.resolve(name, arguments)?;
        match &tool.action {
            ToolAction::Local(_) => Ok(PreparedCall::Local {
                tool: tool.name.clone(),
            }),
            ToolAction::Upstream { route, .. } => {
                build_request(route, &tool.params, &args, &self.upstream_for(name)?.target)
                    .map(PreparedCall::Upstream)
                    .map_err(|e| ToolCallError::Request {
                        tool: name.to_string(),
                        source: e,
                    })
            }
        }
    }

    fn upstream_for(&self, name: &str) -> std::result::Result<&Upstream, ToolCallError> {
        self.upstream.as_ref().ok_or_else(|| ToolCallError::Request {
            tool: name.to_string(),
            source: HttpToolsError::Config("Evolution API is not configured".to_string()),
        })
    }

    fn resolve(
        &self,
        name: &str,
        arguments: &Value,
    ) -> std::result::Result<(&ToolDescriptor, ValidatedArgs), ToolCallError> {
        let Some(tool) = self.registry.lookup(name) else {
            debug!(tool = %name, "unknown tool");
            return Err(ToolCallError::UnknownTool(name.to_string()));
        };
        let args = validate_arguments(tool, arguments).map_err(|e| {
            debug!(tool = %name, error = %e, "invalid arguments");
            ToolCallError::InvalidArguments {
                tool: name.to_string(),
                source: e,
            }
        })?;
        Ok((tool, args))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// Strip the error-kind prefix so failure texts read "Erro ao obter grupos: API returned 500 ...".
fn upstream_message(e: &HttpToolsError) -> String {
    match e {
        HttpToolsError::Config(s)
        | HttpToolsError::Runtime(s)
        | HttpToolsError::Http(s)
        | HttpToolsError::Transport(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;

    fn dispatcher() -> Dispatcher {
        let registry = ToolRegistry::new(catalog::catalog(true)).expect("registry");
        let target = UpstreamTarget::new(Url::parse("http://evolution.local:8080").expect("url"))
            .var("instance", "main")
            .header("apikey", "k");
        Dispatcher::new(registry, UpstreamClient::new(None), target)
    }

    fn upstream(prepared: PreparedCall) -> OutboundRequest {
        match prepared {
            PreparedCall::Upstream(request) => request,
            PreparedCall::Local { tool } => panic!("{tool} is local"),
        }
    }

    #[test]
    fn envia_mensagem_builds_send_text_request() {
        let request = upstream(
            dispatcher()
                .prepare(
                    "envia_mensagem",
                    &json!({ "number": "5511999999999", "mensagem": "oi" }),
                )
                .expect("prepared"),
        );
        assert_eq!(request.method, reqwest::Method::POST);
        assert_eq!(
            request.url.as_str(),
            "http://evolution.local:8080/message/sendText/main"
        );
        assert_eq!(
            request.body,
            Some(json!({ "number": "5511999999999", "text": "oi" }))
        );
        assert_eq!(request.header_value("apikey"), Some("k"));
        assert_eq!(request.header_value("content-type"), Some("application/json"));
    }

    #[test]
    fn busca_grupos_defaults_get_participants_to_false() {
        let request = upstream(
            dispatcher()
                .prepare("busca_grupos", &json!({}))
                .expect("prepared"),
        );
        assert_eq!(request.url.query(), Some("getParticipants=false"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn cria_grupo_without_description_omits_it() {
        let request = upstream(
            dispatcher()
                .prepare(
                    "cria_grupo",
                    &json!({ "subject": "Equipe", "participants": ["5511999999999"] }),
                )
                .expect("prepared"),
        );
        assert_eq!(
            request.body,
            Some(json!({ "subject": "Equipe", "participants": ["5511999999999"] }))
        );
    }

    #[test]
    fn group_jid_is_substituted_verbatim() {
        let request = upstream(
            dispatcher()
                .prepare(
                    "busca_participantes_grupo",
                    &json!({ "groupJid": "120363025246125244@g.us" }),
                )
                .expect("prepared"),
        );
        assert_eq!(
            request.url.as_str(),
            "http://evolution.local:8080/group/participants/main?groupJid=120363025246125244@g.us"
        );
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = dispatcher().prepare("envia_audio", &json!({})).unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(ref n) if n == "envia_audio"));
    }

    #[test]
    fn invalid_arguments_report_every_violation() {
        let err = dispatcher()
            .prepare("cria_grupo", &json!({ "participants": "5511" }))
            .unwrap_err();
        let ToolCallError::InvalidArguments { source, .. } = &err else {
            panic!("expected invalid arguments, got {err}");
        };
        assert_eq!(source.violations.len(), 2);
    }

    #[test]
    fn listing_carries_method_annotations() {
        let tools = dispatcher().list_tools();
        assert_eq!(tools[0].annotations.read_only_hint, Some(false));
        assert_eq!(tools[2].annotations.read_only_hint, Some(true));
        assert_eq!(tools[2].annotations.open_world_hint, Some(true));
        assert_eq!(tools[4].annotations.open_world_hint, Some(false));
        let v = serde_json::to_value(&tools[3]).expect("json");
        assert!(v["inputSchema"]["properties"]["groupJid"].is_object());
    }

    #[tokio::test]
    async fn catalog_only_lists_and_answers_local_tools() {
        let dispatcher = Dispatcher::catalog_only(true).expect("dispatcher");
        assert_eq!(dispatcher.list_tools().len(), 5);
        assert!(dispatcher.needs_upstream("busca_grupos"));
        assert!(!dispatcher.needs_upstream("hello"));
        assert!(!dispatcher.needs_upstream("envia_audio"));

        let result = dispatcher
            .handle("hello", json!({ "name": "Ana" }))
            .await
            .expect("result");
        assert_eq!(result.joined_text(), "Hello Ana");

        let err = dispatcher
            .handle("busca_grupos", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolCallError::Request { ref tool, .. } if tool == "busca_grupos"));
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn elapsed_ms_is_small_for_a_fresh_instant() {
        assert!(elapsed_ms(Instant::now()) < 60_000);
    }

    #[tokio::test]
    async fn local_tool_answers_without_upstream() {
        let result = dispatcher()
            .handle("hello", json!({ "name": "Ana" }))
            .await
            .expect("result");
        assert_eq!(result.joined_text(), "Hello Ana");
        assert_eq!(result.is_error, None);
    }
}
