//! Rendering of upstream responses into caller-facing text.

use crate::template::render_template;
use crate::validation::ValidatedArgs;
use serde_json::Value;

/// How the upstream body is printed after the headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStyle {
    Compact,
    Pretty,
}

/// Text produced for a tool's success and failure outcomes.
///
/// `headline` may reference validated arguments with `{name}` placeholders; unknown placeholders
/// are kept as written.
#[derive(Debug, Clone)]
pub struct ReplyFormat {
    pub headline: String,
    pub body_style: BodyStyle,
    pub failure_prefix: String,
}

impl ReplyFormat {
    #[must_use]
    pub fn new(
        headline: impl Into<String>,
        body_style: BodyStyle,
        failure_prefix: impl Into<String>,
    ) -> Self {
        Self {
            headline: headline.into(),
            body_style,
            failure_prefix: failure_prefix.into(),
        }
    }

    #[must_use]
    pub fn render_success(&self, args: &ValidatedArgs, body: &Value) -> String {
        let headline = render_template(&self.headline, |key| {
            args.get(key).map(crate::template::value_to_string)
        });
        let body = match self.body_style {
            BodyStyle::Compact => serde_json::to_string(body),
            BodyStyle::Pretty => serde_json::to_string_pretty(body),
        }
        .unwrap_or_else(|_| body.to_string());
        format!("{headline}{body}")
    }

    #[must_use]
    pub fn render_failure(&self, error: &impl std::fmt::Display) -> String {
        format!("{}: {error}", self.failure_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ParamSpec, ToolDescriptor};
    use crate::validation::validate_arguments;
    use serde_json::json;

    fn args() -> ValidatedArgs {
        let tool = ToolDescriptor::local("send", "test", |_| String::new())
            .param(ParamSpec::string("number"));
        validate_arguments(&tool, &json!({ "number": "5511999999999" })).expect("valid")
    }

    #[test]
    fn compact_success_embeds_arguments_and_raw_json() {
        let reply = ReplyFormat::new(
            "Sent to {number}.\nResponse: ",
            BodyStyle::Compact,
            "Send failed",
        );
        let text = reply.render_success(&args(), &json!({ "status": "sent" }));
        assert_eq!(text, "Sent to 5511999999999.\nResponse: {\"status\":\"sent\"}");
    }

    #[test]
    fn pretty_success_indents_body() {
        let reply = ReplyFormat::new("Groups:\n", BodyStyle::Pretty, "Failed");
        let text = reply.render_success(&ValidatedArgs::default(), &json!([{ "id": "g1" }]));
        assert_eq!(text, "Groups:\n[\n  {\n    \"id\": \"g1\"\n  }\n]");
    }

    #[test]
    fn string_bodies_are_quoted_like_json() {
        let reply = ReplyFormat::new("Got: ", BodyStyle::Compact, "Failed");
        let text = reply.render_success(&ValidatedArgs::default(), &json!("plain"));
        assert_eq!(text, "Got: \"plain\"");
    }

    #[test]
    fn failure_is_prefixed() {
        let reply = ReplyFormat::new("", BodyStyle::Compact, "Erro ao obter grupos");
        assert_eq!(
            reply.render_failure(&"API returned 500"),
            "Erro ao obter grupos: API returned 500"
        );
    }
}
