//! The fixed tool catalog.

use evolution_http_tools::descriptor::{ParamSpec, RouteTemplate, ToolDescriptor};
use evolution_http_tools::reply::{BodyStyle, ReplyFormat};
use evolution_http_tools::validation::ValidatedArgs;
use serde_json::json;

pub const ENVIA_MENSAGEM: &str = "envia_mensagem";
pub const CRIA_GRUPO: &str = "cria_grupo";
pub const BUSCA_GRUPOS: &str = "busca_grupos";
pub const BUSCA_PARTICIPANTES_GRUPO: &str = "busca_participantes_grupo";
pub const HELLO: &str = "hello";

/// The Evolution API tools, in listing order.
#[must_use]
pub fn evolution_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::upstream(
            ENVIA_MENSAGEM,
            "Envia mensagem de texto via API Evolution",
            RouteTemplate::post("/message/sendText/{instance}"),
            ReplyFormat::new(
                "Mensagem enviada com sucesso para {number}.\nResposta: ",
                BodyStyle::Compact,
                "Erro ao enviar mensagem",
            ),
        )
        .param(ParamSpec::string("number").describe("Número do destinatário com DDI e DDD"))
        .param(
            ParamSpec::string("mensagem")
                .sent_as("text")
                .describe("Texto da mensagem a ser enviada"),
        ),
        ToolDescriptor::upstream(
            CRIA_GRUPO,
            "Cria um grupo via API Evolution",
            RouteTemplate::post("/group/create/{instance}"),
            ReplyFormat::new(
                "Grupo criado com sucesso!\nResposta: ",
                BodyStyle::Compact,
                "Erro ao criar grupo",
            ),
        )
        .param(ParamSpec::string("subject").describe("Nome do grupo"))
        .param(
            ParamSpec::string("description")
                .optional()
                .describe("Descrição do grupo"),
        )
        .param(
            ParamSpec::string_array("participants")
                .describe("Participantes do grupo (números com DDI/DDD)"),
        ),
        ToolDescriptor::upstream(
            BUSCA_GRUPOS,
            "Busca todos os grupos da instância com opção de listar participantes.",
            RouteTemplate::get("/group/fetchAllGroups/{instance}"),
            ReplyFormat::new(
                "Grupos obtidos com sucesso:\n",
                BodyStyle::Pretty,
                "Erro ao obter grupos",
            ),
        )
        .param(
            ParamSpec::boolean("getParticipants")
                .default_value(json!(false))
                .in_query()
                .describe("Listar participantes dos grupos?"),
        ),
        ToolDescriptor::upstream(
            BUSCA_PARTICIPANTES_GRUPO,
            "Busca participantes específicos de um grupo pela instância.",
            RouteTemplate::get("/group/participants/{instance}"),
            ReplyFormat::new(
                "Participantes obtidos com sucesso:\n",
                BodyStyle::Pretty,
                "Erro ao obter participantes",
            ),
        )
        .param(
            ParamSpec::string("groupJid")
                .in_query()
                .describe("Identificador do grupo"),
        ),
    ]
}

/// Tools answered in-process, registered only on request.
#[must_use]
pub fn demo_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::local(HELLO, "Retorna seja bem vindo ao usuario", hello)
            .param(ParamSpec::string("name").describe("Nome do usuário")),
    ]
}

fn hello(args: &ValidatedArgs) -> String {
    format!("Hello {}", args.get_str("name").unwrap_or_default())
}

/// Full catalog for the given settings.
#[must_use]
pub fn catalog(demo: bool) -> Vec<ToolDescriptor> {
    let mut tools = evolution_tools();
    if demo {
        tools.extend(demo_tools());
    }
    tools
}
