use std::sync::{Arc, PoisonError, RwLock};

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info};

use crate::definition::YamlDefinition;
use crate::links::{RefLinkFinder, YamlLinks};
use crate::settings::Settings;
use crate::state::BackendState;
use crate::telemetry::{ClientTelemetry, Telemetry};
use crate::text;

pub struct YamlLanguageServer {
    client: Client,
    state: BackendState,
    telemetry: Arc<dyn Telemetry>,
    definition: RwLock<YamlDefinition>,
    links: YamlLinks,
}

impl YamlLanguageServer {
    pub fn new(client: Client) -> Self {
        let telemetry: Arc<dyn Telemetry> = Arc::new(ClientTelemetry::new(client.clone()));
        Self {
            client,
            state: BackendState::new(),
            definition: RwLock::new(YamlDefinition::new(telemetry.clone())),
            links: YamlLinks::new(Box::new(RefLinkFinder), telemetry.clone()),
            telemetry,
        }
    }

    fn apply_settings(&self, settings: Settings) {
        self.definition
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .configure(&settings);
        self.state.update_settings(settings);
    }

    async fn publish_all(&self) {
        let uris: Vec<Url> = self.state.documents.iter().map(|e| e.key().clone()).collect();
        for uri in uris {
            crate::diagnostics::publish(&self.client, &self.state, &uri).await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for YamlLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(settings) = params
            .initialization_options
            .as_ref()
            .and_then(Settings::from_value)
        {
            self.apply_settings(settings);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: Default::default(),
                }),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("server: initialized");
        self.client
            .log_message(MessageType::INFO, "YAML language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.state.open(doc.uri.clone(), &doc.text, doc.version);
        crate::diagnostics::publish(&self.client, &self.state, &doc.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(mut doc) = self.state.documents.get_mut(&uri) {
            for change in params.content_changes {
                text::apply_change(&mut doc.rope, change);
            }
            doc.version = params.text_document.version;
            doc.invalidate();
        } else {
            debug!(uri = %uri, "server: change for unknown document");
            return;
        }
        crate::diagnostics::publish(&self.client, &self.state, &uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.state.documents.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let Some(settings) = Settings::from_value(&params.settings) else {
            return;
        };
        debug!(settings = ?settings, "server: configuration changed");
        self.apply_settings(settings);
        self.publish_all().await;
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;
        let links = self
            .definition
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_definition(&self.state, uri, pos);
        Ok(links.map(GotoDefinitionResponse::Link))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        if !self.state.settings().link_provider {
            return Ok(None);
        }
        Ok(self
            .links
            .find_links(&self.state, &params.text_document.uri)
            .await)
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        Ok(crate::code_actions::provide(
            &self.state,
            self.telemetry.as_ref(),
            &params,
        ))
    }
}
