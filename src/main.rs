use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

mod ast;
mod code_actions;
mod cst;
mod definition;
mod diagnostics;
mod documents;
mod error;
mod flow_style;
mod links;
mod parser;
mod scalar;
mod server;
mod settings;
mod state;
mod telemetry;
mod text;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(server::YamlLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
