use thiserror::Error;
use tower_lsp::lsp_types::Url;

/// Failures inside a request handler. None of them reach the client: each
/// entry point reports them to telemetry and answers with no result.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Document unavailable: {0}")]
    DocumentUnavailable(Url),

    #[error("link finder failed: {message}")]
    LinkFinder { message: String },
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
