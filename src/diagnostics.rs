use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tracing::{debug, warn};

use crate::ast::NodeKind;
use crate::settings::{FlowStyle, Settings};
use crate::state::{BackendState, Snapshot};
use crate::text;

pub(crate) const SOURCE: &str = "yaml";
pub(crate) const FLOW_MAP_CODE: &str = "flowMap";
pub(crate) const FLOW_SEQ_CODE: &str = "flowSeq";

/// Validate the document and publish diagnostics.
pub async fn publish(client: &Client, state: &BackendState, uri: &Url) {
    let snapshot = match state.snapshot(uri) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(uri = %uri, error = %err, "diagnostics: no document");
            return;
        }
    };
    let version = state.documents.get(uri).map(|doc| doc.version);
    let diagnostics = compute(&snapshot, &state.settings());
    debug!(uri = %uri, count = diagnostics.len(), "diagnostics: publishing");
    client
        .publish_diagnostics(uri.clone(), diagnostics, version)
        .await;
}

/// Compute style diagnostics for every document in the stream.
pub(crate) fn compute(snapshot: &Snapshot, settings: &Settings) -> Vec<Diagnostic> {
    let forbid_map = settings.style.flow_mapping == FlowStyle::Forbid;
    let forbid_seq = settings.style.flow_sequence == FlowStyle::Forbid;
    if !forbid_map && !forbid_seq {
        return Vec::new();
    }

    let mut diagnostics = Vec::new();
    for document in &snapshot.yaml.documents {
        for (_, node) in document.tree().iter() {
            let (code, message) = match node.kind {
                NodeKind::Mapping { flow: true, .. } if forbid_map => {
                    (FLOW_MAP_CODE, "Flow style mapping is forbidden")
                }
                NodeKind::Sequence { flow: true, .. } if forbid_seq => {
                    (FLOW_SEQ_CODE, "Flow style sequence is forbidden")
                }
                _ => continue,
            };
            diagnostics.push(Diagnostic {
                range: text::range_at(&snapshot.rope, node.range.start, node.range.key_end),
                severity: Some(DiagnosticSeverity::WARNING),
                code: Some(NumberOrString::String(code.to_string())),
                source: Some(SOURCE.to_string()),
                message: message.to_string(),
                ..Default::default()
            });
        }
    }
    diagnostics
}
