use tower_lsp::lsp_types::*;
use tracing::debug;

use crate::ast::{NodeId, NodeKind};
use crate::diagnostics::{FLOW_MAP_CODE, FLOW_SEQ_CODE, SOURCE};
use crate::documents::{match_offset_to_document, SubDocument};
use crate::error::ServiceResult;
use crate::flow_style::FlowStyleRewriter;
use crate::state::{BackendState, Snapshot};
use crate::telemetry::{self, Telemetry};
use crate::text;

/// Quick fixes for flow style diagnostics.
pub(crate) fn provide(
    state: &BackendState,
    telemetry: &dyn Telemetry,
    params: &CodeActionParams,
) -> Option<CodeActionResponse> {
    match actions(state, params) {
        Ok(actions) if actions.is_empty() => None,
        Ok(actions) => Some(actions),
        Err(err) => {
            telemetry::report(telemetry, "yaml.codeAction.error", &err);
            None
        }
    }
}

fn actions(state: &BackendState, params: &CodeActionParams) -> ServiceResult<CodeActionResponse> {
    let uri = &params.text_document.uri;
    let snapshot = state.snapshot(uri)?;
    let indentation = state.settings().indentation;

    let mut actions = Vec::new();
    for diagnostic in &params.context.diagnostics {
        if diagnostic.source.as_deref() != Some(SOURCE) {
            continue;
        }
        let title = match &diagnostic.code {
            Some(NumberOrString::String(code)) if code == FLOW_MAP_CODE => {
                "Convert to block style map"
            }
            Some(NumberOrString::String(code)) if code == FLOW_SEQ_CODE => {
                "Convert to block style sequence"
            }
            _ => continue,
        };
        let Some(edit) = convert_to_block(&snapshot, diagnostic.range.start, &indentation) else {
            debug!(uri = %uri, range = ?diagnostic.range, "code_actions: no block form");
            continue;
        };
        actions.push(CodeActionOrCommand::CodeAction(CodeAction {
            title: title.to_string(),
            kind: Some(CodeActionKind::QUICKFIX),
            diagnostics: Some(vec![diagnostic.clone()]),
            edit: Some(workspace_edit_for(uri.clone(), edit)),
            is_preferred: Some(true),
            ..Default::default()
        }));
    }
    Ok(actions)
}

fn workspace_edit_for(uri: Url, edit: TextEdit) -> WorkspaceEdit {
    WorkspaceEdit {
        changes: Some(std::collections::HashMap::from([(uri, vec![edit])])),
        ..Default::default()
    }
}

/// Replace the flow collection starting at `position` with its block form.
fn convert_to_block(snapshot: &Snapshot, position: Position, indentation: &str) -> Option<TextEdit> {
    let text = snapshot.text();
    let offset = text::offset_at(&snapshot.rope, position);
    let document = match_offset_to_document(offset, &snapshot.yaml)?;
    let (node, _) = document.tree().iter().find(|(_, n)| {
        n.range.start == offset
            && matches!(
                n.kind,
                NodeKind::Mapping { flow: true, .. } | NodeKind::Sequence { flow: true, .. }
            )
    })?;

    let owner = convertible_owner(document, node)?;
    // one level below the owner's column, not its line's indentation
    let indent = format!(
        "{}{}",
        text::column_indentation(&text, document.node(owner).range.start),
        indentation
    );
    let splice = FlowStyleRewriter::new(indent).write(document, node)?;
    let new_text = splice.text();

    let mut start = splice.offset();
    if new_text.starts_with('\n') {
        // no trailing whitespace before the first new line
        start -= text[..start].len() - text[..start].trim_end_matches([' ', '\t']).len();
    }
    let end = document.node(node).range.key_end;
    Some(TextEdit {
        range: text::range_at(&snapshot.rope, start, end),
        new_text,
    })
}

/// The node whose column sets the indentation of the block form: the owning
/// pair for a mapping value, otherwise the node itself. `None` where a block
/// collection cannot be written in place.
fn convertible_owner(document: &SubDocument, node: NodeId) -> Option<NodeId> {
    let mut owner = node;
    if let Some(parent_id) = document.node(node).parent {
        if let NodeKind::Pair { value, .. } = document.node(parent_id).kind {
            if value != Some(node) {
                return None;
            }
            owner = parent_id;
        }
    }
    let container = document.node(owner).parent.map(|id| &document.node(id).kind);
    match container {
        Some(NodeKind::Mapping { flow: true, .. } | NodeKind::Sequence { flow: true, .. }) => None,
        Some(NodeKind::Sequence { flow: false, .. })
            if owner == node
                && matches!(document.node(node).kind, NodeKind::Mapping { .. }) =>
        {
            None
        }
        _ => Some(owner),
    }
}
