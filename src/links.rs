/// DocumentLink provider: gathers links from every document in a YAML stream.
use std::sync::Arc;

use futures::future::try_join_all;
use tower_lsp::lsp_types::*;
use tracing::debug;

use crate::ast::{NodeId, NodeKind};
use crate::documents::SubDocument;
use crate::error::ServiceResult;
use crate::state::{BackendState, Snapshot};
use crate::telemetry::{self, Telemetry};
use crate::text;

/// Finds the links of a single document.
#[tower_lsp::async_trait]
pub(crate) trait LinkFinder: Send + Sync {
    async fn find_links(
        &self,
        snapshot: &Snapshot,
        document: &SubDocument,
    ) -> ServiceResult<Vec<DocumentLink>>;
}

/// Links each local `$ref: '#/json/pointer'` to the node it points at.
pub(crate) struct RefLinkFinder;

#[tower_lsp::async_trait]
impl LinkFinder for RefLinkFinder {
    async fn find_links(
        &self,
        snapshot: &Snapshot,
        document: &SubDocument,
    ) -> ServiceResult<Vec<DocumentLink>> {
        let text = snapshot.text();
        let mut links = Vec::new();
        for (_, node) in document.tree().iter() {
            let NodeKind::Pair {
                key: Some(key),
                value: Some(value),
            } = node.kind
            else {
                continue;
            };
            if document.node(key).scalar_value() != Some("$ref") {
                continue;
            }
            let Some(pointer) = document.node(value).scalar_value() else {
                continue;
            };
            let Some(fragment) = pointer.strip_prefix('#') else {
                continue;
            };
            let Some(target) = resolve_pointer(document, fragment) else {
                debug!(pointer, "links: unresolved reference");
                continue;
            };

            let target_pos = text::position_at(&snapshot.rope, document.node(target).range.start);
            let mut target_uri = snapshot.uri.clone();
            target_uri.set_fragment(Some(&format!(
                "{},{}",
                target_pos.line + 1,
                target_pos.character + 1
            )));

            let range = document.node(value).range;
            let (start, end) = unquoted(&text, range.start, range.key_end);
            links.push(DocumentLink {
                range: text::range_at(&snapshot.rope, start, end),
                target: Some(target_uri),
                tooltip: Some(pointer.to_string()),
                data: None,
            });
        }
        Ok(links)
    }
}

/// Follow a JSON pointer (without its leading `#`) from the document root.
fn resolve_pointer(document: &SubDocument, pointer: &str) -> Option<NodeId> {
    let mut current = document.tree().root()?;
    if pointer.is_empty() {
        return Some(current);
    }
    let path = pointer.strip_prefix('/')?;
    for segment in path.split('/') {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        current = match &document.node(current).kind {
            NodeKind::Mapping { pairs, .. } => {
                let pair = pairs.iter().copied().find(|pair| {
                    matches!(document.node(*pair).kind, NodeKind::Pair { key: Some(k), .. }
                        if document.node(k).scalar_value() == Some(segment.as_str()))
                })?;
                match document.node(pair).kind {
                    NodeKind::Pair { value: Some(v), .. } => v,
                    _ => pair,
                }
            }
            NodeKind::Sequence { items, .. } => *items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Byte range of a scalar without its surrounding quotes.
fn unquoted(text: &str, start: usize, end: usize) -> (usize, usize) {
    match text.get(start..end) {
        Some(s) if s.len() >= 2 && (s.starts_with('\'') || s.starts_with('"')) => (start + 1, end - 1),
        _ => (start, end),
    }
}

/// Runs a link finder over every document of a stream and merges the
/// results in document order.
pub(crate) struct YamlLinks {
    finder: Box<dyn LinkFinder>,
    telemetry: Arc<dyn Telemetry>,
}

impl YamlLinks {
    pub fn new(finder: Box<dyn LinkFinder>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self { finder, telemetry }
    }

    /// Build the `textDocument/documentLink` response for a document.
    pub async fn find_links(&self, state: &BackendState, uri: &Url) -> Option<Vec<DocumentLink>> {
        match self.links(state, uri).await {
            Ok(links) => Some(links),
            Err(err) => {
                telemetry::report(self.telemetry.as_ref(), "yaml.documentLink.error", &err);
                None
            }
        }
    }

    async fn links(&self, state: &BackendState, uri: &Url) -> ServiceResult<Vec<DocumentLink>> {
        let snapshot = state.snapshot(uri)?;
        let per_document = try_join_all(
            snapshot
                .yaml
                .documents
                .iter()
                .map(|document| self.finder.find_links(&snapshot, document)),
        )
        .await?;
        let links: Vec<DocumentLink> = per_document.into_iter().flatten().collect();
        debug!(uri = %uri, count = links.len(), "links: collected");
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::telemetry::testing::RecordingTelemetry;

    fn setup(text: &str) -> (BackendState, Url) {
        let state = BackendState::new();
        let uri = Url::parse("file:///tmp/links.yaml").unwrap();
        state.open(uri.clone(), text, 1);
        (state, uri)
    }

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[tokio::test]
    async fn links_from_every_document_in_order() {
        let text = "a:\n  b: 1\nref:\n  $ref: '#/a/b'\n---\nx: [1, 2]\ny:\n  $ref: \"#/x/1\"\n";
        let (state, uri) = setup(text);
        let sink = Arc::new(RecordingTelemetry::default());
        let links = YamlLinks::new(Box::new(RefLinkFinder), sink.clone())
            .find_links(&state, &uri)
            .await
            .unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].range, range(3, 9, 3, 14));
        assert_eq!(links[0].target.as_ref().unwrap().fragment(), Some("2,6"));
        assert_eq!(links[1].range, range(7, 9, 7, 14));
        assert_eq!(links[1].target.as_ref().unwrap().fragment(), Some("6,8"));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn pointer_segments_are_unescaped() {
        let text = "paths:\n  /pets~x: 1\nr:\n  $ref: '#/paths/~1pets~0x'\n";
        let (state, uri) = setup(text);
        let links = YamlLinks::new(
            Box::new(RefLinkFinder),
            Arc::new(RecordingTelemetry::default()),
        )
        .find_links(&state, &uri)
        .await
        .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target.as_ref().unwrap().fragment(), Some("2,12"));
    }

    #[tokio::test]
    async fn escaped_keys_and_pointers_are_decoded() {
        let text = "a:\n  /b: 1\nr:\n  \"\\u0024ref\": \"#\\x2Fa\\x2F~1b\"\n";
        let (state, uri) = setup(text);
        let links = YamlLinks::new(
            Box::new(RefLinkFinder),
            Arc::new(RecordingTelemetry::default()),
        )
        .find_links(&state, &uri)
        .await
        .unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].range, range(3, 16, 3, 29));
        assert_eq!(links[0].target.as_ref().unwrap().fragment(), Some("2,7"));
        assert_eq!(links[0].tooltip.as_deref(), Some("#/a/~1b"));
    }

    #[tokio::test]
    async fn unresolved_and_external_refs_are_skipped() {
        let text = "a: 1\nb:\n  $ref: '#/missing'\nc:\n  $ref: other.yaml\n";
        let (state, uri) = setup(text);
        let links = YamlLinks::new(
            Box::new(RefLinkFinder),
            Arc::new(RecordingTelemetry::default()),
        )
        .find_links(&state, &uri)
        .await
        .unwrap();
        assert!(links.is_empty());
    }

    struct FailingFinder;

    #[tower_lsp::async_trait]
    impl LinkFinder for FailingFinder {
        async fn find_links(
            &self,
            _snapshot: &Snapshot,
            _document: &SubDocument,
        ) -> ServiceResult<Vec<DocumentLink>> {
            Err(ServiceError::LinkFinder {
                message: "schema fetch failed".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn finder_failure_reports_telemetry() {
        let (state, uri) = setup("a: 1\n---\nb: 2\n");
        let sink = Arc::new(RecordingTelemetry::default());
        let links = YamlLinks::new(Box::new(FailingFinder), sink.clone())
            .find_links(&state, &uri)
            .await;
        assert!(links.is_none());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "yaml.documentLink.error");
        assert_eq!(events[0].1["error"], "link finder failed: schema fetch failed");
    }

    #[tokio::test]
    async fn unavailable_document_reports_telemetry() {
        let state = BackendState::new();
        let uri = Url::parse("file:///tmp/closed.yaml").unwrap();
        let sink = Arc::new(RecordingTelemetry::default());
        let links = YamlLinks::new(Box::new(RefLinkFinder), sink.clone())
            .find_links(&state, &uri)
            .await;
        assert!(links.is_none());
        assert_eq!(sink.events()[0].0, "yaml.documentLink.error");
    }
}
