use std::sync::Arc;

use tower_lsp::lsp_types::*;
use tracing::debug;

use crate::ast::NodeId;
use crate::documents::{match_offset_to_document, SubDocument};
use crate::error::ServiceResult;
use crate::settings::Settings;
use crate::state::BackendState;
use crate::telemetry::{self, Telemetry};
use crate::text;

/// Maps a node to the node it is defined by, within the same document.
pub(crate) trait DefinitionResolver: Send + Sync {
    fn resolve(&self, node: NodeId, document: &SubDocument) -> Option<NodeId>;
}

/// Follows an alias to its anchored node.
pub(crate) struct AliasResolver;

impl DefinitionResolver for AliasResolver {
    fn resolve(&self, node: NodeId, document: &SubDocument) -> Option<NodeId> {
        if !document.node(node).is_alias() {
            return None;
        }
        document
            .resolve_alias(node)
            .filter(|target| document.node(*target).range.is_valid())
    }
}

/// Go-to-definition over an ordered resolver chain; the first resolver
/// that produces a target wins.
pub(crate) struct YamlDefinition {
    resolvers: Vec<Box<dyn DefinitionResolver>>,
    telemetry: Arc<dyn Telemetry>,
}

impl YamlDefinition {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            resolvers: vec![Box::new(AliasResolver)],
            telemetry,
        }
    }

    /// Append a resolver after the built-in ones.
    pub fn register(&mut self, resolver: Box<dyn DefinitionResolver>) {
        self.resolvers.push(resolver);
    }

    /// Apply client settings. Named resolvers are accepted but nothing
    /// activates them yet, so the chain is left unchanged.
    pub fn configure(&mut self, settings: &Settings) {
        if !settings.definition_resolvers.is_empty() {
            debug!(
                resolvers = ?settings.definition_resolvers,
                active = self.resolvers.len(),
                "definition: configured resolvers are not wired"
            );
        }
    }

    /// Provide go-to-definition links for the given position.
    pub fn get_definition(
        &self,
        state: &BackendState,
        uri: &Url,
        position: Position,
    ) -> Option<Vec<LocationLink>> {
        match self.definition(state, uri, position) {
            Ok(links) => links,
            Err(err) => {
                telemetry::report(self.telemetry.as_ref(), "yaml.definition.error", &err);
                None
            }
        }
    }

    fn definition(
        &self,
        state: &BackendState,
        uri: &Url,
        position: Position,
    ) -> ServiceResult<Option<Vec<LocationLink>>> {
        let snapshot = state.snapshot(uri)?;
        let offset = text::offset_at(&snapshot.rope, position);
        let Some(document) = match_offset_to_document(offset, &snapshot.yaml) else {
            return Ok(None);
        };
        let Some(node) = document.node_at(offset) else {
            return Ok(None);
        };

        for resolver in &self.resolvers {
            let Some(target) = resolver.resolve(node, document) else {
                continue;
            };
            let range = document.node(target).range;
            let target_range = text::range_at(&snapshot.rope, range.start, range.end);
            let selection_range = text::range_at(&snapshot.rope, range.start, range.key_end);
            debug!(uri = %uri, offset, target = range.start, "definition: resolved");
            return Ok(Some(vec![LocationLink {
                origin_selection_range: None,
                target_uri: uri.clone(),
                target_range,
                target_selection_range: selection_range,
            }]));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::telemetry::testing::RecordingTelemetry;

    fn setup(text: &str) -> (BackendState, Url) {
        let state = BackendState::new();
        let uri = Url::parse("file:///tmp/test.yaml").unwrap();
        state.open(uri.clone(), text, 1);
        (state, uri)
    }

    fn position_of(text: &str, needle: &str) -> Position {
        let rope = ropey::Rope::from_str(text);
        text::position_at(&rope, text.find(needle).unwrap())
    }

    #[test]
    fn alias_jumps_to_anchor() {
        let text = "base: &base value # shared\nother: *base\n";
        let (state, uri) = setup(text);
        let sink = Arc::new(RecordingTelemetry::default());
        let definition = YamlDefinition::new(sink.clone());

        let links = definition
            .get_definition(&state, &uri, position_of(text, "*base"))
            .unwrap();
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.target_uri, uri);
        assert_eq!(link.target_range, Range::new(Position::new(0, 12), Position::new(0, 26)));
        assert_eq!(
            link.target_selection_range,
            Range::new(Position::new(0, 12), Position::new(0, 17))
        );
        assert!(sink.events().is_empty());
    }

    #[test]
    fn anchored_collection_target() {
        let text = "defaults: &d\n  retries: 3\n  timeout: 5\njob:\n  <<: *d\n";
        let (state, uri) = setup(text);
        let definition = YamlDefinition::new(Arc::new(RecordingTelemetry::default()));
        let links = definition
            .get_definition(&state, &uri, position_of(text, "*d"))
            .unwrap();
        assert_eq!(links[0].target_range.start, Position::new(1, 2));
        assert_eq!(links[0].target_range.end, Position::new(2, 12));
    }

    #[test]
    fn non_alias_has_no_definition() {
        let text = "a: &x 1\nb: 2\n";
        let (state, uri) = setup(text);
        let sink = Arc::new(RecordingTelemetry::default());
        let definition = YamlDefinition::new(sink.clone());
        assert!(definition
            .get_definition(&state, &uri, position_of(text, "2"))
            .is_none());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn resolves_within_matching_document_only() {
        let text = "a: &x 1\n---\nb: *x\n";
        let (state, uri) = setup(text);
        let definition = YamlDefinition::new(Arc::new(RecordingTelemetry::default()));
        assert!(definition
            .get_definition(&state, &uri, position_of(text, "*x"))
            .is_none());
    }

    #[test]
    fn unavailable_document_reports_telemetry() {
        let state = BackendState::new();
        let uri = Url::parse("file:///tmp/closed.yaml").unwrap();
        let sink = Arc::new(RecordingTelemetry::default());
        let definition = YamlDefinition::new(sink.clone());

        assert!(definition
            .get_definition(&state, &uri, Position::new(0, 0))
            .is_none());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "yaml.definition.error");
        assert!(events[0].1["error"]
            .as_str()
            .unwrap()
            .starts_with("Document unavailable"));
    }

    struct KeyToSelf;

    impl DefinitionResolver for KeyToSelf {
        fn resolve(&self, node: NodeId, document: &SubDocument) -> Option<NodeId> {
            document
                .parent(node)
                .filter(|p| matches!(p.kind, NodeKind::Pair { .. }))
                .map(|_| node)
        }
    }

    #[test]
    fn registered_resolvers_run_after_builtin() {
        let text = "a: 1\nb: &x 2\nc: *x\n";
        let (state, uri) = setup(text);
        let mut definition = YamlDefinition::new(Arc::new(RecordingTelemetry::default()));
        definition.register(Box::new(KeyToSelf));

        let links = definition
            .get_definition(&state, &uri, position_of(text, "1"))
            .unwrap();
        assert_eq!(links[0].target_range.start, Position::new(0, 3));

        // aliases still resolve through the built-in resolver first
        let links = definition
            .get_definition(&state, &uri, position_of(text, "*x"))
            .unwrap();
        assert_eq!(links[0].target_range.start, Position::new(1, 6));
    }

    #[test]
    fn configure_leaves_chain_untouched() {
        let text = "a: 1\n";
        let (state, uri) = setup(text);
        let mut definition = YamlDefinition::new(Arc::new(RecordingTelemetry::default()));
        definition.configure(&Settings {
            definition_resolvers: vec!["schema".to_string()],
            ..Settings::default()
        });
        assert_eq!(definition.resolvers.len(), 1);
        assert!(definition
            .get_definition(&state, &uri, position_of(text, "1"))
            .is_none());
    }
}
