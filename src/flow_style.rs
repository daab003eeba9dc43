/// Rewrites a flow mapping or sequence as block-style text.
use crate::ast::{NodeId, NodeKind};
use crate::cst::{self, BlockSplice, Item, SplicedItem, SyntaxKind};
use crate::documents::SubDocument;

pub(crate) struct FlowStyleRewriter {
    /// Indentation written before every item of the block form.
    indentation: String,
}

impl FlowStyleRewriter {
    pub fn new(indentation: impl Into<String>) -> Self {
        Self {
            indentation: indentation.into(),
        }
    }

    /// Block form of the flow collection behind `node`.
    ///
    /// Only the collection's own items change layout; keys, values and any
    /// nested flow collections are written exactly as they appear.
    /// Returns `None` when `node` is not a non-empty flow collection.
    pub fn write(&self, document: &SubDocument, node: NodeId) -> Option<BlockSplice> {
        let collection = document
            .syntax_of(node)
            .filter(|syntax| syntax.kind().is_flow_collection())?;
        let is_pair_value = document.parent(node).is_some_and(|parent| {
            matches!(parent.kind, NodeKind::Pair { value: Some(v), .. } if v == node)
        });
        let is_map = collection.kind() == SyntaxKind::FLOW_MAP;

        let items: Vec<SplicedItem> = cst::items(&collection)
            .enumerate()
            .map(|(index, item)| {
                if is_map {
                    self.map_item(&item, index, is_pair_value)
                } else {
                    self.seq_item(&item)
                }
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        let kind = if is_map {
            SyntaxKind::BLOCK_MAP
        } else {
            SyntaxKind::BLOCK_SEQ
        };
        Some(BlockSplice::new(cst::start_of(&collection), kind, items))
    }

    fn map_item(&self, item: &Item, index: usize, is_pair_value: bool) -> SplicedItem {
        let mut start = Vec::new();
        if is_pair_value || index > 0 {
            start.push((SyntaxKind::NEWLINE, "\n".to_string()));
        }
        start.extend(self.indent());
        start.extend(props(item));
        spliced(item, start)
    }

    fn seq_item(&self, item: &Item) -> SplicedItem {
        let mut start = vec![(SyntaxKind::NEWLINE, "\n".to_string())];
        start.extend(self.indent());
        start.push((SyntaxKind::DASH, "-".to_string()));
        start.push((SyntaxKind::WHITESPACE, " ".to_string()));
        start.extend(props(item));
        spliced(item, start)
    }

    fn indent(&self) -> Option<(SyntaxKind, String)> {
        (!self.indentation.is_empty())
            .then(|| (SyntaxKind::WHITESPACE, self.indentation.clone()))
    }
}

fn spliced(item: &Item, start: Vec<(SyntaxKind, String)>) -> SplicedItem {
    SplicedItem {
        start,
        key: item.key_node(),
        sep: item.sep(),
        value: item.value_node(),
    }
}

/// Anchors and tags of an item, each followed by a single space.
fn props(item: &Item) -> Vec<(SyntaxKind, String)> {
    item.start()
        .iter()
        .filter(|t| matches!(t.kind(), SyntaxKind::ANCHOR | SyntaxKind::TAG))
        .flat_map(|t| {
            [
                (t.kind(), t.text().to_string()),
                (SyntaxKind::WHITESPACE, " ".to_string()),
            ]
        })
        .collect()
}
