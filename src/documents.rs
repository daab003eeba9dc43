/// Parsed form of a text snapshot: one entry per YAML document in the stream.
use rowan::GreenNode;

use crate::ast::{Node, NodeId, NodeTree};
use crate::cst::{self, SyntaxNode};
use crate::parser;

pub(crate) struct SubDocument {
    /// Byte range of the document within the full text.
    pub start: usize,
    pub end: usize,
    /// Green tree of the whole stream; syntax nodes are created on demand.
    root: GreenNode,
    index: usize,
    tree: NodeTree,
}

impl SubDocument {
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.tree.get(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<&Node> {
        self.node(id).parent.map(|p| self.tree.get(p))
    }

    /// Smallest node enclosing `offset`.
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        self.tree.node_at(offset)
    }

    pub fn resolve_alias(&self, alias: NodeId) -> Option<NodeId> {
        self.tree.resolve_alias(alias)
    }

    /// The `DOCUMENT` syntax node.
    pub fn syntax(&self) -> Option<SyntaxNode> {
        SyntaxNode::new_root(self.root.clone()).children().nth(self.index)
    }

    /// The syntax node backing a node. Pairs have none.
    pub fn syntax_of(&self, id: NodeId) -> Option<SyntaxNode> {
        let node = self.node(id);
        self.syntax()?.descendants().find(|n| node.is_backed_by(n))
    }
}

pub(crate) struct ParsedYaml {
    pub documents: Vec<SubDocument>,
}

impl ParsedYaml {
    pub fn parse(text: &str) -> Self {
        let root = parser::parse(text);
        let syntax = SyntaxNode::new_root(root.clone());
        let starts: Vec<usize> = syntax.children().map(|d| cst::start_of(&d)).collect();
        let documents = syntax
            .children()
            .enumerate()
            .map(|(index, document)| SubDocument {
                start: starts[index],
                end: starts.get(index + 1).copied().unwrap_or(text.len()),
                root: root.clone(),
                index,
                tree: NodeTree::build(&document),
            })
            .collect();
        Self { documents }
    }
}

/// The document whose range holds `offset`; a single-document stream
/// always matches.
pub(crate) fn match_offset_to_document(offset: usize, parsed: &ParsedYaml) -> Option<&SubDocument> {
    parsed
        .documents
        .iter()
        .find(|doc| doc.start <= offset && offset <= doc.end)
        .or_else(|| match parsed.documents.as_slice() {
            [only] => Some(only),
            _ => None,
        })
}
