/// Abstract node tree derived from a parsed document's syntax tree.
use crate::cst::{self, Item, SyntaxKind, SyntaxNode, SyntaxToken};
use crate::scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub usize);

/// Byte range of a node.
///
/// For pairs `key_end` is the end of the key. For every other node it is
/// the end of the node's own content, while `end` also covers a trailing
/// comment on the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeRange {
    pub start: usize,
    pub key_end: usize,
    pub end: usize,
}

impl NodeRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.key_end && self.key_end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Scalar { value: String },
    Alias { name: String },
    Mapping { flow: bool, pairs: Vec<NodeId> },
    Sequence { flow: bool, items: Vec<NodeId> },
    Pair { key: Option<NodeId>, value: Option<NodeId> },
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub range: NodeRange,
    pub parent: Option<NodeId>,
    pub anchor: Option<String>,
    pub tag: Option<String>,
    /// Offset of the backing syntax node; pairs use the start of their key.
    pub syntax_offset: usize,
}

impl Node {
    pub fn is_alias(&self) -> bool {
        matches!(self.kind, NodeKind::Alias { .. })
    }

    pub fn scalar_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar { value } => Some(value),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Mapping { pairs, .. } => pairs.clone(),
            NodeKind::Sequence { items, .. } => items.clone(),
            NodeKind::Pair { key, value } => key.iter().chain(value.iter()).copied().collect(),
            NodeKind::Scalar { .. } | NodeKind::Alias { .. } => Vec::new(),
        }
    }

    /// Whether `syntax` is the concrete counterpart of this node.
    pub fn is_backed_by(&self, syntax: &SyntaxNode) -> bool {
        if cst::start_of(syntax) != self.syntax_offset {
            return false;
        }
        matches!(
            (&self.kind, syntax.kind()),
            (NodeKind::Scalar { .. } | NodeKind::Alias { .. }, SyntaxKind::SCALAR)
                | (NodeKind::Mapping { flow: false, .. }, SyntaxKind::BLOCK_MAP)
                | (NodeKind::Sequence { flow: false, .. }, SyntaxKind::BLOCK_SEQ)
                | (NodeKind::Mapping { flow: true, .. }, SyntaxKind::FLOW_MAP)
                | (NodeKind::Sequence { flow: true, .. }, SyntaxKind::FLOW_SEQ)
        )
    }
}

/// Nodes of one document, stored in source order.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    /// Anchor names with the node they mark, in source order.
    anchors: Vec<(String, NodeId)>,
}

impl NodeTree {
    /// Build the tree for a `DOCUMENT` node.
    pub fn build(document: &SyntaxNode) -> Self {
        let mut tree = Self::default();
        let value = document
            .children()
            .find(|n| n.kind() == SyntaxKind::VALUE)
            .and_then(|v| v.first_child());
        if let Some(value) = value {
            let props = Props::from_tokens(cst::child_tokens(document));
            tree.root = Some(tree.node(&value, None, props));
        }
        tree
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Smallest node whose range contains `offset`.
    pub fn node_at(&self, offset: usize) -> Option<NodeId> {
        let mut current = self.root.filter(|id| self.get(*id).range.contains(offset))?;
        loop {
            let next = self
                .get(current)
                .children()
                .into_iter()
                .find(|child| self.get(*child).range.contains(offset));
            match next {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    /// The node anchored by the name an alias refers to: the closest anchor
    /// of that name defined before the alias.
    pub fn resolve_alias(&self, alias: NodeId) -> Option<NodeId> {
        let node = self.get(alias);
        let NodeKind::Alias { name } = &node.kind else {
            return None;
        };
        self.anchors
            .iter()
            .rev()
            .find(|(anchor, id)| anchor == name && self.get(*id).range.start < node.range.start)
            .map(|(_, id)| *id)
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>, syntax_offset: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            range: NodeRange {
                start: syntax_offset,
                key_end: syntax_offset,
                end: syntax_offset,
            },
            parent,
            anchor: None,
            tag: None,
            syntax_offset,
        });
        id
    }

    fn node(&mut self, syntax: &SyntaxNode, parent: Option<NodeId>, props: Props) -> NodeId {
        let start = cst::start_of(syntax);
        let id = match syntax.kind() {
            SyntaxKind::FLOW_MAP | SyntaxKind::FLOW_SEQ => {
                let is_map = syntax.kind() == SyntaxKind::FLOW_MAP;
                let id = self.push(collection_kind(is_map, true), parent, start);
                self.register_anchor(id, &props);
                let children = self.items(id, syntax, is_map);
                let last_end = children.last().map_or(start + 1, |c| self.get(*c).range.end);
                let key_end = cst::close_end(syntax).unwrap_or(last_end);
                let end = cst::trailing_comment_end(syntax).map_or(key_end, |e| e.max(key_end));
                self.finish(id, children, start, key_end, end);
                return self.with_props(id, props);
            }
            SyntaxKind::BLOCK_MAP | SyntaxKind::BLOCK_SEQ => {
                let is_map = syntax.kind() == SyntaxKind::BLOCK_MAP;
                let id = self.push(collection_kind(is_map, false), parent, start);
                self.register_anchor(id, &props);
                let children = self.items(id, syntax, is_map);
                let end = children
                    .iter()
                    .map(|c| self.get(*c).range.end)
                    .max()
                    .unwrap_or(start);
                self.finish(id, children, start, end, end);
                return self.with_props(id, props);
            }
            _ => {
                let (kind, text) = syntax
                    .first_token()
                    .map(|t| (t.kind(), t.text().to_string()))
                    .unwrap_or((SyntaxKind::PLAIN, String::new()));
                let value = scalar::decode(kind, &text);
                let kind = if kind == SyntaxKind::ALIAS {
                    NodeKind::Alias { name: value }
                } else {
                    NodeKind::Scalar { value }
                };
                let id = self.push(kind, parent, start);
                self.nodes[id.0].range = scalar_range(syntax);
                id
            }
        };
        self.register_anchor(id, &props);
        self.with_props(id, props)
    }

    fn register_anchor(&mut self, id: NodeId, props: &Props) {
        if let Some(anchor) = &props.anchor {
            self.anchors.push((anchor.clone(), id));
        }
    }

    fn with_props(&mut self, id: NodeId, props: Props) -> NodeId {
        let node = &mut self.nodes[id.0];
        node.anchor = props.anchor;
        node.tag = props.tag;
        id
    }

    fn finish(&mut self, id: NodeId, children: Vec<NodeId>, start: usize, key_end: usize, end: usize) {
        let node = &mut self.nodes[id.0];
        node.range = NodeRange { start, key_end, end };
        match &mut node.kind {
            NodeKind::Mapping { pairs, .. } => *pairs = children,
            NodeKind::Sequence { items, .. } => *items = children,
            _ => {}
        }
    }

    fn items(&mut self, parent: NodeId, collection: &SyntaxNode, is_map: bool) -> Vec<NodeId> {
        let mut children = Vec::new();
        for item in cst::items(collection) {
            let sep = item.sep();
            let has_sep = sep.iter().any(|t| t.kind() == SyntaxKind::COLON);
            if is_map || item.key().is_some() || has_sep {
                if let Some(pair) = self.pair(parent, &item, &sep) {
                    children.push(pair);
                }
            } else if let Some(value) = item.value() {
                let props = Props::from_tokens(item.start());
                children.push(self.node(&value, Some(parent), props));
            }
        }
        children
    }

    fn pair(&mut self, parent: NodeId, item: &Item, sep: &[SyntaxToken]) -> Option<NodeId> {
        let key_syntax = item.key();
        let sep_start = sep
            .iter()
            .find(|t| !t.kind().is_trivia())
            .map(|t| usize::from(t.text_range().start()));
        let start = key_syntax.as_ref().map(cst::start_of).or(sep_start)?;
        let id = self.push(NodeKind::Pair { key: None, value: None }, Some(parent), start);

        let key = key_syntax.map(|k| self.node(&k, Some(id), Props::from_tokens(item.start())));
        let value = item
            .value()
            .map(|v| self.node(&v, Some(id), Props::from_tokens(sep.iter().cloned())));

        let key_end = key.map_or(start, |k| self.get(k).range.key_end);
        let sep_end = sep
            .iter()
            .filter(|t| !t.kind().is_trivia())
            .map(cst::token_end)
            .max();
        let end = value
            .map(|v| self.get(v).range.end)
            .or(sep_end)
            .unwrap_or(key_end)
            .max(key.map_or(key_end, |k| self.get(k).range.end));

        let node = &mut self.nodes[id.0];
        node.kind = NodeKind::Pair { key, value };
        node.range = NodeRange { start, key_end, end };
        Some(id)
    }
}

fn collection_kind(is_map: bool, flow: bool) -> NodeKind {
    if is_map {
        NodeKind::Mapping { flow, pairs: Vec::new() }
    } else {
        NodeKind::Sequence { flow, items: Vec::new() }
    }
}

/// Anchor and tag written before a node.
#[derive(Debug, Default)]
struct Props {
    anchor: Option<String>,
    tag: Option<String>,
}

impl Props {
    fn from_tokens(tokens: impl IntoIterator<Item = SyntaxToken>) -> Self {
        let mut props = Props::default();
        for token in tokens {
            match token.kind() {
                SyntaxKind::ANCHOR => props.anchor = token.text().get(1..).map(str::to_string),
                SyntaxKind::TAG => props.tag = Some(token.text().to_string()),
                _ => {}
            }
        }
        props
    }
}

/// Content ends at the last non-blank byte of the content token; a comment
/// later on the same line extends the full range.
fn scalar_range(syntax: &SyntaxNode) -> NodeRange {
    let start = cst::start_of(syntax);
    let content = syntax
        .first_token()
        .map(|t| t.text().trim_end_matches([' ', '\t', '\r', '\n']).len())
        .unwrap_or(0);
    let key_end = start + content;
    NodeRange {
        start,
        key_end,
        end: cst::trailing_comment_end(syntax).unwrap_or(key_end),
    }
}
