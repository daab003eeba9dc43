//! Lossless syntax tree for YAML source, built on rowan.
//!
//! Every byte of the input belongs to exactly one token, so the text of the
//! root node is the original document.
//!
//! Collections hold `ITEM` nodes. An item is laid out as
//! `start tokens, KEY?, separator tokens, VALUE?`, where `KEY` and `VALUE`
//! wrap a single `SCALAR`, `BLOCK_MAP`, `BLOCK_SEQ`, `FLOW_MAP` or `FLOW_SEQ`.
//! Commas of a flow collection open the following item; its closing bracket
//! and the rest of the line close the collection node.

use rowan::{GreenNode, GreenToken, NodeOrToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub(crate) enum SyntaxKind {
    // trivia
    WHITESPACE = 0,
    NEWLINE,
    COMMENT,

    // properties
    ANCHOR,
    TAG,

    // scalar content
    ALIAS,
    PLAIN,
    SINGLE_QUOTED,
    DOUBLE_QUOTED,
    BLOCK_SCALAR,

    // indicators
    DASH,
    COLON,
    L_BRACE,
    R_BRACE,
    L_BRACKET,
    R_BRACKET,
    COMMA,
    DOC_START,
    DOC_END,
    DIRECTIVE,
    ERROR,

    // nodes
    ROOT,
    DOCUMENT,
    SCALAR,
    BLOCK_MAP,
    BLOCK_SEQ,
    FLOW_MAP,
    FLOW_SEQ,
    ITEM,
    KEY,
    VALUE,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Layout tokens carry no content of their own.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::NEWLINE | Self::COMMENT)
    }

    pub fn is_flow_collection(self) -> bool {
        matches!(self, Self::FLOW_MAP | Self::FLOW_SEQ)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: `SyntaxKind` is `repr(u16)` with contiguous discriminants
        // and the bound is checked above.
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum YamlLanguage {}

impl rowan::Language for YamlLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub(crate) type SyntaxNode = rowan::SyntaxNode<YamlLanguage>;
pub(crate) type SyntaxToken = rowan::SyntaxToken<YamlLanguage>;

/// Byte offset where `node` starts.
pub(crate) fn start_of(node: &SyntaxNode) -> usize {
    node.text_range().start().into()
}

pub(crate) fn token_end(token: &SyntaxToken) -> usize {
    token.text_range().end().into()
}

/// Direct token children of `node`.
pub(crate) fn child_tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> {
    node.children_with_tokens().filter_map(NodeOrToken::into_token)
}

/// Typed view over an `ITEM` node.
#[derive(Debug, Clone)]
pub(crate) struct Item(SyntaxNode);

impl Item {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        (node.kind() == SyntaxKind::ITEM).then_some(Self(node))
    }

    /// The `KEY` wrapper node.
    pub fn key_node(&self) -> Option<SyntaxNode> {
        self.0.children().find(|n| n.kind() == SyntaxKind::KEY)
    }

    /// The `VALUE` wrapper node.
    pub fn value_node(&self) -> Option<SyntaxNode> {
        self.0.children().find(|n| n.kind() == SyntaxKind::VALUE)
    }

    pub fn key(&self) -> Option<SyntaxNode> {
        self.key_node()?.first_child()
    }

    pub fn value(&self) -> Option<SyntaxNode> {
        self.value_node()?.first_child()
    }

    /// Tokens before the key, or before the `:` of an item without a key.
    pub fn start(&self) -> Vec<SyntaxToken> {
        self.layout().0
    }

    /// Tokens between the key and the value.
    pub fn sep(&self) -> Vec<SyntaxToken> {
        self.layout().1
    }

    fn layout(&self) -> (Vec<SyntaxToken>, Vec<SyntaxToken>) {
        let mut start = Vec::new();
        let mut sep = Vec::new();
        let mut in_sep = false;
        for element in self.0.children_with_tokens() {
            match element {
                NodeOrToken::Node(node) if node.kind() == SyntaxKind::KEY => in_sep = true,
                NodeOrToken::Node(_) => break,
                NodeOrToken::Token(token) => {
                    in_sep |= token.kind() == SyntaxKind::COLON;
                    if in_sep {
                        sep.push(token);
                    } else {
                        start.push(token);
                    }
                }
            }
        }
        (start, sep)
    }
}

/// Items of a collection node, in source order.
pub(crate) fn items(collection: &SyntaxNode) -> impl Iterator<Item = Item> {
    collection.children().filter_map(Item::cast)
}

/// End of the closing bracket of a flow collection.
pub(crate) fn close_end(collection: &SyntaxNode) -> Option<usize> {
    child_tokens(collection)
        .find(|t| matches!(t.kind(), SyntaxKind::R_BRACE | SyntaxKind::R_BRACKET))
        .map(|t| token_end(&t))
}

/// End of the last comment among the direct tokens of `node`.
pub(crate) fn trailing_comment_end(node: &SyntaxNode) -> Option<usize> {
    child_tokens(node)
        .filter(|t| t.kind() == SyntaxKind::COMMENT)
        .last()
        .map(|t| token_end(&t))
}

// ---------------------------------------------------------------------------
// Splicing
// ---------------------------------------------------------------------------

/// One item of a block collection: synthesized layout followed by the
/// key, separator and value of an existing item.
#[derive(Debug, Clone)]
pub(crate) struct SplicedItem {
    pub start: Vec<(SyntaxKind, String)>,
    pub key: Option<SyntaxNode>,
    pub sep: Vec<SyntaxToken>,
    pub value: Option<SyntaxNode>,
}

/// A block collection built from the items of an existing collection.
///
/// Key, separator and value subtrees are shared with the source tree; only
/// the layout tokens in front of each item are new.
#[derive(Debug, Clone)]
pub(crate) struct BlockSplice {
    /// Start of the collection being replaced.
    offset: usize,
    green: GreenNode,
}

impl BlockSplice {
    pub fn new(offset: usize, kind: SyntaxKind, items: Vec<SplicedItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| NodeOrToken::Node(spliced_item(item)))
            .collect::<Vec<_>>();
        Self {
            offset,
            green: GreenNode::new(kind.into(), items),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn text(&self) -> String {
        SyntaxNode::new_root(self.green.clone()).to_string()
    }
}

fn spliced_item(item: SplicedItem) -> GreenNode {
    let mut children = Vec::new();
    for (kind, text) in &item.start {
        children.push(NodeOrToken::Token(GreenToken::new((*kind).into(), text)));
    }
    if let Some(key) = &item.key {
        children.push(NodeOrToken::Node(key.green().into_owned()));
    }
    for token in &item.sep {
        children.push(NodeOrToken::Token(token.green().to_owned()));
    }
    if let Some(value) = &item.value {
        children.push(NodeOrToken::Node(value.green().into_owned()));
    }
    GreenNode::new(SyntaxKind::ITEM.into(), children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn root(text: &str) -> SyntaxNode {
        SyntaxNode::new_root(parse(text))
    }

    fn first(node: &SyntaxNode, kind: SyntaxKind) -> SyntaxNode {
        node.descendants().find(|n| n.kind() == kind).unwrap()
    }

    #[test]
    fn item_layout_splits_start_and_separator() {
        let tree = root("list:\n  - &a x\nmap: {b: !t 1, : 2}\n");
        let map = first(&tree, SyntaxKind::BLOCK_MAP);
        let entries: Vec<Item> = items(&map).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key().unwrap().to_string(), "list");

        let seq = first(&tree, SyntaxKind::BLOCK_SEQ);
        let item = items(&seq).next().unwrap();
        let start: Vec<SyntaxKind> = item.start().iter().map(|t| t.kind()).collect();
        assert_eq!(
            start,
            [SyntaxKind::DASH, SyntaxKind::WHITESPACE, SyntaxKind::ANCHOR, SyntaxKind::WHITESPACE]
        );
        assert!(item.sep().is_empty());
        assert!(item.key().is_none());

        let flow = first(&tree, SyntaxKind::FLOW_MAP);
        let flow_items: Vec<Item> = items(&flow).collect();
        assert!(flow_items[0].sep().iter().any(|t| t.kind() == SyntaxKind::TAG));
        assert!(flow_items[1].key().is_none());
        assert_eq!(flow_items[1].sep()[0].kind(), SyntaxKind::COLON);
        assert!(flow_items[1].start().iter().any(|t| t.kind() == SyntaxKind::COMMA));
    }

    #[test]
    fn flow_collection_close_and_comment() {
        let tree = root("k: [1, 2] # two\n");
        let seq = first(&tree, SyntaxKind::FLOW_SEQ);
        assert_eq!(close_end(&seq), Some(9));
        assert_eq!(trailing_comment_end(&seq), Some(15));
    }

    #[test]
    fn splice_shares_payload_with_source_tree() {
        let tree = root("k: [a, {b: c}] # c\n");
        let seq = first(&tree, SyntaxKind::FLOW_SEQ);
        let spliced = items(&seq)
            .map(|item| SplicedItem {
                start: vec![
                    (SyntaxKind::NEWLINE, "\n".to_string()),
                    (SyntaxKind::DASH, "-".to_string()),
                    (SyntaxKind::WHITESPACE, " ".to_string()),
                ],
                key: item.key_node(),
                sep: item.sep(),
                value: item.value_node(),
            })
            .collect();
        let splice = BlockSplice::new(start_of(&seq), SyntaxKind::BLOCK_SEQ, spliced);
        assert_eq!(splice.offset(), 3);
        assert_eq!(splice.text(), "\n- a\n- {b: c}");

        let block = SyntaxNode::new_root(splice.green.clone());
        assert_eq!(block.kind(), SyntaxKind::BLOCK_SEQ);
        let nested = first(&block, SyntaxKind::FLOW_MAP);
        let original = first(&seq, SyntaxKind::FLOW_MAP);
        assert_eq!(nested.green(), original.green());
    }
}
