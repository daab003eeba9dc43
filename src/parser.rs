/// Lossless YAML parser building the rowan tree described in `cst`.
///
/// The parser never fails: text it cannot place structurally becomes
/// `ERROR` tokens, so the root node always prints back to the input.
use rowan::{GreenNode, GreenNodeBuilder};

use crate::cst::SyntaxKind::{self, *};

/// Parse every document of `text` into a single `ROOT` node.
pub(crate) fn parse(text: &str) -> GreenNode {
    let mut parser = Parser::new(text);
    parser.builder.start_node(ROOT.into());
    while !parser.at_eof() {
        parser.document();
    }
    parser.builder.finish_node();
    parser.builder.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Document,
    MapValue,
    SeqItem,
}

/// A token that has been scanned but not yet committed to the tree.
#[derive(Debug, Clone, Copy)]
struct Lexeme<'a> {
    kind: SyntaxKind,
    text: &'a str,
}

fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

fn is_flow_indicator(b: u8) -> bool {
    matches!(b, b',' | b'[' | b']' | b'{' | b'}')
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    builder: GreenNodeBuilder<'static>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            builder: GreenNodeBuilder::new(),
        }
    }

    // -- position helpers ---------------------------------------------------

    fn at_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn byte_at(&self, p: usize) -> Option<u8> {
        self.bytes.get(p).copied()
    }

    fn ws_or_end(&self, p: usize) -> bool {
        match self.byte_at(p) {
            None => true,
            Some(b) => is_ws(b) || is_break(b),
        }
    }

    fn line_start(&self, p: usize) -> usize {
        self.src[..p].rfind('\n').map_or(0, |i| i + 1)
    }

    fn column(&self, p: usize) -> usize {
        p - self.line_start(p)
    }

    fn line_content_end(&self, p: usize) -> usize {
        let mut q = p;
        while let Some(b) = self.byte_at(q) {
            if is_break(b) {
                break;
            }
            q += 1;
        }
        q
    }

    fn skip_ws(&self, mut p: usize) -> usize {
        while self.byte_at(p).is_some_and(is_ws) {
            p += 1;
        }
        p
    }

    fn after_break(&self, p: usize) -> usize {
        match self.byte_at(p) {
            Some(b'\r') if self.byte_at(p + 1) == Some(b'\n') => p + 2,
            Some(b) if is_break(b) => p + 1,
            _ => p,
        }
    }

    fn doc_marker_at(&self, p: usize, marker: &[u8; 3]) -> bool {
        self.column(p) == 0 && self.bytes[p..].starts_with(marker) && self.ws_or_end(p + 3)
    }

    fn at_doc_boundary(&self, p: usize) -> bool {
        self.doc_marker_at(p, b"---") || self.doc_marker_at(p, b"...")
    }

    fn seq_ind_at(&self, p: usize) -> bool {
        self.byte_at(p) == Some(b'-') && self.ws_or_end(p + 1)
    }

    fn at_line_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(b) => is_break(b) || b == b'#',
        }
    }

    // -- lexemes ------------------------------------------------------------

    fn lexeme(&mut self, kind: SyntaxKind, end: usize) -> Lexeme<'a> {
        let src = self.src;
        let end = end.min(self.bytes.len());
        let text = &src[self.pos..end];
        self.pos = end;
        Lexeme { kind, text }
    }

    /// Scan a token and commit it right away.
    fn token(&mut self, kind: SyntaxKind, end: usize) {
        let lexeme = self.lexeme(kind, end);
        self.builder.token(lexeme.kind.into(), lexeme.text);
    }

    /// Commit pending lexemes in order.
    fn flush(&mut self, pending: &mut Vec<Lexeme<'a>>) {
        for lexeme in pending.drain(..) {
            self.builder.token(lexeme.kind.into(), lexeme.text);
        }
    }

    fn space(&mut self) -> Option<Lexeme<'a>> {
        let end = self.skip_ws(self.pos);
        (end > self.pos).then(|| self.lexeme(WHITESPACE, end))
    }

    fn newline(&mut self) -> Option<Lexeme<'a>> {
        let end = self.after_break(self.pos);
        (end > self.pos).then(|| self.lexeme(NEWLINE, end))
    }

    fn comment(&mut self) -> Option<Lexeme<'a>> {
        if self.peek() != Some(b'#') {
            return None;
        }
        let end = self.line_content_end(self.pos);
        Some(self.lexeme(COMMENT, end))
    }

    /// Consume `[space] [comment] newline` at the end of a line.
    fn line_end_into(&mut self, out: &mut Vec<Lexeme<'a>>) {
        out.extend(self.space());
        out.extend(self.comment());
        out.extend(self.newline());
    }

    /// Consume whatever remains on the line, keeping unexpected text as an error.
    fn line_tail(&mut self, out: &mut Vec<Lexeme<'a>>) {
        out.extend(self.space());
        out.extend(self.comment());
        if !self.at_line_end() {
            let end = self.line_content_end(self.pos);
            out.push(self.lexeme(ERROR, end));
        }
        out.extend(self.newline());
    }

    /// Consume blank and comment-only lines. Must be called at a line start.
    fn blank_lines_into(&mut self, out: &mut Vec<Lexeme<'a>>) {
        loop {
            if self.at_eof() || self.at_doc_boundary(self.pos) {
                return;
            }
            let p = self.skip_ws(self.pos);
            match self.byte_at(p) {
                None => {
                    out.extend(self.space());
                    return;
                }
                Some(b) if is_break(b) || b == b'#' => self.line_end_into(out),
                Some(_) => return,
            }
        }
    }

    fn flow_trivia(&mut self, out: &mut Vec<Lexeme<'a>>) {
        loop {
            if let Some(t) = self.space() {
                out.push(t);
            } else if let Some(t) = self.newline() {
                out.push(t);
            } else if let Some(t) = self.comment() {
                out.push(t);
            } else {
                return;
            }
        }
    }

    fn prop_end(&self, p: usize) -> usize {
        let mut q = p + 1;
        while let Some(b) = self.byte_at(q) {
            if is_ws(b) || is_break(b) || is_flow_indicator(b) {
                break;
            }
            q += 1;
        }
        q
    }

    fn prop(&mut self) -> Option<Lexeme<'a>> {
        let kind = match self.peek()? {
            b'&' => ANCHOR,
            b'!' => TAG,
            _ => return None,
        };
        let end = self.prop_end(self.pos);
        Some(self.lexeme(kind, end))
    }

    fn props_into(&mut self, out: &mut Vec<Lexeme<'a>>) {
        while let Some(t) = self.prop() {
            out.push(t);
            out.extend(self.space());
        }
    }

    fn flow_props_into(&mut self, out: &mut Vec<Lexeme<'a>>) {
        while let Some(t) = self.prop() {
            out.push(t);
            self.flow_trivia(out);
        }
    }

    // -- lookahead ----------------------------------------------------------

    fn skip_props(&self, mut p: usize) -> usize {
        while matches!(self.byte_at(p), Some(b'&') | Some(b'!')) {
            p = self.skip_ws(self.prop_end(p));
        }
        p
    }

    fn colon_after(&self, p: usize) -> bool {
        let p = self.skip_ws(p);
        self.byte_at(p) == Some(b':') && self.ws_or_end(p + 1)
    }

    fn quoted_end(&self, p: usize) -> usize {
        let quote = self.bytes[p];
        let mut q = p + 1;
        while let Some(b) = self.byte_at(q) {
            if quote == b'\'' && b == b'\'' {
                if self.byte_at(q + 1) == Some(b'\'') {
                    q += 2;
                    continue;
                }
                return q + 1;
            }
            if quote == b'"' && b == b'\\' {
                q += 2;
                continue;
            }
            if quote == b'"' && b == b'"' {
                return q + 1;
            }
            q += 1;
        }
        self.bytes.len()
    }

    fn alias_end(&self, p: usize) -> usize {
        let mut q = p + 1;
        while let Some(b) = self.byte_at(q) {
            if is_ws(b) || is_break(b) || is_flow_indicator(b) || (b == b':' && self.ws_or_end(q + 1))
            {
                break;
            }
            q += 1;
        }
        q
    }

    /// Kind and end of a quoted scalar or alias at the current position.
    fn quoted_or_alias(&self) -> Option<(SyntaxKind, usize)> {
        match self.peek()? {
            b'"' => Some((DOUBLE_QUOTED, self.quoted_end(self.pos))),
            b'\'' => Some((SINGLE_QUOTED, self.quoted_end(self.pos))),
            b'*' => Some((ALIAS, self.alias_end(self.pos))),
            _ => None,
        }
    }

    /// End of a flow collection starting at `p`, if it closes on the same line.
    fn flow_end_same_line(&self, p: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut q = p;
        while let Some(b) = self.byte_at(q) {
            match b {
                b'"' | b'\'' => {
                    q = self.quoted_end(q);
                    continue;
                }
                b'[' | b'{' => depth += 1,
                b']' | b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(q + 1);
                    }
                }
                b if is_break(b) => return None,
                _ => {}
            }
            q += 1;
        }
        None
    }

    /// Whether the text at `p` starts an implicit block mapping key.
    fn map_key_ahead(&self, p: usize) -> bool {
        let p = self.skip_props(p);
        let Some(b) = self.byte_at(p) else {
            return false;
        };
        match b {
            b'{' | b'[' => self
                .flow_end_same_line(p)
                .is_some_and(|q| self.colon_after(q)),
            b'"' | b'\'' => {
                let q = self.quoted_end(p);
                q <= self.line_content_end(p) && self.colon_after(q)
            }
            b'*' => self.colon_after(self.alias_end(p)),
            b'#' | b'|' | b'>' | b'%' | b'@' | b'`' | b'?' => false,
            b'-' if self.ws_or_end(p + 1) => false,
            b if is_break(b) => false,
            _ => self.plain_key_end(p).is_some_and(|q| self.colon_after(q)),
        }
    }

    /// End of a plain implicit key starting at `p`, trailing spaces trimmed.
    fn plain_key_end(&self, p: usize) -> Option<usize> {
        let mut q = p;
        while let Some(b) = self.byte_at(q) {
            if is_break(b) || (b == b':' && self.ws_or_end(q + 1)) {
                break;
            }
            if b == b'#' && q > p && is_ws(self.bytes[q - 1]) {
                return None;
            }
            q += 1;
        }
        while q > p && is_ws(self.bytes[q - 1]) {
            q -= 1;
        }
        (q > p).then_some(q)
    }

    /// End of a plain scalar line starting at `p`, with trailing spaces trimmed.
    fn plain_line_end(&self, p: usize, flow: bool) -> usize {
        let mut q = p;
        while let Some(b) = self.byte_at(q) {
            if is_break(b) {
                break;
            }
            if b == b':' {
                let next = self.byte_at(q + 1);
                if self.ws_or_end(q + 1) || (flow && next.is_some_and(is_flow_indicator)) {
                    break;
                }
            }
            if b == b'#' && q > p && is_ws(self.bytes[q - 1]) {
                break;
            }
            if flow && is_flow_indicator(b) {
                break;
            }
            q += 1;
        }
        while q > p && is_ws(self.bytes[q - 1]) {
            q -= 1;
        }
        q
    }

    fn plain_flow_end(&self, p: usize) -> usize {
        let end = self.plain_line_end(p, true);
        if end > p {
            return end;
        }
        p + self.src[p..].chars().next().map_or(1, char::len_utf8)
    }

    /// A plain scalar in block context, continuing over more-indented lines.
    fn plain_block_end(&self, parent_indent: isize) -> usize {
        let mut end = self.plain_line_end(self.pos, false);
        loop {
            let p = self.skip_ws(end);
            if !self.byte_at(p).is_some_and(is_break) {
                break;
            }
            let mut r = p;
            loop {
                r = self.skip_ws(self.after_break(r));
                if !self.byte_at(r).is_some_and(is_break) {
                    break;
                }
            }
            if r >= self.bytes.len() {
                break;
            }
            let line = self.line_start(r);
            if (self.column(r) as isize) <= parent_indent
                || self.bytes[r] == b'#'
                || self.at_doc_boundary(line)
                || self.map_key_ahead(r)
                || self.seq_ind_at(r)
            {
                break;
            }
            let next = self.plain_line_end(r, false);
            if next == r {
                break;
            }
            end = next;
        }
        end
    }

    /// A `|` or `>` scalar: header line plus every following line that is
    /// blank or indented deeper than the parent.
    fn block_scalar_end(&self, parent_indent: isize) -> usize {
        let header_end = self.line_content_end(self.pos);
        let mut committed = self.after_break(header_end);
        let mut body_indent: Option<usize> = None;
        let mut q = committed;
        while q < self.bytes.len() {
            if self.at_doc_boundary(q) {
                break;
            }
            let r = self.skip_ws(q);
            let line_end = self.line_content_end(q);
            if r >= line_end {
                // blank line, kept only if more content follows
                q = self.after_break(line_end);
                if q == line_end {
                    break;
                }
                continue;
            }
            let indent = self.bytes[q..r].iter().take_while(|&&b| b == b' ').count();
            let required = *body_indent.get_or_insert(indent);
            if (indent as isize) <= parent_indent || indent < required {
                break;
            }
            q = self.after_break(line_end);
            committed = q;
        }
        committed
    }

    // -- nodes --------------------------------------------------------------

    /// A `SCALAR` node holding one content token, optionally followed by the
    /// rest of its line.
    fn scalar(&mut self, kind: SyntaxKind, end: usize, tail: bool) {
        self.builder.start_node(SCALAR.into());
        self.token(kind, end);
        if tail {
            let mut rest = Vec::new();
            self.line_tail(&mut rest);
            self.flush(&mut rest);
        }
        self.builder.finish_node();
    }

    /// Wrap whatever `node` builds in a `VALUE`, after committing `sep`.
    fn value(&mut self, sep: &mut Vec<Lexeme<'a>>, node: impl FnOnce(&mut Self)) {
        self.flush(sep);
        self.builder.start_node(VALUE.into());
        node(self);
        self.builder.finish_node();
    }

    /// A node written on the current line in block context.
    fn inline_node(&mut self, parent_indent: isize) {
        match self.peek() {
            Some(b'{') | Some(b'[') => self.flow_collection(true),
            Some(b'|') | Some(b'>') => {
                let end = self.block_scalar_end(parent_indent);
                self.scalar(BLOCK_SCALAR, end, false);
            }
            Some(_) => {
                let (kind, end) = self
                    .quoted_or_alias()
                    .unwrap_or_else(|| (PLAIN, self.plain_block_end(parent_indent)));
                self.scalar(kind, end, true);
            }
            None => {
                self.builder.start_node(SCALAR.into());
                self.builder.finish_node();
            }
        }
    }

    fn implicit_key(&mut self) {
        let Some(b) = self.peek() else {
            return;
        };
        let scalar = match b {
            b if is_break(b) || b == b':' => return,
            b'{' | b'[' => None,
            _ => match self.quoted_or_alias() {
                Some(found) => Some(found),
                None => match self.plain_key_end(self.pos) {
                    Some(end) => Some((PLAIN, end)),
                    None => return,
                },
            },
        };
        self.builder.start_node(KEY.into());
        match scalar {
            Some((kind, end)) => self.scalar(kind, end, false),
            None => self.flow_collection(false),
        }
        self.builder.finish_node();
    }

    fn block_map(&mut self, indent: usize) {
        self.builder.start_node(BLOCK_MAP.into());
        let mut start = Vec::new();
        loop {
            self.builder.start_node(ITEM.into());
            self.props_into(&mut start);
            self.flush(&mut start);
            self.implicit_key();
            let mut sep: Vec<Lexeme<'a>> = self.space().into_iter().collect();
            if self.peek() == Some(b':') {
                sep.push(self.lexeme(COLON, self.pos + 1));
                self.block_value(&mut sep, indent as isize, Context::MapValue);
            } else {
                self.line_tail(&mut sep);
            }
            self.flush(&mut sep);
            self.builder.finish_node();
            if !self.next_item(&mut start, indent, Self::map_key_ahead) {
                break;
            }
        }
        self.builder.finish_node();
    }

    fn block_seq(&mut self, indent: usize) {
        self.builder.start_node(BLOCK_SEQ.into());
        let mut start = Vec::new();
        loop {
            self.builder.start_node(ITEM.into());
            start.push(self.lexeme(DASH, self.pos + 1));
            self.block_value(&mut start, indent as isize, Context::SeqItem);
            self.flush(&mut start);
            self.builder.finish_node();
            if !self.next_item(&mut start, indent, Self::seq_ind_at) {
                break;
            }
        }
        self.builder.finish_node();
    }

    /// Advance to the next item of a block collection at `indent`, or leave
    /// the position untouched when the collection has ended.
    fn next_item(
        &mut self,
        start: &mut Vec<Lexeme<'a>>,
        indent: usize,
        is_item: fn(&Self, usize) -> bool,
    ) -> bool {
        let mark = self.pos;
        let mut pending = Vec::new();
        self.blank_lines_into(&mut pending);
        if self.at_eof() || self.at_doc_boundary(self.pos) {
            self.pos = mark;
            return false;
        }
        let p = self.skip_ws(self.pos);
        if self.column(p) != indent || !is_item(self, p) {
            self.pos = mark;
            return false;
        }
        pending.extend(self.space());
        *start = pending;
        true
    }

    /// The value following `:` or `-` (or a document start). Its leading
    /// layout is appended to `sep` and committed before the value.
    fn block_value(&mut self, sep: &mut Vec<Lexeme<'a>>, parent_indent: isize, ctx: Context) {
        sep.extend(self.space());
        if self.at_line_end() {
            self.line_end_into(sep);
            self.next_line_node(sep, parent_indent, ctx);
            return;
        }
        if ctx == Context::MapValue {
            self.props_into(sep);
            if self.at_line_end() {
                self.line_end_into(sep);
                self.next_line_node(sep, parent_indent, ctx);
                return;
            }
            self.value(sep, |p| p.inline_node(parent_indent));
            return;
        }
        let indent = self.column(self.pos);
        self.block_node_here(sep, indent, parent_indent, ctx);
    }

    fn block_node_here(
        &mut self,
        sep: &mut Vec<Lexeme<'a>>,
        indent: usize,
        parent_indent: isize,
        ctx: Context,
    ) {
        if self.seq_ind_at(self.pos) {
            self.value(sep, |p| p.block_seq(indent));
            return;
        }
        if self.map_key_ahead(self.pos) {
            self.value(sep, |p| p.block_map(indent));
            return;
        }
        self.props_into(sep);
        if self.at_line_end() {
            self.line_end_into(sep);
            self.next_line_node(sep, parent_indent, ctx);
            return;
        }
        self.value(sep, |p| p.inline_node(parent_indent));
    }

    fn next_line_node(&mut self, sep: &mut Vec<Lexeme<'a>>, parent_indent: isize, ctx: Context) {
        let mark = self.pos;
        let mut pending = Vec::new();
        self.blank_lines_into(&mut pending);
        if self.at_eof() || self.at_doc_boundary(self.pos) {
            self.pos = mark;
            return;
        }
        let p = self.skip_ws(self.pos);
        let indent = self.column(p) as isize;
        let nested = indent > parent_indent
            || (ctx == Context::MapValue && indent == parent_indent && self.seq_ind_at(p));
        if !nested {
            self.pos = mark;
            return;
        }
        sep.extend(pending);
        sep.extend(self.space());
        self.block_node_here(sep, indent as usize, parent_indent, ctx);
    }

    /// A flow collection. In block context (`tail`) the rest of the line
    /// after the closing bracket belongs to the collection too.
    fn flow_collection(&mut self, tail: bool) {
        let is_map = self.peek() == Some(b'{');
        let (node, open) = if is_map {
            (FLOW_MAP, L_BRACE)
        } else {
            (FLOW_SEQ, L_BRACKET)
        };
        self.builder.start_node(node.into());
        self.token(open, self.pos + 1);
        let mut pending = Vec::new();
        loop {
            self.flow_trivia(&mut pending);
            match self.peek() {
                None => break,
                Some(b @ (b'}' | b']')) => {
                    let close = if b == b'}' { R_BRACE } else { R_BRACKET };
                    pending.push(self.lexeme(close, self.pos + 1));
                    break;
                }
                Some(b',') => {
                    pending.push(self.lexeme(COMMA, self.pos + 1));
                    continue;
                }
                Some(_) if self.at_doc_boundary(self.pos) => break,
                Some(_) => {}
            }
            self.flow_item(&mut pending, is_map);
        }
        if tail {
            self.line_tail(&mut pending);
        }
        self.flush(&mut pending);
        self.builder.finish_node();
    }

    fn at_flow_terminator(&self) -> bool {
        matches!(self.peek(), None | Some(b',') | Some(b']') | Some(b'}'))
    }

    /// One flow item. The node before a `:` becomes the key; a lone node is
    /// a key in a map and a value in a sequence.
    fn flow_item(&mut self, start: &mut Vec<Lexeme<'a>>, is_map: bool) {
        self.builder.start_node(ITEM.into());
        self.flow_props_into(start);
        self.flush(start);

        let empty_key = self.peek() == Some(b':')
            && (self.ws_or_end(self.pos + 1)
                || self.byte_at(self.pos + 1).is_some_and(is_flow_indicator));
        let has_node = !empty_key && !self.at_flow_terminator();
        let checkpoint = self.builder.checkpoint();
        if has_node {
            self.flow_node();
        }

        let mark = self.pos;
        let mut sep = Vec::new();
        self.flow_trivia(&mut sep);
        if self.peek() == Some(b':') {
            if has_node {
                self.builder.start_node_at(checkpoint, KEY.into());
                self.builder.finish_node();
            }
            sep.push(self.lexeme(COLON, self.pos + 1));
            self.flow_trivia(&mut sep);
            self.flow_props_into(&mut sep);
            if !self.at_flow_terminator() {
                self.value(&mut sep, Self::flow_node);
            }
            self.flush(&mut sep);
        } else {
            self.pos = mark;
            if has_node {
                let role = if is_map { KEY } else { VALUE };
                self.builder.start_node_at(checkpoint, role.into());
                self.builder.finish_node();
            }
        }
        self.builder.finish_node();
    }

    fn flow_node(&mut self) {
        if matches!(self.peek(), Some(b'{') | Some(b'[')) {
            self.flow_collection(false);
            return;
        }
        let (kind, end) = self
            .quoted_or_alias()
            .unwrap_or_else(|| (PLAIN, self.plain_flow_end(self.pos)));
        self.scalar(kind, end, false);
    }

    fn document(&mut self) {
        let begin = self.pos;
        self.builder.start_node(DOCUMENT.into());
        let mut start = Vec::new();
        loop {
            self.blank_lines_into(&mut start);
            if self.peek() == Some(b'%') && self.column(self.pos) == 0 {
                let end = self.line_content_end(self.pos);
                start.push(self.lexeme(DIRECTIVE, end));
                start.extend(self.newline());
                continue;
            }
            break;
        }

        if self.doc_marker_at(self.pos, b"---") {
            start.push(self.lexeme(DOC_START, self.pos + 3));
            self.block_value(&mut start, -1, Context::Document);
        } else if !self.at_eof() && !self.doc_marker_at(self.pos, b"...") {
            self.block_value(&mut start, -1, Context::Document);
        }
        self.flush(&mut start);

        let mut end = Vec::new();
        loop {
            self.blank_lines_into(&mut end);
            if self.at_eof() || self.doc_marker_at(self.pos, b"---") {
                break;
            }
            if self.doc_marker_at(self.pos, b"...") {
                end.push(self.lexeme(DOC_END, self.pos + 3));
                self.line_tail(&mut end);
                break;
            }
            let line_end = self.line_content_end(self.pos);
            end.push(self.lexeme(ERROR, line_end));
            end.extend(self.newline());
        }
        if self.pos == begin {
            let stuck = self.line_content_end(self.pos).max(self.pos + 1);
            end.push(self.lexeme(ERROR, stuck));
        }
        self.flush(&mut end);
        self.builder.finish_node();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::{self, Item, SyntaxNode};

    fn round_trip(text: &str) -> Vec<SyntaxNode> {
        let root = SyntaxNode::new_root(parse(text));
        assert_eq!(root.kind(), ROOT);
        assert_eq!(root.to_string(), text);
        root.children().collect()
    }

    fn value(node: &SyntaxNode) -> SyntaxNode {
        node.children()
            .find(|n| n.kind() == VALUE)
            .and_then(|v| v.first_child())
            .expect("value node")
    }

    fn items(node: &SyntaxNode) -> Vec<Item> {
        cst::items(node).collect()
    }

    fn content(node: &SyntaxNode) -> (SyntaxKind, String) {
        let token = node.first_token().expect("content token");
        (token.kind(), token.text().to_string())
    }

    #[test]
    fn block_map_with_nested_flow_collections() {
        let docs = round_trip("root: {a: 1, b: [x, y]}  # note\nnext: 2\n");
        assert_eq!(docs.len(), 1);
        let map = value(&docs[0]);
        assert_eq!(map.kind(), BLOCK_MAP);
        let entries = items(&map);
        assert_eq!(entries.len(), 2);
        let flow = entries[0].value().unwrap();
        assert_eq!(flow.kind(), FLOW_MAP);
        assert_eq!(cst::start_of(&flow), 6);
        let flow_items = items(&flow);
        assert_eq!(flow_items.len(), 2);
        assert_eq!(cst::close_end(&flow), Some(23));
        assert!(flow_items[1].start().iter().any(|t| t.kind() == COMMA));
        assert_eq!(flow_items[1].value().unwrap().kind(), FLOW_SEQ);
    }

    #[test]
    fn lone_flow_nodes_take_their_collection_role() {
        let docs = round_trip("{a, b: 1}\n");
        let map = value(&docs[0]);
        let entries = items(&map);
        assert!(entries[0].key().is_some() && entries[0].value().is_none());

        let docs = round_trip("[a, b: 1]\n");
        let seq = value(&docs[0]);
        let entries = items(&seq);
        assert!(entries[0].key().is_none() && entries[0].value().is_some());
        assert!(entries[1].key().is_some() && entries[1].value().is_some());
    }

    #[test]
    fn block_sequences_nest_under_keys() {
        let docs = round_trip("list:\n- a\n- b: 1\n  c: 2\n-   - x\nother: true\n");
        let map = value(&docs[0]);
        let entries = items(&map);
        assert_eq!(entries.len(), 2);
        let seq = entries[0].value().unwrap();
        assert_eq!(seq.kind(), BLOCK_SEQ);
        let seq_items = items(&seq);
        assert_eq!(seq_items.len(), 3);
        let nested_map = seq_items[1].value().unwrap();
        assert_eq!(nested_map.kind(), BLOCK_MAP);
        assert_eq!(items(&nested_map).len(), 2);
        assert_eq!(seq_items[2].value().unwrap().kind(), BLOCK_SEQ);
    }

    #[test]
    fn anchors_aliases_and_block_scalars() {
        let text = "base: &base\n  name: x\ntext: |\n  line one\n\n  line two\nref: *base\n";
        let docs = round_trip(text);
        let entries = items(&value(&docs[0]));
        assert_eq!(entries.len(), 3);
        assert!(entries[0].sep().iter().any(|t| t.kind() == ANCHOR));
        assert_eq!(
            content(&entries[1].value().unwrap()),
            (BLOCK_SCALAR, "|\n  line one\n\n  line two\n".to_string())
        );
        assert_eq!(
            content(&entries[2].value().unwrap()),
            (ALIAS, "*base".to_string())
        );
    }

    #[test]
    fn multiple_documents() {
        let docs = round_trip("%YAML 1.2\n---\na: 1\n...\n---\n- b\n");
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.kind() == DOCUMENT));
        assert_eq!(cst::start_of(&docs[1]), 23);
        assert_eq!(value(&docs[1]).kind(), BLOCK_SEQ);
    }

    #[test]
    fn multi_line_flow_and_plain_scalars() {
        round_trip("a: [1,\n  2, # two\n  3]\nb: some\n  folded text\n");
        round_trip("{\"k\":1, 'q''s': [a, {b: c}], : empty}\n");
    }

    #[test]
    fn malformed_input_is_still_lossless() {
        round_trip("a: b: c\n  weird:\n   - [unclosed\n\t\r\nkey: \"open");
        round_trip("? explicit\n: value\n");
        round_trip("- - - deep\n   # comment\n  - x\n");
        round_trip("   \n# only comments\n");
        round_trip("a: 1\r\nb: [x, y]\r\n");
    }

    #[test]
    fn unparsable_lines_become_error_tokens() {
        let docs = round_trip("a: 1\n  stray: [\n");
        let errors: Vec<String> = docs[0]
            .descendants_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == ERROR)
            .map(|t| t.text().to_string())
            .collect();
        assert!(!errors.is_empty());
    }

    #[test]
    fn empty_text_has_no_documents() {
        assert!(round_trip("").is_empty());
    }
}
