//! Block-level grammar.
//!
//! The block layer partitions lines into paragraphs, headings, lists,
//! blockquotes, verbatims, references, note definitions and HTML blocks.
//! Container blocks (blockquotes, list items) accumulate their content as
//! RAW text in their text slot; the driver's post-pass reparses it through
//! the same grammar. `Plain` is the catch-all, so a document parse is total.

use log::debug;

use crate::arena::NodeId;
use crate::ast::{self, NodeKind};
use crate::parser::engine::Engine;

/// Item marker discipline. A list commits to one marker for all its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Bullet,
    Enumerator,
    Defmark,
}

impl<'s, 'a> Engine<'s, 'a> {
    // -- entry points ----------------------------------------------------

    /// `Doc`: a list of blocks. Never fails; trailing blank lines are
    /// swallowed so a healthy grammar consumes the whole buffer.
    pub(crate) fn document(&mut self) -> NodeId {
        let mut a = None;
        while let Some(b) = self.block() {
            if self.keep_block(b) {
                a = self.cons(b, a);
            }
        }
        while self.blank_line() {}
        self.mk_list(NodeKind::List, a)
    }

    /// `Docblock`: a single block.
    pub(crate) fn docblock(&mut self) -> Option<NodeId> {
        while self.blank_line() {}
        self.block()
    }

    /// `References`: collect link definitions, skip everything else.
    pub(crate) fn references_pass(&mut self) {
        debug!("references pass");
        loop {
            if let Some(r) = self.reference() {
                let payload = self
                    .state
                    .arena
                    .get(r)
                    .link
                    .as_ref()
                    .map(|l| (l.label, l.url.clone(), l.title.clone()));
                if let Some((label, url, title)) = payload {
                    self.state.references.record(label, &url, &title);
                }
            } else if !self.skip_block() {
                break;
            }
        }
    }

    /// `Notes`: collect footnote definitions, skip everything else.
    pub(crate) fn notes_pass(&mut self) {
        debug!("notes pass");
        loop {
            if let Some(n) = self.note_definition() {
                let (key, body) = {
                    let node = self.state.arena.get(n);
                    (node.text.clone(), node.child)
                };
                self.state.notes.record(&key, body);
            } else if !self.skip_block() {
                break;
            }
        }
    }

    // -- block dispatch --------------------------------------------------

    fn block(&mut self) -> Option<NodeId> {
        let m = self.mark();
        while self.blank_line() {}
        let block = self
            .block_quote()
            .or_else(|| self.verbatim())
            .or_else(|| self.note_definition())
            .or_else(|| self.reference())
            .or_else(|| self.horizontal_rule())
            .or_else(|| self.heading())
            .or_else(|| self.definition_list())
            .or_else(|| self.ordered_list())
            .or_else(|| self.bullet_list())
            .or_else(|| self.html_block())
            .or_else(|| self.style_block())
            .or_else(|| self.para())
            .or_else(|| self.plain());
        match block {
            Some(b) => Some(b),
            None => self.fail(m),
        }
    }

    /// Reference and note definitions are consumed by the document pass but
    /// live in the registries, not the tree; filtered HTML leaves an empty
    /// list behind, which carries no content either.
    fn keep_block(&self, id: NodeId) -> bool {
        let node = self.state.arena.get(id);
        match node.kind {
            NodeKind::Reference => false,
            NodeKind::Note if !node.text.is_empty() => false,
            NodeKind::List if node.child.is_none() && node.text.is_empty() => false,
            _ => true,
        }
    }

    // -- paragraphs ------------------------------------------------------

    /// `NonindentSpace Inlines BlankLine+`
    fn para(&mut self) -> Option<NodeId> {
        let m = self.mark();
        self.nonindent_space();
        let Some(inlines) = self.inlines() else {
            return self.fail(m);
        };
        if !self.blank_line() {
            return self.fail(m);
        }
        while self.blank_line() {}
        self.set_kind(inlines, NodeKind::Para);
        Some(inlines)
    }

    /// Catch-all: inlines not terminated by a blank line.
    fn plain(&mut self) -> Option<NodeId> {
        let inlines = self.inlines()?;
        self.set_kind(inlines, NodeKind::Plain);
        Some(inlines)
    }

    // -- headings --------------------------------------------------------

    fn heading(&mut self) -> Option<NodeId> {
        self.setext_heading().or_else(|| self.atx_heading())
    }

    /// Longest run of `#` up to six; kind is H1 + (run length - 1).
    fn atx_start(&mut self) -> Option<NodeKind> {
        let m = self.mark();
        let mut run = 0u8;
        while run < 6 && self.eat(b'#') {
            run += 1;
        }
        if run == 0 {
            return self.fail(m);
        }
        Some(NodeKind::heading(run))
    }

    pub(crate) fn at_atx_start(&mut self) -> bool {
        self.lookahead(|p| p.atx_start().is_some())
    }

    /// `!Newline !(Sp? '#'* Sp Newline) Inline`
    fn atx_inline(&mut self) -> Option<NodeId> {
        if self.lookahead(|p| p.newline()) {
            return None;
        }
        if self.lookahead(|p| {
            p.sp();
            while p.eat(b'#') {}
            p.sp();
            p.newline()
        }) {
            return None;
        }
        self.inline()
    }

    fn atx_heading(&mut self) -> Option<NodeId> {
        let m = self.mark();
        let kind = self.atx_start()?;
        self.sp();
        let mut a = None;
        let mut any = false;
        while let Some(i) = self.atx_inline() {
            a = self.cons(i, a);
            any = true;
        }
        if !any {
            return self.fail(m);
        }
        // ( Sp? '#'* Sp )? Newline
        let close = self.mark();
        self.sp();
        while self.eat(b'#') {}
        self.sp();
        if !self.newline() {
            self.reset(close);
            if !self.newline() {
                return self.fail(m);
            }
        }
        Some(self.mk_list(kind, a))
    }

    /// `'='+ Newline` / `'-'+ Newline`
    pub(crate) fn setext_bottom(&mut self, c: u8) -> bool {
        let m = self.mark();
        if !self.eat(c) {
            return false;
        }
        while self.eat(c) {}
        if self.newline() {
            true
        } else {
            self.fail_flag(m)
        }
    }

    /// The lookahead `&(RawLine SetextBottom)` commits to the level before
    /// any inline is parsed.
    fn setext_heading_level(&mut self, c: u8, kind: NodeKind) -> Option<NodeId> {
        let m = self.mark();
        if !self.lookahead(|p| p.raw_line().is_some() && p.setext_bottom(c)) {
            return None;
        }
        let mut a = None;
        let mut any = false;
        loop {
            if self.lookahead(|p| p.endline().is_some()) {
                break;
            }
            match self.inline() {
                Some(i) => {
                    a = self.cons(i, a);
                    any = true;
                }
                None => break,
            }
        }
        if !any {
            return self.fail(m);
        }
        self.sp();
        if !self.newline() {
            return self.fail(m);
        }
        if !self.setext_bottom(c) {
            return self.fail(m);
        }
        Some(self.mk_list(kind, a))
    }

    fn setext_heading(&mut self) -> Option<NodeId> {
        self.setext_heading_level(b'=', NodeKind::H1)
            .or_else(|| self.setext_heading_level(b'-', NodeKind::H2))
    }

    // -- blockquote ------------------------------------------------------

    /// Quoted lines accumulate as RAW text; blank lines inside the quote
    /// become paragraph separators on the reparse.
    fn block_quote(&mut self) -> Option<NodeId> {
        let m = self.mark();
        let mut raw = String::new();
        let mut groups = 0;
        loop {
            let g = self.mark();
            if !self.eat(b'>') {
                break;
            }
            let _ = self.eat(b' ');
            match self.raw_line() {
                Some(line) => raw.push_str(line),
                None => {
                    self.reset(g);
                    break;
                }
            }
            // ( !'>' !BlankLine Line )*
            loop {
                if self.peek() == Some(b'>') || self.at_blank_line() {
                    break;
                }
                match self.raw_line() {
                    Some(line) => raw.push_str(line),
                    None => break,
                }
            }
            while self.blank_line() {
                raw.push('\n');
            }
            groups += 1;
        }
        if groups == 0 {
            return self.fail(m);
        }
        raw.push('\n');
        Some(self.mk_text(NodeKind::BlockQuote, &raw))
    }

    // -- verbatim --------------------------------------------------------

    /// `(BlankLine*)(!BlankLine IndentedLine)+` with the indent stripped.
    fn verbatim_chunk(&mut self) -> Option<String> {
        let m = self.mark();
        let mut s = String::new();
        while self.blank_line() {
            s.push('\n');
        }
        let mut lines = 0;
        loop {
            if self.at_blank_line() {
                break;
            }
            let line_start = self.mark();
            if !self.indent() {
                break;
            }
            match self.raw_line() {
                Some(line) => {
                    s.push_str(line);
                    lines += 1;
                }
                None => {
                    self.reset(line_start);
                    break;
                }
            }
        }
        if lines == 0 {
            return self.fail(m);
        }
        Some(s)
    }

    fn verbatim(&mut self) -> Option<NodeId> {
        let mut s = String::new();
        let mut chunks = 0;
        while let Some(chunk) = self.verbatim_chunk() {
            s.push_str(&chunk);
            chunks += 1;
        }
        if chunks == 0 {
            return None;
        }
        s.push('\n');
        Some(self.mk_text(NodeKind::Verbatim, &s))
    }

    // -- horizontal rule -------------------------------------------------

    /// Recogniser shared with the `Bullet` negative lookahead.
    pub(crate) fn horizontal_rule_line(&mut self) -> bool {
        let m = self.mark();
        self.nonindent_space();
        let marked = self.hrule_of(b'*') || self.hrule_of(b'-') || self.hrule_of(b'_');
        if !marked {
            return self.fail_flag(m);
        }
        self.sp();
        if !self.newline() {
            return self.fail_flag(m);
        }
        if !self.blank_line() {
            return self.fail_flag(m);
        }
        while self.blank_line() {}
        true
    }

    /// `c Sp c Sp c (Sp c)*`
    fn hrule_of(&mut self, c: u8) -> bool {
        let m = self.mark();
        for i in 0..3 {
            if !self.eat(c) {
                return self.fail_flag(m);
            }
            if i < 2 {
                self.sp();
            }
        }
        loop {
            let rep = self.mark();
            self.sp();
            if !self.eat(c) {
                self.reset(rep);
                break;
            }
        }
        true
    }

    fn horizontal_rule(&mut self) -> Option<NodeId> {
        if self.horizontal_rule_line() {
            Some(self.mk_elem(NodeKind::HRule))
        } else {
            None
        }
    }

    // -- lists -----------------------------------------------------------

    /// `!HorizontalRule NonindentSpace ('+' | '*' | '-') Spacechar+`
    pub(crate) fn bullet(&mut self) -> bool {
        let m = self.mark();
        if self.lookahead(|p| p.horizontal_rule_line()) {
            return false;
        }
        self.nonindent_space();
        if !(self.eat(b'+') || self.eat(b'*') || self.eat(b'-')) {
            return self.fail_flag(m);
        }
        if !self.eat_if(Self::is_spacechar) {
            return self.fail_flag(m);
        }
        self.sp();
        true
    }

    /// `NonindentSpace [0-9]+ '.' Spacechar+`
    pub(crate) fn enumerator(&mut self) -> bool {
        let m = self.mark();
        self.nonindent_space();
        if !self.eat_if(Self::is_digit) {
            return self.fail_flag(m);
        }
        while self.eat_if(Self::is_digit) {}
        if !self.eat(b'.') {
            return self.fail_flag(m);
        }
        if !self.eat_if(Self::is_spacechar) {
            return self.fail_flag(m);
        }
        self.sp();
        true
    }

    fn list_marker(&mut self, marker: Marker) -> bool {
        match marker {
            Marker::Bullet => self.bullet(),
            Marker::Enumerator => self.enumerator(),
            Marker::Defmark => self.defmark(),
        }
    }

    fn any_list_marker_ahead(&mut self) -> bool {
        if self.lookahead(|p| p.bullet()) || self.lookahead(|p| p.enumerator()) {
            return true;
        }
        self.ext().dlists && self.lookahead(|p| p.defmark())
    }

    fn bullet_list(&mut self) -> Option<NodeId> {
        if !self.lookahead(|p| p.bullet()) {
            return None;
        }
        let node = self
            .list_tight(Marker::Bullet)
            .or_else(|| self.list_loose(Marker::Bullet))?;
        self.set_kind(node, NodeKind::BulletList);
        Some(node)
    }

    fn ordered_list(&mut self) -> Option<NodeId> {
        if !self.lookahead(|p| p.enumerator()) {
            return None;
        }
        let node = self
            .list_tight(Marker::Enumerator)
            .or_else(|| self.list_loose(Marker::Enumerator))?;
        self.set_kind(node, NodeKind::OrderedList);
        Some(node)
    }

    /// Every item is immediately followed by the next; a trailing item
    /// marker after the blank run means this was a loose list after all.
    pub(crate) fn list_tight(&mut self, marker: Marker) -> Option<NodeId> {
        let m = self.mark();
        let mut a = None;
        let mut items = 0;
        while let Some(item) = self.list_item(marker, true) {
            a = self.cons(item, a);
            items += 1;
        }
        if items == 0 {
            return self.fail(m);
        }
        while self.blank_line() {}
        if self.any_list_marker_ahead() {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::List, a))
    }

    /// Loose items get `"\n\n"` appended to their RAW so the reparse sees
    /// paragraph breaks.
    pub(crate) fn list_loose(&mut self, marker: Marker) -> Option<NodeId> {
        let m = self.mark();
        let mut a = None;
        let mut items = 0;
        while let Some(item) = self.list_item(marker, false) {
            while self.blank_line() {}
            self.state.arena.get_mut(item).text.push_str("\n\n");
            a = self.cons(item, a);
            items += 1;
        }
        if items == 0 {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::List, a))
    }

    fn list_item(&mut self, marker: Marker, tight: bool) -> Option<NodeId> {
        let m = self.mark();
        if !self.list_marker(marker) {
            return None;
        }
        let Some(mut raw) = self.list_block() else {
            return self.fail(m);
        };
        if tight {
            loop {
                if self.at_blank_line() {
                    break;
                }
                match self.list_continuation_block() {
                    Some(more) => raw.push_str(&more),
                    None => break,
                }
            }
            // A continuation after blank lines belongs to a loose item.
            if self.lookahead(|p| p.list_continuation_block().is_some()) {
                return self.fail(m);
            }
        } else {
            while let Some(more) = self.list_continuation_block() {
                raw.push_str(&more);
            }
        }
        Some(self.mk_text(NodeKind::ListItem, &raw))
    }

    /// First line plus directly following non-marker lines.
    fn list_block(&mut self) -> Option<String> {
        if self.at_blank_line() {
            return None;
        }
        let first = self.raw_line()?;
        let mut raw = String::from(first);
        while let Some(line) = self.list_block_line() {
            raw.push_str(line);
        }
        Some(raw)
    }

    /// `!BlankLine !(Indent? marker) !HorizontalRule OptionallyIndentedLine`
    fn list_block_line(&mut self) -> Option<&'a str> {
        if self.at_blank_line() {
            return None;
        }
        if self.lookahead(|p| {
            let _ = p.indent();
            let dlists = p.ext().dlists;
            p.bullet() || p.enumerator() || (dlists && p.defmark())
        }) {
            return None;
        }
        if self.lookahead(|p| p.horizontal_rule_line()) {
            return None;
        }
        self.optionally_indented_line()
    }

    pub(crate) fn optionally_indented_line(&mut self) -> Option<&'a str> {
        let _ = self.indent();
        self.raw_line()
    }

    /// Blank run (an empty run becomes the `0x01` block separator), then
    /// one or more indented blocks, all folded into the item's RAW.
    fn list_continuation_block(&mut self) -> Option<String> {
        let m = self.mark();
        let mut s = String::new();
        let blank_start = self.mark();
        while self.blank_line() {}
        let blanks = self.text(blank_start);
        if blanks.is_empty() {
            s.push('\u{1}');
        } else {
            s.push_str(blanks);
        }
        let mut blocks = 0;
        loop {
            let b = self.mark();
            if !self.indent() {
                break;
            }
            match self.list_block() {
                Some(block) => {
                    s.push_str(&block);
                    blocks += 1;
                }
                None => {
                    self.reset(b);
                    break;
                }
            }
        }
        if blocks == 0 {
            return self.fail(m);
        }
        Some(s)
    }

    // -- link definitions ------------------------------------------------

    /// `NonindentSpace !"[]" Label ':' Spnl RefSrc RefTitle BlankLine+`
    pub(crate) fn reference(&mut self) -> Option<NodeId> {
        let m = self.mark();
        self.nonindent_space();
        if self.lookahead(|p| p.eat_str("[]")) {
            return self.fail(m);
        }
        let Some(label) = self.label() else {
            return self.fail(m);
        };
        if !self.eat(b':') {
            return self.fail(m);
        }
        self.spnl();
        let src_start = self.mark();
        if !self.eat_if(is_nonspace) {
            return self.fail(m);
        }
        while self.eat_if(is_nonspace) {}
        let url = self.text(src_start);
        let title = self.ref_title();
        if !self.blank_line() {
            return self.fail(m);
        }
        while self.blank_line() {}
        let label_children = self.state.arena.get(label).child;
        let node = ast::link(self.arena(), label_children, url, title);
        self.set_kind(node, NodeKind::Reference);
        Some(node)
    }

    /// Quoted or parenthesised title, or nothing. The closing delimiter
    /// must sit at the end of its line.
    fn ref_title(&mut self) -> &'a str {
        for (open, close) in [(b'\'', b'\''), (b'"', b'"'), (b'(', b')')] {
            let m = self.mark();
            self.spnl();
            if self.eat(open) {
                let start = self.mark();
                loop {
                    if self.lookahead(|p| {
                        if !p.eat(close) {
                            return false;
                        }
                        p.sp();
                        p.newline()
                    }) {
                        break;
                    }
                    if self.lookahead(|p| p.newline()) {
                        break;
                    }
                    if !self.any() {
                        break;
                    }
                }
                let title = self.text(start);
                if self.eat(close) {
                    return title;
                }
            }
            self.reset(m);
        }
        ""
    }

    // -- skip pass -------------------------------------------------------

    /// Consume one block without building anything; used by the reference
    /// and note passes to step over unrelated content.
    fn skip_block(&mut self) -> bool {
        if self.html_block().is_some() {
            return true;
        }
        // ( !'#' !SetextBottom1 !SetextBottom2 !BlankLine RawLine )+ BlankLine*
        let mut lines = 0;
        loop {
            if self.peek() == Some(b'#') {
                break;
            }
            if self.lookahead(|p| p.setext_bottom(b'=')) || self.lookahead(|p| p.setext_bottom(b'-'))
            {
                break;
            }
            if self.at_blank_line() {
                break;
            }
            if self.raw_line().is_none() {
                break;
            }
            lines += 1;
        }
        if lines > 0 {
            while self.blank_line() {}
            return true;
        }
        if self.blank_line() {
            while self.blank_line() {}
            return true;
        }
        self.raw_line().is_some()
    }
}

fn is_nonspace(b: u8) -> bool {
    !matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
