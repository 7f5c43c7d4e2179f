//! Extension grammar: smart punctuation, footnotes, definition lists.
//!
//! Every rule here opens with a semantic predicate on the extension flags;
//! with the extension off the rule behaves exactly like a failed match and
//! the classic grammar takes over.

use crate::arena::NodeId;
use crate::ast::{self, NodeKind};
use crate::parser::block::Marker;
use crate::parser::engine::{Engine, Rule};

impl<'s, 'a> Engine<'s, 'a> {
    // -- smart punctuation ----------------------------------------------

    pub(crate) fn smart(&mut self) -> Option<NodeId> {
        self.memoized(Rule::Smart, |p| {
            if !p.ext().smart {
                return None;
            }
            p.ellipsis()
                .or_else(|| p.dash())
                .or_else(|| p.single_quoted())
                .or_else(|| p.double_quoted())
                .or_else(|| p.apostrophe())
        })
    }

    fn apostrophe(&mut self) -> Option<NodeId> {
        if !self.eat(b'\'') {
            return None;
        }
        Some(self.mk_elem(NodeKind::Apostrophe))
    }

    fn ellipsis(&mut self) -> Option<NodeId> {
        if self.eat_str("...") || self.eat_str(". . .") {
            Some(self.mk_elem(NodeKind::Ellipsis))
        } else {
            None
        }
    }

    fn dash(&mut self) -> Option<NodeId> {
        self.em_dash().or_else(|| self.en_dash())
    }

    fn em_dash(&mut self) -> Option<NodeId> {
        if self.eat_str("---") || self.eat_str("--") {
            Some(self.mk_elem(NodeKind::Emdash))
        } else {
            None
        }
    }

    /// A dash binds as an en-dash only before a digit.
    fn en_dash(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(b'-') {
            return None;
        }
        if !self.lookahead(|p| p.eat_if(Engine::is_digit)) {
            return self.fail(m);
        }
        Some(self.mk_elem(NodeKind::Endash))
    }

    /// An opening quote must not look like punctuation trailing a word or
    /// the start of a contraction.
    fn single_quoted(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(b'\'') {
            return None;
        }
        if self.lookahead(|p| {
            p.eat_if(|b| {
                matches!(
                    b,
                    b')' | b'!' | b']' | b',' | b'.' | b';' | b':' | b'-' | b'?' | b' ' | b'\t'
                        | b'\n'
                )
            })
        }) {
            return self.fail(m);
        }
        if self.lookahead(|p| {
            let word =
                p.eat_str("ve") || p.eat_str("ll") || p.eat_str("re") || p.eat(b's')
                    || p.eat(b't')
                    || p.eat(b'm');
            word && !p.lookahead(|q| q.eat_if(Engine::is_alphanumeric))
        }) {
            return self.fail(m);
        }
        let mut a = None;
        let mut any = false;
        loop {
            if self.lookahead(|p| p.single_quote_end()) {
                break;
            }
            match self.inline() {
                Some(n) => {
                    a = self.cons(n, a);
                    any = true;
                }
                None => break,
            }
        }
        if !any {
            return self.fail(m);
        }
        if !self.single_quote_end() {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::SingleQuoted, a))
    }

    fn single_quote_end(&mut self) -> bool {
        let m = self.mark();
        if !self.eat(b'\'') {
            return false;
        }
        if self.lookahead(|p| p.eat_if(Engine::is_alphanumeric)) {
            return self.fail_flag(m);
        }
        true
    }

    fn double_quoted(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(b'"') {
            return None;
        }
        let mut a = None;
        let mut any = false;
        loop {
            if self.peek() == Some(b'"') {
                break;
            }
            match self.inline() {
                Some(n) => {
                    a = self.cons(n, a);
                    any = true;
                }
                None => break,
            }
        }
        if !any {
            return self.fail(m);
        }
        if !self.eat(b'"') {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::DoubleQuoted, a))
    }

    // -- footnotes -------------------------------------------------------

    /// `[^key]` — cloned body from the note registry, literal text on a
    /// miss.
    pub(crate) fn note_reference(&mut self) -> Option<NodeId> {
        self.memoized(Rule::NoteReference, |p| {
            if !p.ext().notes {
                return None;
            }
            let key = p.raw_note_reference()?;
            match p.state.notes.find(key) {
                Some(body) => {
                    let children = ast::clone_chain(p.arena(), body);
                    let node = p.mk_elem(NodeKind::Note);
                    p.state.arena.get_mut(node).child = children;
                    Some(node)
                }
                None => {
                    let literal = format!("[^{}]", key);
                    Some(p.mk_str(&literal))
                }
            }
        })
    }

    /// `^[…]` — a note given in place.
    pub(crate) fn inline_note(&mut self) -> Option<NodeId> {
        self.memoized(Rule::InlineNote, |p| {
            if !p.ext().notes {
                return None;
            }
            let m = p.mark();
            if !p.eat_str("^[") {
                return None;
            }
            let mut a = None;
            let mut any = false;
            loop {
                if p.peek() == Some(b']') {
                    break;
                }
                match p.inline() {
                    Some(n) => {
                        a = p.cons(n, a);
                        any = true;
                    }
                    None => break,
                }
            }
            if !any {
                return p.fail(m);
            }
            if !p.eat(b']') {
                return p.fail(m);
            }
            Some(p.mk_list(NodeKind::Note, a))
        })
    }

    /// `[^key]: body` — the definition block. The key rides in the text
    /// slot; the body is a chain of RAW nodes awaiting the post-pass.
    pub(crate) fn note_definition(&mut self) -> Option<NodeId> {
        if !self.ext().notes {
            return None;
        }
        let m = self.mark();
        self.nonindent_space();
        let Some(key) = self.raw_note_reference() else {
            return self.fail(m);
        };
        if !self.eat(b':') {
            return self.fail(m);
        }
        self.sp();
        let Some(first) = self.raw_note_block() else {
            return self.fail(m);
        };
        let mut a = self.cons(first, None);
        loop {
            if !self.at_indent() {
                break;
            }
            match self.raw_note_block() {
                Some(b) => a = self.cons(b, a),
                None => break,
            }
        }
        let body = ast::reverse(self.arena(), a);
        let node = self.mk_elem(NodeKind::Note);
        let n = self.state.arena.get_mut(node);
        n.text = key.to_string();
        n.child = body;
        Some(node)
    }

    /// `"[^" key ']'` — returns the key between the brackets.
    fn raw_note_reference(&mut self) -> Option<&'a str> {
        let m = self.mark();
        if !self.eat_str("[^") {
            return None;
        }
        let start = self.mark();
        while self.eat_if(|b| !matches!(b, b'\n' | b'\r' | b']')) {}
        if self.pos() == start {
            return self.fail(m);
        }
        let key = self.text(start);
        if !self.eat(b']') {
            return self.fail(m);
        }
        Some(key)
    }

    /// Body lines (one indent level stripped) plus the trailing blank run.
    fn raw_note_block(&mut self) -> Option<NodeId> {
        let m = self.mark();
        let mut s = String::new();
        let mut lines = 0;
        loop {
            if self.at_blank_line() {
                break;
            }
            match self.optionally_indented_line() {
                Some(line) => {
                    s.push_str(line);
                    lines += 1;
                }
                None => break,
            }
        }
        if lines == 0 {
            return self.fail(m);
        }
        let blank_start = self.mark();
        while self.blank_line() {}
        s.push_str(self.text(blank_start));
        s.push('\n');
        Some(self.mk_text(NodeKind::Raw, &s))
    }

    // -- definition lists ------------------------------------------------

    /// `NonindentSpace (':' | '~') Spacechar+`
    pub(crate) fn defmark(&mut self) -> bool {
        let m = self.mark();
        self.nonindent_space();
        if !(self.eat(b':') || self.eat(b'~')) {
            return self.fail_flag(m);
        }
        if !self.eat_if(Self::is_spacechar) {
            return self.fail_flag(m);
        }
        self.sp();
        true
    }

    pub(crate) fn definition_list(&mut self) -> Option<NodeId> {
        if !self.ext().dlists {
            return None;
        }
        let m = self.mark();
        let mut a = None;
        let mut defs = 0;
        while let Some(d) = self.definition() {
            a = self.cons(d, a);
            defs += 1;
        }
        if defs == 0 {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::DefinitionList, a))
    }

    /// Title lines followed by marked definitions; the definition group's
    /// items are retagged from LISTITEM to DEFDATA.
    fn definition(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.lookahead(|p| {
            let mut lines = 0;
            loop {
                if p.lookahead(|q| q.defmark()) {
                    break;
                }
                if p.raw_line().is_none() {
                    break;
                }
                lines += 1;
            }
            lines > 0 && p.defmark()
        }) {
            return None;
        }
        let mut a = None;
        let mut titles = 0;
        while let Some(t) = self.dlist_title() {
            a = self.cons(t, a);
            titles += 1;
        }
        if titles == 0 {
            return self.fail(m);
        }
        let Some(data) = self.def_tight().or_else(|| self.def_loose()) else {
            return self.fail(m);
        };
        let mut cur = self.state.arena.get(data).child;
        while let Some(id) = cur {
            let node = self.state.arena.get_mut(id);
            if node.kind == NodeKind::ListItem {
                node.kind = NodeKind::DefData;
            }
            cur = node.next;
        }
        a = self.cons(data, a);
        Some(self.mk_list(NodeKind::List, a))
    }

    fn dlist_title(&mut self) -> Option<NodeId> {
        let m = self.mark();
        self.nonindent_space();
        if self.lookahead(|p| p.defmark()) {
            return self.fail(m);
        }
        if !self.lookahead(|p| p.eat_if(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))) {
            return self.fail(m);
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
        Some(self.mk_list(NodeKind::DefTitle, a))
    }

    fn def_tight(&mut self) -> Option<NodeId> {
        if !self.lookahead(|p| p.defmark()) {
            return None;
        }
        self.list_tight(Marker::Defmark)
    }

    fn def_loose(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.blank_line() {
            return None;
        }
        if !self.lookahead(|p| p.defmark()) {
            return self.fail(m);
        }
        match self.list_loose(Marker::Defmark) {
            Some(n) => Some(n),
            None => self.fail(m),
        }
    }
}
