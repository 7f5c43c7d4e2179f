//! PEG evaluation machinery.
//!
//! Grammar rules are methods over [`Engine`]: ordered choice is `or_else`
//! over `Option<NodeId>` results, sequences are straight-line code with a
//! saved [`Engine::mark`] restored on failure, and lookahead runs a probe
//! with the cursor always restored. A packrat memo table caches both
//! success and failure per `(rule, position)` for the mutually recursive
//! inline rules, which otherwise go exponential on long delimiter runs.
//!
//! The engine borrows the shared [`ParseState`] (arena, registries,
//! extension flags) instead of owning it, so a semantic action can spin up
//! an inner engine over a RAW fragment while the outer cursor sits
//! untouched.

use std::collections::HashMap;

use log::trace;

use crate::arena::{Arena, NodeId};
use crate::ast::{self, NodeKind};
use crate::config::Extensions;
use crate::error::MarkdownError;
use crate::input::Input;
use crate::references::{NoteRegistry, ReferenceRegistry};

/// State shared by the three passes and every recursive reparse.
#[derive(Debug, Default)]
pub(crate) struct ParseState {
    pub arena: Arena,
    pub references: ReferenceRegistry,
    pub notes: NoteRegistry,
    pub extensions: Extensions,
    /// First fatal condition met during a parse; checked by the driver.
    pub fatal: Option<MarkdownError>,
}

impl ParseState {
    pub fn new(extensions: Extensions) -> Self {
        ParseState {
            extensions,
            ..Default::default()
        }
    }
}

/// Memoized rules. Only the mutually recursive inline layer is cached;
/// block rules never re-probe the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Rule {
    Inline,
    Str,
    EmphStar,
    EmphUl,
    StrongStar,
    StrongUl,
    Strike,
    Code,
    RawHtml,
    Link,
    Image,
    NoteReference,
    InlineNote,
    Smart,
}

#[derive(Debug, Clone, Copy)]
enum Memo {
    Matched(usize, NodeId),
    Failed,
}

/// One cursor over one buffer, sharing the parse state.
pub(crate) struct Engine<'s, 'a> {
    pub(crate) state: &'s mut ParseState,
    input: Input<'a>,
    pos: usize,
    memo: HashMap<(Rule, usize), Memo>,
}

impl<'s, 'a> Engine<'s, 'a> {
    pub fn new(state: &'s mut ParseState, src: &'a str) -> Self {
        Engine {
            state,
            input: Input::new(src),
            pos: 0,
            memo: HashMap::new(),
        }
    }

    // -- cursor ----------------------------------------------------------

    pub fn mark(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, m: usize) {
        self.pos = m;
    }

    /// Restores `m` and reports failure; used as `return self.fail(m)`.
    pub fn fail<T>(&mut self, m: usize) -> Option<T> {
        self.pos = m;
        None
    }

    /// [`Engine::fail`] for recogniser rules returning `bool`.
    pub fn fail_flag(&mut self, m: usize) -> bool {
        self.pos = m;
        false
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    // -- matching primitives --------------------------------------------

    pub fn peek(&self) -> Option<u8> {
        self.input.byte_at(self.pos)
    }

    /// Any byte (`.`).
    pub fn any(&mut self) -> bool {
        if self.at_end() {
            false
        } else {
            self.pos += 1;
            true
        }
    }

    /// Literal byte.
    pub fn eat(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Literal string.
    pub fn eat_str(&mut self, s: &str) -> bool {
        let bytes = s.as_bytes();
        if self.input.tail(self.pos).starts_with(bytes) {
            self.pos += bytes.len();
            true
        } else {
            false
        }
    }

    /// Character class.
    pub fn eat_if(&mut self, pred: impl Fn(u8) -> bool) -> bool {
        match self.peek() {
            Some(b) if pred(b) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Runs a `nom` leaf scanner at the cursor and consumes its match.
    pub fn eat_scan(
        &mut self,
        scanner: impl Fn(&[u8]) -> Option<usize>,
    ) -> Option<&'a str> {
        let len = scanner(self.input.tail(self.pos))?;
        let text = self.input.slice(self.pos, self.pos + len);
        self.pos += len;
        Some(text)
    }

    /// Positive/negative lookahead: runs `probe` and always restores the
    /// cursor. `&e` is `lookahead(..)`, `!e` is `!lookahead(..)`.
    pub fn lookahead(&mut self, probe: impl FnOnce(&mut Self) -> bool) -> bool {
        let m = self.pos;
        let hit = probe(self);
        self.pos = m;
        hit
    }

    /// Capture span from `start` to the cursor (`yytext`).
    pub fn text(&self, start: usize) -> &'a str {
        self.input.slice(start, self.pos)
    }

    // -- memoization -----------------------------------------------------

    /// Packrat cache around a rule body. Failures memoize too, preserving
    /// the linear-time guarantee. Cached nodes come back with their `next`
    /// link cleared: a handle parked in a discarded alternative may carry a
    /// stale sibling.
    pub fn memoized(
        &mut self,
        rule: Rule,
        body: impl FnOnce(&mut Self) -> Option<NodeId>,
    ) -> Option<NodeId> {
        let start = self.pos;
        match self.memo.get(&(rule, start)).copied() {
            Some(Memo::Matched(end, node)) => {
                self.pos = end;
                self.state.arena.get_mut(node).next = None;
                return Some(node);
            }
            Some(Memo::Failed) => return None,
            None => {}
        }
        trace!("{:?} at {}", rule, start);
        match body(self) {
            Some(node) => {
                self.memo.insert((rule, start), Memo::Matched(self.pos, node));
                Some(node)
            }
            None => {
                self.memo.insert((rule, start), Memo::Failed);
                self.pos = start;
                None
            }
        }
    }

    /// Discards memo entries behind the cursor. The driver commits after
    /// each top-level pass so the table never outlives its usefulness.
    pub fn commit(&mut self) {
        let pos = self.pos;
        self.memo.retain(|&(_, p), _| p >= pos);
    }

    // -- shared state access --------------------------------------------

    pub fn arena(&mut self) -> &mut Arena {
        &mut self.state.arena
    }

    pub fn ext(&self) -> Extensions {
        self.state.extensions
    }

    /// Latches the first fatal condition; the parse keeps going so the
    /// grammar stays total, the driver reports it afterwards.
    pub fn set_fatal(&mut self, err: MarkdownError) {
        if self.state.fatal.is_none() {
            self.state.fatal = Some(err);
        }
    }

    /// Registry lookup with the fatal latch applied on structural errors
    /// (a miss keeps the source text intact, so degrading is safe).
    pub fn find_reference(&mut self, label: Option<NodeId>) -> Option<(String, String)> {
        match self.state.references.find(&self.state.arena, label) {
            Ok(found) => found,
            Err(err) => {
                self.set_fatal(err);
                None
            }
        }
    }

    // -- node shorthands -------------------------------------------------

    pub fn mk_elem(&mut self, kind: NodeKind) -> NodeId {
        ast::elem(&mut self.state.arena, kind)
    }

    pub fn mk_str(&mut self, s: &str) -> NodeId {
        ast::string(&mut self.state.arena, s)
    }

    pub fn mk_text(&mut self, kind: NodeKind, s: &str) -> NodeId {
        ast::text_elem(&mut self.state.arena, kind, s)
    }

    pub fn mk_list(&mut self, kind: NodeKind, head: Option<NodeId>) -> NodeId {
        ast::list(&mut self.state.arena, kind, head)
    }

    pub fn cons(&mut self, new: NodeId, head: Option<NodeId>) -> Option<NodeId> {
        ast::cons(&mut self.state.arena, new, head)
    }

    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.state.arena.get_mut(id).kind = kind;
    }

    pub fn kind_of(&self, id: NodeId) -> NodeKind {
        self.state.arena.get(id).kind
    }

    // -- shared lexical rules -------------------------------------------

    pub fn is_spacechar(b: u8) -> bool {
        b == b' ' || b == b'\t'
    }

    pub fn is_digit(b: u8) -> bool {
        b.is_ascii_digit()
    }

    /// ASCII alphanumerics plus every byte `0x80..=0xFF`; UTF-8 passes
    /// through undecoded.
    pub fn is_alphanumeric(b: u8) -> bool {
        b.is_ascii_alphanumeric() || b >= 0x80
    }

    /// Bytes the inline layer treats as markup starters, including the
    /// extension-gated set.
    pub fn is_special(&self, b: u8) -> bool {
        is_special_byte(self.state.extensions, b)
    }

    /// `NormalChar`: anything that is not special, space or newline.
    pub fn eat_normal(&mut self) -> bool {
        let ext = self.state.extensions;
        self.eat_if(move |b| {
            !is_special_byte(ext, b) && !matches!(b, b' ' | b'\t' | b'\n' | b'\r')
        })
    }

    pub fn at_whitespace(&self) -> bool {
        matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r'))
    }

    /// `'\n' | '\r' '\n'?`
    pub fn newline(&mut self) -> bool {
        if self.eat(b'\n') {
            return true;
        }
        if self.eat(b'\r') {
            self.eat(b'\n');
            return true;
        }
        false
    }

    /// `Spacechar*`
    pub fn sp(&mut self) {
        while self.eat_if(Self::is_spacechar) {}
    }

    /// `Sp (Newline Sp)?`
    pub fn spnl(&mut self) {
        self.sp();
        let m = self.mark();
        if self.newline() {
            self.sp();
        } else {
            self.reset(m);
        }
    }

    /// `Sp Newline`
    pub fn blank_line(&mut self) -> bool {
        let m = self.mark();
        self.sp();
        if self.newline() {
            true
        } else {
            self.reset(m);
            false
        }
    }

    pub fn at_blank_line(&mut self) -> bool {
        self.lookahead(|p| p.blank_line())
    }

    /// Up to three leading spaces.
    pub fn nonindent_space(&mut self) {
        for _ in 0..3 {
            if !self.eat(b' ') {
                break;
            }
        }
    }

    /// One tab, or four spaces.
    pub fn indent(&mut self) -> bool {
        if self.eat(b'\t') {
            return true;
        }
        self.eat_str("    ")
    }

    pub fn at_indent(&mut self) -> bool {
        self.lookahead(|p| p.indent())
    }

    /// `(!'\r' !'\n' .)* Newline | .+ Eof` — the newline is part of the
    /// captured text.
    pub fn raw_line(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b != b'\n' && b != b'\r') {
            self.pos += 1;
        }
        if self.newline() {
            return Some(self.text(start));
        }
        // No newline: only matches if at least one byte remains.
        if self.pos > start {
            return Some(self.text(start));
        }
        self.fail(start)
    }
}

/// See [`Engine::is_special`]; free-standing so character-class closures can
/// use it with a copied flag set.
pub(crate) fn is_special_byte(ext: Extensions, b: u8) -> bool {
    if matches!(
        b,
        b'~' | b'*'
            | b'_'
            | b'`'
            | b'&'
            | b'['
            | b']'
            | b'('
            | b')'
            | b'<'
            | b'!'
            | b'#'
            | b'\\'
    ) {
        return true;
    }
    if ext.smart && matches!(b, b'.' | b'-' | b'\'' | b'"') {
        return true;
    }
    ext.notes && b == b'^'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_over<'s, 'a>(state: &'s mut ParseState, src: &'a str) -> Engine<'s, 'a> {
        Engine::new(state, src)
    }

    #[test]
    fn primitives_backtrack_cleanly() {
        let mut state = ParseState::default();
        let mut p = engine_over(&mut state, "abc");
        assert!(p.eat(b'a'));
        let m = p.mark();
        assert!(!p.eat_str("bx"));
        assert!(p.eat_str("bc"));
        p.reset(m);
        assert_eq!(p.peek(), Some(b'b'));
    }

    #[test]
    fn lookahead_never_consumes() {
        let mut state = ParseState::default();
        let mut p = engine_over(&mut state, "xy");
        assert!(p.lookahead(|p| p.eat(b'x')));
        assert_eq!(p.pos(), 0);
        assert!(!p.lookahead(|p| p.eat(b'q')));
        assert_eq!(p.pos(), 0);
    }

    #[test]
    fn newline_accepts_all_three_endings() {
        let mut state = ParseState::default();
        for src in ["\n", "\r\n", "\r"] {
            let mut p = engine_over(&mut state, src);
            assert!(p.newline(), "for {:?}", src);
            assert!(p.at_end(), "for {:?}", src);
        }
    }

    #[test]
    fn raw_line_keeps_the_newline_and_handles_eof() {
        let mut state = ParseState::default();
        let mut p = engine_over(&mut state, "one\ntwo");
        assert_eq!(p.raw_line(), Some("one\n"));
        assert_eq!(p.raw_line(), Some("two"));
        assert_eq!(p.raw_line(), None);
    }

    #[test]
    fn memo_caches_failure_and_success() {
        let mut state = ParseState::default();
        let mut p = engine_over(&mut state, "zz");
        let mut calls = 0;
        for _ in 0..2 {
            let r = p.memoized(Rule::Code, |p| {
                calls += 1;
                if p.eat(b'q') {
                    Some(p.mk_str("q"))
                } else {
                    None
                }
            });
            assert!(r.is_none());
        }
        assert_eq!(calls, 1);

        let mut calls = 0;
        let mut ids = Vec::new();
        for _ in 0..2 {
            p.rewind();
            let r = p.memoized(Rule::Str, |p| {
                calls += 1;
                p.eat(b'z');
                Some(p.mk_str("z"))
            });
            ids.push(r.unwrap());
            assert_eq!(p.pos(), 1);
        }
        assert_eq!(calls, 1);
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn commit_prunes_behind_the_cursor() {
        let mut state = ParseState::default();
        let mut p = engine_over(&mut state, "ab");
        let _ = p.memoized(Rule::Inline, |p| {
            p.eat(b'a');
            Some(p.mk_str("a"))
        });
        assert_eq!(p.pos(), 1);
        p.commit();
        p.rewind();
        let mut calls = 0;
        let _ = p.memoized(Rule::Inline, |p| {
            calls += 1;
            p.eat(b'a');
            Some(p.mk_str("a"))
        });
        assert_eq!(calls, 1, "entry at 0 should have been pruned");
    }

    #[test]
    fn nonindent_space_stops_at_three() {
        let mut state = ParseState::default();
        let mut p = engine_over(&mut state, "    x");
        p.nonindent_space();
        assert_eq!(p.pos(), 3);
    }
}
