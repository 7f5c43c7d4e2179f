//! Inline grammar.
//!
//! Reparses the text of block leaves into spans: emphasis, code, links,
//! images, entities, escapes, raw HTML and the extension inlines. `Symbol`
//! is the catch-all for special bytes, so the inline layer is total on any
//! non-empty run of text.

use crate::arena::NodeId;
use crate::ast::{self, NodeKind};
use crate::parser::engine::{Engine, Rule};
use crate::parser::scan;

/// Backslash-escapable bytes.
const ESCAPABLE: &[u8] = br"-\`|*_{}[]()#+.!><";

fn is_nonspace(b: u8) -> bool {
    !matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

impl<'s, 'a> Engine<'s, 'a> {
    /// `Inlines`: one or more inlines, with line endings kept only between
    /// inlines. Returns a LIST node.
    pub(crate) fn inlines(&mut self) -> Option<NodeId> {
        let m = self.mark();
        let mut a = None;
        let mut any = false;
        loop {
            let e = self.mark();
            if let Some(endline) = self.endline() {
                if self.lookahead(|p| p.inline().is_some()) {
                    a = self.cons(endline, a);
                    any = true;
                    continue;
                }
                self.reset(e);
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
        let e = self.mark();
        if self.endline().is_none() {
            self.reset(e);
        }
        Some(self.mk_list(NodeKind::List, a))
    }

    pub(crate) fn inline(&mut self) -> Option<NodeId> {
        self.memoized(Rule::Inline, |p| {
            p.str_rule()
                .or_else(|| p.endline())
                .or_else(|| p.ul_or_star_line())
                .or_else(|| p.space())
                .or_else(|| p.strong())
                .or_else(|| p.emph())
                .or_else(|| p.strike())
                .or_else(|| p.image())
                .or_else(|| p.link())
                .or_else(|| p.note_reference())
                .or_else(|| p.inline_note())
                .or_else(|| p.code())
                .or_else(|| p.raw_html())
                .or_else(|| p.entity())
                .or_else(|| p.escaped_char())
                .or_else(|| p.smart())
                .or_else(|| p.symbol())
        })
    }

    // -- plain text ------------------------------------------------------

    /// A run of normal characters, optionally extended by word-internal
    /// underscores and smart apostrophes.
    fn str_rule(&mut self) -> Option<NodeId> {
        self.memoized(Rule::Str, |p| {
            let start = p.mark();
            if !p.eat_normal() {
                return None;
            }
            while p.eat_normal() {}
            let first_text = p.text(start);
            let first = p.mk_str(first_text);
            let mut a = Some(first);
            let mut parts = 1;
            while let Some(chunk) = p.str_chunk() {
                a = p.cons(chunk, a);
                parts += 1;
            }
            if parts == 1 {
                Some(first)
            } else {
                Some(p.mk_list(NodeKind::List, a))
            }
        })
    }

    /// `(NormalChar | '_'+ &Alphanumeric)+ | AposChunk`
    fn str_chunk(&mut self) -> Option<NodeId> {
        let start = self.mark();
        loop {
            if self.eat_normal() {
                continue;
            }
            let m = self.mark();
            let mut underscores = 0;
            while self.eat(b'_') {
                underscores += 1;
            }
            if underscores > 0 && self.lookahead(|p| p.eat_if(Engine::is_alphanumeric)) {
                continue;
            }
            self.reset(m);
            break;
        }
        if self.pos() > start {
            let text = self.text(start);
            return Some(self.mk_str(text));
        }
        self.apos_chunk()
    }

    /// `&{ Smart } '\'' &Alphanumeric`
    fn apos_chunk(&mut self) -> Option<NodeId> {
        if !self.ext().smart {
            return None;
        }
        let m = self.mark();
        if !self.eat(b'\'') {
            return None;
        }
        if !self.lookahead(|p| p.eat_if(Engine::is_alphanumeric)) {
            return self.fail(m);
        }
        Some(self.mk_elem(NodeKind::Apostrophe))
    }

    /// `Spacechar+`, collapsed to a single space.
    fn space(&mut self) -> Option<NodeId> {
        if !self.eat_if(Self::is_spacechar) {
            return None;
        }
        self.sp();
        Some(self.mk_text(NodeKind::Space, " "))
    }

    /// `< SpecialChar >` — the inline catch-all.
    fn symbol(&mut self) -> Option<NodeId> {
        let start = self.mark();
        match self.peek() {
            Some(b) if self.is_special(b) => {
                let _ = self.any();
                let text = self.text(start);
                Some(self.mk_str(text))
            }
            _ => None,
        }
    }

    // -- line endings ----------------------------------------------------

    pub(crate) fn endline(&mut self) -> Option<NodeId> {
        self.line_break()
            .or_else(|| self.terminal_endline())
            .or_else(|| self.normal_endline())
    }

    /// Two trailing spaces force a hard break.
    fn line_break(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat_str("  ") {
            return None;
        }
        if self.normal_endline().is_none() {
            return self.fail(m);
        }
        Some(self.mk_elem(NodeKind::Linebreak))
    }

    fn terminal_endline(&mut self) -> Option<NodeId> {
        let m = self.mark();
        self.sp();
        if !self.newline() || !self.at_end() {
            return self.fail(m);
        }
        Some(self.mk_text(NodeKind::Space, "\n"))
    }

    /// A newline is soft only if the next line does not open a different
    /// block (blank, quote, ATX heading, setext bottom).
    fn normal_endline(&mut self) -> Option<NodeId> {
        let m = self.mark();
        self.sp();
        if !self.newline() {
            return self.fail(m);
        }
        if self.at_blank_line() || self.peek() == Some(b'>') || self.at_atx_start() {
            return self.fail(m);
        }
        if self.lookahead(|p| {
            if p.raw_line().is_none() {
                return false;
            }
            let mut run = 0;
            while p.eat(b'=') {
                run += 1;
            }
            if run == 0 {
                while p.eat(b'-') {
                    run += 1;
                }
            }
            run > 0 && p.newline()
        }) {
            return self.fail(m);
        }
        Some(self.mk_text(NodeKind::Space, "\n"))
    }

    // -- delimiter-run guards -------------------------------------------

    /// Absorbs `****`-style runs and space-framed runs of `*` or `_` so the
    /// emphasis rules never backtrack over them.
    fn ul_or_star_line(&mut self) -> Option<NodeId> {
        let text = self
            .delim_line(b'*')
            .or_else(|| self.delim_line(b'_'))?;
        Some(self.mk_str(text))
    }

    fn delim_line(&mut self, c: u8) -> Option<&'a str> {
        let m = self.mark();
        let mut run = 0;
        while self.eat(c) {
            run += 1;
        }
        if run >= 4 {
            return Some(self.text(m));
        }
        self.reset(m);
        if self.eat_if(Self::is_spacechar) {
            let mut run = 0;
            while self.eat(c) {
                run += 1;
            }
            if run >= 1 && self.lookahead(|p| p.eat_if(Self::is_spacechar)) {
                return Some(self.text(m));
            }
        }
        self.fail(m)
    }

    // -- emphasis --------------------------------------------------------

    fn emph(&mut self) -> Option<NodeId> {
        let star = self.memoized(Rule::EmphStar, |p| p.emph_delim(b'*'));
        star.or_else(|| self.memoized(Rule::EmphUl, |p| p.emph_delim(b'_')))
    }

    /// Whitespace may not follow the opening delimiter.
    fn emph_delim(&mut self, c: u8) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(c) {
            return None;
        }
        if self.at_whitespace() {
            return self.fail(m);
        }
        let mut a = None;
        let mut any = false;
        loop {
            if self.peek() == Some(c) {
                match self.strong_of(c) {
                    Some(s) => {
                        a = self.cons(s, a);
                        any = true;
                        continue;
                    }
                    None => break,
                }
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
        if !self.eat(c) {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::Emph, a))
    }

    fn strong(&mut self) -> Option<NodeId> {
        let star = self.strong_of(b'*');
        star.or_else(|| self.strong_of(b'_'))
    }

    fn strong_of(&mut self, c: u8) -> Option<NodeId> {
        let rule = if c == b'*' {
            Rule::StrongStar
        } else {
            Rule::StrongUl
        };
        self.memoized(rule, |p| p.strong_delim(c))
    }

    fn strong_delim(&mut self, c: u8) -> Option<NodeId> {
        let m = self.mark();
        if !(self.eat(c) && self.eat(c)) {
            return self.fail(m);
        }
        if self.at_whitespace() {
            return self.fail(m);
        }
        let mut a = None;
        let mut any = false;
        loop {
            if self.lookahead(|p| p.eat(c) && p.eat(c)) {
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
        if !(self.eat(c) && self.eat(c)) {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::Strong, a))
    }

    /// `~~…~~`, gated on the Strike extension.
    fn strike(&mut self) -> Option<NodeId> {
        self.memoized(Rule::Strike, |p| {
            if !p.ext().strike {
                return None;
            }
            let m = p.mark();
            if !p.eat_str("~~") {
                return None;
            }
            if p.at_whitespace() {
                return p.fail(m);
            }
            let mut a = None;
            let mut any = false;
            loop {
                if p.lookahead(|q| q.eat_str("~~")) {
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
            if !p.eat_str("~~") {
                return p.fail(m);
            }
            Some(p.mk_list(NodeKind::Strike, a))
        })
    }

    // -- links and images ------------------------------------------------

    /// `'!'` then a link form; a resolved link is relabelled IMAGE, a
    /// failed reference keeps the literal text with `!` prepended.
    fn image(&mut self) -> Option<NodeId> {
        self.memoized(Rule::Image, |p| {
            let m = p.mark();
            if !p.eat(b'!') {
                return None;
            }
            let Some(l) = p.explicit_link().or_else(|| p.reference_link()) else {
                return p.fail(m);
            };
            if p.kind_of(l) == NodeKind::Link {
                p.set_kind(l, NodeKind::Image);
            } else {
                let bang = p.mk_str("!");
                let first = p.state.arena.get(l).child;
                p.state.arena.get_mut(bang).next = first;
                p.state.arena.get_mut(l).child = Some(bang);
            }
            Some(l)
        })
    }

    fn link(&mut self) -> Option<NodeId> {
        self.memoized(Rule::Link, |p| {
            p.explicit_link()
                .or_else(|| p.reference_link())
                .or_else(|| p.auto_link())
        })
    }

    /// `[label](url "title")`
    fn explicit_link(&mut self) -> Option<NodeId> {
        let m = self.mark();
        let label = self.label()?;
        self.spnl();
        if !self.eat(b'(') {
            return self.fail(m);
        }
        self.sp();
        let url = self.source();
        self.spnl();
        let title = self.title_part();
        self.sp();
        if !self.eat(b')') {
            return self.fail(m);
        }
        let children = self.state.arena.get(label).child;
        Some(ast::link(self.arena(), children, url, title))
    }

    /// `'<' url '>' | url` with balanced parentheses allowed.
    fn source(&mut self) -> &'a str {
        let m = self.mark();
        if self.eat(b'<') {
            let start = self.mark();
            self.source_contents();
            let url = self.text(start);
            if self.eat(b'>') {
                return url;
            }
            self.reset(m);
        }
        let start = self.mark();
        self.source_contents();
        self.text(start)
    }

    fn source_contents(&mut self) {
        loop {
            let before = self.pos();
            while self.eat_if(|b| is_nonspace(b) && !matches!(b, b'(' | b')' | b'>')) {}
            if self.peek() == Some(b'(') {
                let m = self.mark();
                let _ = self.eat(b'(');
                self.source_contents();
                if !self.eat(b')') {
                    self.reset(m);
                }
            }
            if self.pos() == before {
                break;
            }
        }
    }

    /// Quoted title, or nothing. The closing quote must sit before `)` or
    /// the end of the line.
    fn title_part(&mut self) -> &'a str {
        for quote in [b'\'', b'"'] {
            let m = self.mark();
            if !self.eat(quote) {
                continue;
            }
            let start = self.mark();
            loop {
                if self.lookahead(|p| {
                    if !p.eat(quote) {
                        return false;
                    }
                    p.sp();
                    p.peek() == Some(b')') || p.newline()
                }) {
                    break;
                }
                if !self.any() {
                    break;
                }
            }
            let title = self.text(start);
            if self.eat(quote) {
                return title;
            }
            self.reset(m);
        }
        ""
    }

    fn reference_link(&mut self) -> Option<NodeId> {
        self.reference_link_double()
            .or_else(|| self.reference_link_single())
    }

    /// `[label][id]` — resolved against the registry; a miss reconstructs
    /// the bracketed source text.
    fn reference_link_double(&mut self) -> Option<NodeId> {
        let m = self.mark();
        let a = self.label()?;
        let spnl_start = self.mark();
        self.spnl();
        let spnl_text = self.text(spnl_start);
        if self.lookahead(|p| p.eat_str("[]")) {
            return self.fail(m);
        }
        let Some(b) = self.label() else {
            return self.fail(m);
        };
        let probe = self.state.arena.get(b).child;
        match self.find_reference(probe) {
            Some((url, title)) => {
                let children = self.state.arena.get(a).child;
                Some(ast::link(self.arena(), children, &url, &title))
            }
            None => {
                let open_a = self.mk_str("[");
                let close_a = self.mk_str("]");
                let between = self.mk_str(spnl_text);
                let open_b = self.mk_str("[");
                let close_b = self.mk_str("]");
                let mut head = None;
                for part in [open_a, a, close_a, between, open_b, b, close_b] {
                    head = self.cons(part, head);
                }
                Some(self.mk_list(NodeKind::List, head))
            }
        }
    }

    /// `[label]` or `[label][]`.
    fn reference_link_single(&mut self) -> Option<NodeId> {
        let a = self.label()?;
        let opt_start = self.mark();
        {
            let m = self.mark();
            self.spnl();
            if !self.eat_str("[]") {
                self.reset(m);
            }
        }
        let yytext = self.text(opt_start);
        let probe = self.state.arena.get(a).child;
        match self.find_reference(probe) {
            Some((url, title)) => {
                let children = self.state.arena.get(a).child;
                Some(ast::link(self.arena(), children, &url, &title))
            }
            None => {
                let open = self.mk_str("[");
                let close = self.mk_str("]");
                let rest = self.mk_str(yytext);
                let mut head = None;
                for part in [open, a, close, rest] {
                    head = self.cons(part, head);
                }
                Some(self.mk_list(NodeKind::List, head))
            }
        }
    }

    /// `'[' (inlines not containing ']') ']'`; with Notes on, a label may
    /// not start with `^`.
    pub(crate) fn label(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(b'[') {
            return None;
        }
        if self.ext().notes {
            if self.peek() == Some(b'^') {
                return self.fail(m);
            }
        } else if self.at_end() {
            return self.fail(m);
        }
        let mut a = None;
        loop {
            if self.peek() == Some(b']') {
                break;
            }
            match self.inline() {
                Some(n) => a = self.cons(n, a),
                None => break,
            }
        }
        if !self.eat(b']') {
            return self.fail(m);
        }
        Some(self.mk_list(NodeKind::List, a))
    }

    fn auto_link(&mut self) -> Option<NodeId> {
        self.auto_link_url().or_else(|| self.auto_link_email())
    }

    /// `<scheme://…>`
    fn auto_link_url(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(b'<') {
            return None;
        }
        let Some(url) = self.eat_scan(scan::autolink_url) else {
            return self.fail(m);
        };
        if !self.eat(b'>') {
            return self.fail(m);
        }
        let label = self.mk_str(url);
        Some(ast::link(self.arena(), Some(label), url, ""))
    }

    /// `<addr@host>`, with `mailto:` prepended to the target.
    fn auto_link_email(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(b'<') {
            return None;
        }
        let _ = self.eat_str("mailto:");
        let Some(addr) = self.eat_scan(scan::autolink_email) else {
            return self.fail(m);
        };
        if !self.eat(b'>') {
            return self.fail(m);
        }
        let url = format!("mailto:{}", addr);
        let label = self.mk_str(addr);
        Some(ast::link(self.arena(), Some(label), &url, ""))
    }

    // -- code spans ------------------------------------------------------

    fn code(&mut self) -> Option<NodeId> {
        self.memoized(Rule::Code, |p| {
            for n in 1..=5 {
                if let Some(code) = p.code_ticks(n) {
                    return Some(code);
                }
            }
            None
        })
    }

    /// Exactly `n` backticks.
    fn ticks(&mut self, n: usize) -> bool {
        let m = self.mark();
        for _ in 0..n {
            if !self.eat(b'`') {
                return self.fail_flag(m);
            }
        }
        if self.peek() == Some(b'`') {
            return self.fail_flag(m);
        }
        true
    }

    /// Opening and closing tick counts must match; a blank line ends the
    /// span; framing spaces are trimmed.
    fn code_ticks(&mut self, n: usize) -> Option<NodeId> {
        let m = self.mark();
        if !self.ticks(n) {
            return None;
        }
        self.sp();
        let start = self.mark();
        loop {
            match self.peek() {
                Some(b'`') => {
                    if self.lookahead(|p| p.ticks(n)) {
                        break;
                    }
                    while self.eat(b'`') {}
                }
                Some(b' ') | Some(b'\t') => {
                    if self.lookahead(|p| {
                        p.sp();
                        p.ticks(n)
                    }) {
                        break;
                    }
                    let _ = self.any();
                }
                Some(b'\n') | Some(b'\r') => {
                    let nl = self.mark();
                    if !self.newline() {
                        break;
                    }
                    if self.at_blank_line() {
                        self.reset(nl);
                        break;
                    }
                }
                Some(_) => {
                    if !self.eat_if(|b| !matches!(b, b'`' | b' ' | b'\t' | b'\n' | b'\r')) {
                        break;
                    }
                    while self.eat_if(|b| !matches!(b, b'`' | b' ' | b'\t' | b'\n' | b'\r')) {}
                }
                None => break,
            }
        }
        if self.pos() == start {
            return self.fail(m);
        }
        let content = self.text(start);
        self.sp();
        if !self.ticks(n) {
            return self.fail(m);
        }
        Some(self.mk_text(NodeKind::Code, content))
    }

    // -- raw HTML, entities, escapes -------------------------------------

    /// Comments, script blocks and single tags; FilterHTML strips them.
    fn raw_html(&mut self) -> Option<NodeId> {
        self.memoized(Rule::RawHtml, |p| {
            let start = p.mark();
            let matched = p.eat_scan(scan::html_comment).is_some()
                || p.html_block_script()
                || p.eat_scan(scan::html_tag).is_some();
            if !matched {
                return None;
            }
            let yytext = p.text(start);
            if p.ext().filter_html {
                Some(p.mk_elem(NodeKind::List))
            } else {
                Some(p.mk_text(NodeKind::Html, yytext))
            }
        })
    }

    /// Hex, decimal and named entities, kept verbatim as HTML nodes.
    fn entity(&mut self) -> Option<NodeId> {
        let start = self.mark();
        let matched = self.eat_scan(scan::hex_entity).is_some()
            || self.eat_scan(scan::dec_entity).is_some()
            || self.eat_scan(scan::char_entity).is_some();
        if !matched {
            return None;
        }
        let yytext = self.text(start);
        Some(self.mk_text(NodeKind::Html, yytext))
    }

    fn escaped_char(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.eat(b'\\') {
            return None;
        }
        if self.lookahead(|p| p.newline()) {
            return self.fail(m);
        }
        let start = self.mark();
        if !self.eat_if(|b| ESCAPABLE.contains(&b)) {
            return self.fail(m);
        }
        let text = self.text(start);
        Some(self.mk_str(text))
    }
}
