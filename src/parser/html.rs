//! HTML block recognition.
//!
//! Block-level HTML is matched structurally: an open tag from the known
//! block set, greedy content with nested same-tag recursion, then the
//! matching close tag. Tag names match only as literal lowercase or literal
//! uppercase spellings; a mixed-case `<Div>` falls through to inline HTML.
//! `script` and `head` skip the nesting recursion. With the FilterHTML /
//! FilterStyles options the productions still consume their input but
//! return an empty list node instead of the block.

use lazy_static::lazy_static;

use crate::arena::NodeId;
use crate::ast::NodeKind;
use crate::parser::engine::Engine;
use crate::parser::scan;

lazy_static! {
    /// Block-level tags recognised with nested same-tag content, paired
    /// with their all-uppercase spelling.
    static ref NESTING_TAGS: Vec<(&'static str, String)> = [
        "address", "blockquote", "center", "div", "dl", "fieldset", "form",
        "h1", "h2", "h3", "h4", "h5", "h6", "menu", "noframes", "noscript",
        "ol", "p", "pre", "table", "ul", "dd", "dt", "frameset", "li",
        "tbody", "td", "tfoot", "th", "thead", "tr",
    ]
    .iter()
    .map(|t| (*t, t.to_uppercase()))
    .collect();
}

impl<'s, 'a> Engine<'s, 'a> {
    /// `HtmlBlock`: a recognised block form followed by at least one blank
    /// line. FilterHTML swaps the node for an empty list.
    pub(crate) fn html_block(&mut self) -> Option<NodeId> {
        if self.peek() != Some(b'<') {
            return None;
        }
        let m = self.mark();
        let recognised = self.html_block_in_tags()
            || self.eat_scan(scan::html_comment).is_some()
            || self.html_block_self_closing();
        if !recognised {
            return self.fail(m);
        }
        let yytext = self.text(m);
        if !self.blank_line() {
            return self.fail(m);
        }
        while self.blank_line() {}
        if self.ext().filter_html {
            Some(self.mk_elem(NodeKind::List))
        } else {
            Some(self.mk_text(NodeKind::HtmlBlock, yytext))
        }
    }

    /// `StyleBlock`: `<style>…</style>` with optional trailing blank lines.
    pub(crate) fn style_block(&mut self) -> Option<NodeId> {
        let m = self.mark();
        if !self.html_relaxed_block("style", "STYLE") {
            return None;
        }
        let yytext = self.text(m);
        while self.blank_line() {}
        if self.ext().filter_styles {
            Some(self.mk_elem(NodeKind::List))
        } else {
            Some(self.mk_text(NodeKind::HtmlBlock, yytext))
        }
    }

    fn html_block_in_tags(&mut self) -> bool {
        for (lower, upper) in NESTING_TAGS.iter() {
            if self.html_in_tag(lower, upper) {
                return true;
            }
        }
        self.html_block_script() || self.html_relaxed_block("head", "HEAD")
    }

    /// Open tag, content with nested same-tag recursion, close tag.
    fn html_in_tag(&mut self, lower: &str, upper: &str) -> bool {
        let m = self.mark();
        if !self.html_open_tag(lower, upper) {
            return false;
        }
        loop {
            if self.html_in_tag(lower, upper) {
                continue;
            }
            if self.html_close_tag(lower, upper) {
                return true;
            }
            if !self.any() {
                self.reset(m);
                return false;
            }
        }
    }

    /// Open tag, content without nesting, close tag (`script`, `head`,
    /// `style`).
    fn html_relaxed_block(&mut self, lower: &str, upper: &str) -> bool {
        let m = self.mark();
        if !self.html_open_tag(lower, upper) {
            return false;
        }
        loop {
            if self.html_close_tag(lower, upper) {
                return true;
            }
            if !self.any() {
                self.reset(m);
                return false;
            }
        }
    }

    /// Shared with the inline `RawHtml` production.
    pub(crate) fn html_block_script(&mut self) -> bool {
        self.html_relaxed_block("script", "SCRIPT")
    }

    /// `'<' Spnl NAME Spnl HtmlAttribute* '>'`
    fn html_open_tag(&mut self, lower: &str, upper: &str) -> bool {
        let m = self.mark();
        if !self.eat(b'<') {
            return false;
        }
        self.spnl();
        if !(self.eat_str(lower) || self.eat_str(upper)) {
            self.reset(m);
            return false;
        }
        self.spnl();
        let _ = self.eat_scan(scan::html_attributes);
        if !self.eat(b'>') {
            self.reset(m);
            return false;
        }
        true
    }

    /// `'<' Spnl '/' NAME Spnl '>'` — either case closes either opener.
    fn html_close_tag(&mut self, lower: &str, upper: &str) -> bool {
        let m = self.mark();
        if !self.eat(b'<') {
            return false;
        }
        self.spnl();
        if !self.eat(b'/') {
            self.reset(m);
            return false;
        }
        if !(self.eat_str(lower) || self.eat_str(upper)) {
            self.reset(m);
            return false;
        }
        self.spnl();
        if !self.eat(b'>') {
            self.reset(m);
            return false;
        }
        true
    }

    /// `'<' Spnl TYPE Spnl HtmlAttribute* '/' Spnl '>'`
    fn html_block_self_closing(&mut self) -> bool {
        let m = self.mark();
        if !self.eat(b'<') {
            return false;
        }
        self.spnl();
        if !self.html_block_type() {
            self.reset(m);
            return false;
        }
        self.spnl();
        let _ = self.eat_scan(scan::html_attributes);
        if !self.eat(b'/') {
            self.reset(m);
            return false;
        }
        self.spnl();
        if !self.eat(b'>') {
            self.reset(m);
            return false;
        }
        true
    }

    fn html_block_type(&mut self) -> bool {
        for (lower, upper) in NESTING_TAGS.iter() {
            if self.eat_str(lower) || self.eat_str(upper) {
                return true;
            }
        }
        self.eat_str("script")
            || self.eat_str("SCRIPT")
            || self.eat_str("head")
            || self.eat_str("HEAD")
    }
}
