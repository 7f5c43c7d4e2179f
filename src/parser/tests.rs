use super::{Document, Parser};
use crate::arena::NodeId;
use crate::ast::NodeKind;
use crate::config::Extensions;

fn parse(src: &str) -> Document {
    Parser::with_defaults(src).parse().expect("parse should succeed")
}

fn parse_ext(src: &str, ext: Extensions) -> Document {
    Parser::new(src, ext).parse().expect("parse should succeed")
}

fn top_kinds(doc: &Document) -> Vec<NodeKind> {
    doc.root_children().map(|id| doc.node(id).kind).collect()
}

fn child_kinds(doc: &Document, id: NodeId) -> Vec<NodeKind> {
    doc.children(id).map(|c| doc.node(c).kind).collect()
}

/// First node of `kind` anywhere under `id`, depth first.
fn find_kind(doc: &Document, id: NodeId, kind: NodeKind) -> Option<NodeId> {
    if doc.node(id).kind == kind {
        return Some(id);
    }
    for child in doc.children(id) {
        if let Some(found) = find_kind(doc, child, kind) {
            return Some(found);
        }
    }
    None
}

fn has_kind(doc: &Document, kind: NodeKind) -> bool {
    find_kind(doc, doc.root, kind).is_some()
}

#[test]
fn paragraph_splits_words_and_spaces() {
    let doc = parse("hello world\n");
    assert_eq!(top_kinds(&doc), [NodeKind::Para]);
    let para = doc.root_children().next().unwrap();
    assert_eq!(
        child_kinds(&doc, para),
        [NodeKind::Str, NodeKind::Space, NodeKind::Str]
    );
    let texts: Vec<_> = doc.children(para).map(|c| doc.node(c).text.clone()).collect();
    assert_eq!(texts, ["hello", " ", "world"]);
}

#[test]
fn atx_heading_levels_follow_the_run() {
    for (src, kind) in [
        ("# a\n", NodeKind::H1),
        ("## a\n", NodeKind::H2),
        ("### a\n", NodeKind::H3),
        ("#### a\n", NodeKind::H4),
        ("##### a\n", NodeKind::H5),
        ("###### a\n", NodeKind::H6),
    ] {
        let doc = parse(src);
        assert_eq!(top_kinds(&doc), [kind], "for {:?}", src);
    }
}

#[test]
fn seven_hashes_stop_at_h6_with_a_literal_hash() {
    let doc = parse("####### x\n");
    let heading = doc.root_children().next().unwrap();
    assert_eq!(doc.node(heading).kind, NodeKind::H6);
    let first = doc.children(heading).next().unwrap();
    assert_eq!(doc.node(first).kind, NodeKind::Str);
    assert_eq!(doc.node(first).text, "#");
}

#[test]
fn setext_headings_commit_to_their_level() {
    let doc = parse("Title\n=====\n");
    assert_eq!(top_kinds(&doc), [NodeKind::H1]);
    let doc = parse("Title\n-----\n");
    assert_eq!(top_kinds(&doc), [NodeKind::H2]);
}

#[test]
fn heading_then_paragraph() {
    let doc = parse("# Title\n\npara\n");
    assert_eq!(top_kinds(&doc), [NodeKind::H1, NodeKind::Para]);
}

#[test]
fn emphasis_and_strong() {
    let doc = parse("*em* **st**\n");
    let para = doc.root_children().next().unwrap();
    assert_eq!(
        child_kinds(&doc, para),
        [NodeKind::Emph, NodeKind::Space, NodeKind::Strong]
    );
    let emph = doc.children(para).next().unwrap();
    let inner = doc.children(emph).next().unwrap();
    assert_eq!(doc.node(inner).text, "em");
}

#[test]
fn underscore_emphasis_and_word_internal_underscores() {
    let doc = parse("_em_ and snake_case_name\n");
    let para = doc.root_children().next().unwrap();
    assert_eq!(doc.node(doc.children(para).next().unwrap()).kind, NodeKind::Emph);
    assert!(doc.text_content().contains("snake_case_name"));
}

#[test]
fn star_runs_do_not_open_emphasis() {
    let doc = parse("a ** b ** c\n");
    assert!(!has_kind(&doc, NodeKind::Strong));
    assert!(!has_kind(&doc, NodeKind::Emph));
}

#[test]
fn code_span_with_matching_ticks() {
    let doc = parse("`code`\n");
    let para = doc.root_children().next().unwrap();
    let code = doc.children(para).next().unwrap();
    assert_eq!(doc.node(code).kind, NodeKind::Code);
    assert_eq!(doc.node(code).text, "code");
}

#[test]
fn code_span_keeps_inner_ticks_and_trims_frame_spaces() {
    let doc = parse("`` a`b ``\n");
    let para = doc.root_children().next().unwrap();
    let code = doc.children(para).next().unwrap();
    assert_eq!(doc.node(code).kind, NodeKind::Code);
    assert_eq!(doc.node(code).text, "a`b");
}

#[test]
fn unclosed_ticks_stay_literal() {
    let doc = parse("a `b\n");
    assert!(!has_kind(&doc, NodeKind::Code));
    assert!(doc.text_content().contains('`'));
}

#[test]
fn explicit_link_with_title() {
    let doc = parse("[text](http://example.org \"the title\")\n");
    let link = find_kind(&doc, doc.root, NodeKind::Link).expect("link");
    let payload = doc.node(link).link.as_ref().expect("payload");
    assert_eq!(payload.url, "http://example.org");
    assert_eq!(payload.title, "the title");
    let label = payload.label.expect("label chain");
    assert_eq!(doc.arena.get(label).text, "text");
}

#[test]
fn reference_link_resolves_from_pass_one() {
    let doc = parse("[a]: http://x \"t\"\n\nsee [a]\n");
    assert_eq!(doc.references.len(), 1);
    assert_eq!(doc.references.entries()[0].url, "http://x");
    assert_eq!(doc.references.entries()[0].title, "t");
    // The definition itself is not part of the tree.
    assert_eq!(top_kinds(&doc), [NodeKind::Para]);
    let para = doc.root_children().next().unwrap();
    assert_eq!(
        child_kinds(&doc, para),
        [NodeKind::Str, NodeKind::Space, NodeKind::Link]
    );
    let link = doc.children(para).nth(2).unwrap();
    let payload = doc.node(link).link.as_ref().unwrap();
    assert_eq!(payload.url, "http://x");
    assert_eq!(payload.title, "t");
}

#[test]
fn reference_labels_match_case_insensitively() {
    let doc = parse("[Label]: http://x\n\n[lAbEl][]\n");
    let link = find_kind(&doc, doc.root, NodeKind::Link).expect("link");
    assert_eq!(doc.node(link).link.as_ref().unwrap().url, "http://x");
}

#[test]
fn duplicate_reference_labels_resolve_to_the_first() {
    let doc = parse("[d]: http://first\n\n[d]: http://second\n\n[d]\n");
    assert_eq!(doc.references.len(), 2);
    let link = find_kind(&doc, doc.root, NodeKind::Link).expect("link");
    assert_eq!(doc.node(link).link.as_ref().unwrap().url, "http://first");
}

#[test]
fn unresolved_reference_keeps_the_source_text() {
    let doc = parse("see [missing][nope]\n");
    assert!(!has_kind(&doc, NodeKind::Link));
    let text = doc.text_content();
    assert!(text.contains("[missing]"), "got {:?}", text);
    assert!(text.contains("[nope]"), "got {:?}", text);
}

#[test]
fn image_resolves_or_degrades() {
    let doc = parse("![alt](http://img)\n");
    let image = find_kind(&doc, doc.root, NodeKind::Image).expect("image");
    assert_eq!(doc.node(image).link.as_ref().unwrap().url, "http://img");

    let doc = parse("![alt][nope]\n");
    assert!(!has_kind(&doc, NodeKind::Image));
    assert!(doc.text_content().contains('!'));
}

#[test]
fn autolinks() {
    let doc = parse("<http://example.org/x>\n");
    let link = find_kind(&doc, doc.root, NodeKind::Link).expect("link");
    assert_eq!(doc.node(link).link.as_ref().unwrap().url, "http://example.org/x");

    let doc = parse("<someone@example.org>\n");
    let link = find_kind(&doc, doc.root, NodeKind::Link).expect("link");
    assert_eq!(
        doc.node(link).link.as_ref().unwrap().url,
        "mailto:someone@example.org"
    );
}

#[test]
fn escapes_produce_literal_strings() {
    let doc = parse("\\*not emphasis\\*\n");
    assert!(!has_kind(&doc, NodeKind::Emph));
    assert!(doc.text_content().contains("*not emphasis*"));
}

#[test]
fn entities_are_kept_verbatim_as_html() {
    for src in ["&amp;\n", "&#169;\n", "&#xA9;\n"] {
        let doc = parse(src);
        let html = find_kind(&doc, doc.root, NodeKind::Html).expect("entity node");
        assert_eq!(doc.node(html).text, src.trim_end());
    }
}

#[test]
fn tight_list_items_hold_plain_blocks() {
    let doc = parse("- one\n- two\n");
    assert_eq!(top_kinds(&doc), [NodeKind::BulletList]);
    let list = doc.root_children().next().unwrap();
    let items: Vec<_> = doc.children(list).collect();
    assert_eq!(items.len(), 2);
    for item in items {
        assert_eq!(doc.node(item).kind, NodeKind::ListItem);
        let inner = doc.children(item).next().expect("reparsed content");
        assert_eq!(doc.node(inner).kind, NodeKind::Plain);
    }
}

#[test]
fn loose_list_items_hold_paragraphs() {
    let doc = parse("- one\n\n- two\n");
    let list = doc.root_children().next().unwrap();
    assert_eq!(doc.node(list).kind, NodeKind::BulletList);
    for item in doc.children(list) {
        let inner = doc.children(item).next().expect("reparsed content");
        assert_eq!(doc.node(inner).kind, NodeKind::Para);
    }
}

#[test]
fn ordered_lists_use_enumerators() {
    let doc = parse("1. first\n2. second\n");
    assert_eq!(top_kinds(&doc), [NodeKind::OrderedList]);
}

#[test]
fn list_continuation_without_blank_uses_the_block_separator() {
    // The indented continuation opens a nested block inside the item.
    let doc = parse("- outer\n    - inner\n");
    let outer = doc.root_children().next().unwrap();
    assert_eq!(doc.node(outer).kind, NodeKind::BulletList);
    let item = doc.children(outer).next().unwrap();
    assert!(find_kind(&doc, item, NodeKind::BulletList).is_some());
}

#[test]
fn blockquote_content_is_reparsed_as_blocks() {
    let doc = parse("> quoted text\n");
    assert_eq!(top_kinds(&doc), [NodeKind::BlockQuote]);
    let quote = doc.root_children().next().unwrap();
    let inner = doc.children(quote).next().expect("reparsed content");
    assert_eq!(doc.node(inner).kind, NodeKind::Para);
    assert!(doc.text_content().contains("quoted text"));
}

#[test]
fn verbatim_collects_indented_lines() {
    let doc = parse("    fn main() {}\n    done\n");
    assert_eq!(top_kinds(&doc), [NodeKind::Verbatim]);
    let verbatim = doc.root_children().next().unwrap();
    assert!(doc.node(verbatim).text.starts_with("fn main() {}\n"));
    assert!(doc.node(verbatim).text.contains("done"));
}

#[test]
fn horizontal_rules() {
    for src in ["---\n\n", "* * *\n\n", "___\n\n"] {
        let doc = parse(src);
        assert_eq!(top_kinds(&doc), [NodeKind::HRule], "for {:?}", src);
    }
}

#[test]
fn plain_block_when_no_trailing_blank_inside_item() {
    let doc = parse("some text");
    assert_eq!(top_kinds(&doc), [NodeKind::Para]);
}

#[test]
fn empty_and_blank_inputs_yield_an_empty_list() {
    for src in ["", "\n", "   \n\n  \n"] {
        let doc = parse(src);
        assert_eq!(doc.node(doc.root).kind, NodeKind::List);
        assert_eq!(doc.root_children().count(), 0, "for {:?}", src);
    }
}

#[test]
fn html_block_requires_literal_case() {
    let doc = parse("<div>\nfoo\n</div>\n\nafter\n");
    assert_eq!(top_kinds(&doc), [NodeKind::HtmlBlock, NodeKind::Para]);

    let doc = parse("<DIV>\nfoo\n</DIV>\n\nafter\n");
    assert_eq!(top_kinds(&doc), [NodeKind::HtmlBlock, NodeKind::Para]);

    // Mixed case is not a block; the tags come through as inline HTML.
    let doc = parse("<Div>\nfoo\n</Div>\n\nafter\n");
    assert_eq!(doc.node(doc.root_children().next().unwrap()).kind, NodeKind::Para);
    assert!(has_kind(&doc, NodeKind::Html));
}

#[test]
fn html_comment_is_a_block_when_followed_by_blank() {
    let doc = parse("<!-- note -->\n\ntext\n");
    assert_eq!(top_kinds(&doc), [NodeKind::HtmlBlock, NodeKind::Para]);
}

#[test]
fn filter_html_strips_blocks_and_inline_tags() {
    let ext = Extensions::none().filter_html(true);
    let doc = parse_ext("<div>\nx\n</div>\n", ext);
    assert_eq!(doc.root_children().count(), 0);

    let doc = parse_ext("a <b>bold</b> word\n", ext);
    assert!(!has_kind(&doc, NodeKind::Html));
    assert!(doc.text_content().contains("bold"));
}

#[test]
fn filter_styles_strips_style_blocks() {
    let ext = Extensions::none().filter_styles(true);
    let doc = parse_ext("<style>p { color: red }</style>\n", ext);
    assert_eq!(doc.root_children().count(), 0);

    let doc = parse_ext("<style>p { color: red }</style>\n", Extensions::none());
    assert_eq!(top_kinds(&doc), [NodeKind::HtmlBlock]);
}

#[test]
fn smart_punctuation_is_gated() {
    let smart = Extensions::none().smart(true);
    let doc = parse_ext("wait... -- 1-2 'q' \"d\"\n", smart);
    assert!(has_kind(&doc, NodeKind::Ellipsis));
    assert!(has_kind(&doc, NodeKind::Emdash));
    assert!(has_kind(&doc, NodeKind::Endash));
    assert!(has_kind(&doc, NodeKind::SingleQuoted));
    assert!(has_kind(&doc, NodeKind::DoubleQuoted));

    let doc = parse("wait... -- 1-2 'q' \"d\"\n");
    for kind in [
        NodeKind::Ellipsis,
        NodeKind::Emdash,
        NodeKind::Endash,
        NodeKind::SingleQuoted,
        NodeKind::DoubleQuoted,
    ] {
        assert!(!has_kind(&doc, kind), "{:?} without the extension", kind);
    }
}

#[test]
fn apostrophes_in_words_under_smart() {
    let smart = Extensions::none().smart(true);
    let doc = parse_ext("it's fine\n", smart);
    assert!(has_kind(&doc, NodeKind::Apostrophe));
}

#[test]
fn strike_is_gated() {
    let strike = Extensions::none().strike(true);
    let doc = parse_ext("~~gone~~\n", strike);
    let node = find_kind(&doc, doc.root, NodeKind::Strike).expect("strike");
    let inner = doc.children(node).next().unwrap();
    assert_eq!(doc.node(inner).text, "gone");

    let doc = parse("~~gone~~\n");
    assert!(!has_kind(&doc, NodeKind::Strike));
}

#[test]
fn footnote_reference_clones_the_definition() {
    let notes = Extensions::none().notes(true);
    let doc = parse_ext("x[^1]\n\n[^1]: note\n", notes);
    assert_eq!(doc.notes.len(), 1);
    assert_eq!(doc.notes.entries()[0].key, "1");
    assert_eq!(top_kinds(&doc), [NodeKind::Para]);
    let para = doc.root_children().next().unwrap();
    let note = find_kind(&doc, para, NodeKind::Note).expect("note node");
    let mut body = String::new();
    collect(&doc, note, &mut body);
    assert!(body.contains("note"), "got {:?}", body);
}

fn collect(doc: &Document, id: NodeId, out: &mut String) {
    for child in doc.children(id) {
        out.push_str(&doc.node(child).text);
        collect(doc, child, out);
    }
}

#[test]
fn unmatched_footnote_reference_stays_literal() {
    let notes = Extensions::none().notes(true);
    let doc = parse_ext("x[^nope]\n", notes);
    assert!(!has_kind(&doc, NodeKind::Note));
    assert!(doc.text_content().contains("[^nope]"));
}

#[test]
fn inline_notes() {
    let notes = Extensions::none().notes(true);
    let doc = parse_ext("fact^[source]\n", notes);
    let note = find_kind(&doc, doc.root, NodeKind::Note).expect("inline note");
    let inner = doc.children(note).next().unwrap();
    assert_eq!(doc.node(inner).text, "source");
}

#[test]
fn footnote_syntax_is_inert_without_the_extension() {
    let doc = parse("x[^1]\n\n[^1]: note\n");
    assert!(!has_kind(&doc, NodeKind::Note));
    assert!(doc.notes.is_empty());
}

#[test]
fn definition_lists_retag_items_to_defdata() {
    let dlists = Extensions::none().dlists(true);
    let doc = parse_ext("term\n: definition\n", dlists);
    assert_eq!(top_kinds(&doc), [NodeKind::DefinitionList]);
    assert!(has_kind(&doc, NodeKind::DefTitle));
    assert!(has_kind(&doc, NodeKind::DefData));
    assert!(!has_kind(&doc, NodeKind::ListItem));

    let doc = parse("term\n: definition\n");
    assert!(!has_kind(&doc, NodeKind::DefinitionList));
}

#[test]
fn parse_block_returns_the_first_block_only() {
    let doc = Parser::with_defaults("# Title\n\nrest\n")
        .parse_block()
        .expect("parse");
    assert_eq!(top_kinds(&doc), [NodeKind::H1]);
}

#[test]
fn crlf_and_cr_line_endings_are_accepted() {
    for src in ["# T\r\n\r\npara\r\n", "# T\rpara\r"] {
        let doc = parse(src);
        assert_eq!(doc.node(doc.root_children().next().unwrap()).kind, NodeKind::H1);
    }
}

#[test]
fn every_reachable_node_belongs_to_the_arena() {
    let notes = Extensions::all();
    let doc = parse_ext(
        "# H\n\n[a]: http://x\n\n- item\n\n> quote\n\nx[^1] and [a]\n\n[^1]: body\n",
        notes,
    );
    fn walk(doc: &Document, id: NodeId) {
        assert!(doc.arena.contains(id));
        if let Some(link) = &doc.node(id).link {
            if let Some(label) = link.label {
                walk(doc, label);
            }
        }
        for child in doc.children(id) {
            walk(doc, child);
        }
    }
    walk(&doc, doc.root);
    for entry in doc.references.entries() {
        if let Some(label) = entry.label {
            walk(&doc, label);
        }
    }
    for entry in doc.notes.entries() {
        let mut cur = entry.body;
        while let Some(id) = cur {
            walk(&doc, id);
            cur = doc.node(id).next;
        }
    }
}

#[test]
fn text_recovery_keeps_non_markup_bytes() {
    let doc = parse("alpha *beta* `gamma` [delta](http://x)\n");
    let text = doc.text_content();
    for word in ["alpha", "beta", "gamma", "delta"] {
        assert!(text.contains(word), "missing {:?} in {:?}", word, text);
    }
}
