//! Leaf-level token scanners.
//!
//! Small byte recognisers the grammar treats as atoms: entities, HTML
//! comments and tags, quoted attribute values, autolink bodies. Each public
//! function reports how many bytes of the given prefix matched, which the
//! engine turns into cursor movement.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::char;
use nom::combinator::{opt, recognize};
use nom::multi::many0;
use nom::sequence::tuple;
use nom::IResult;

type Span<'a> = IResult<&'a [u8], &'a [u8]>;

fn matched_len(result: Span<'_>) -> Option<usize> {
    result.ok().map(|(_, m)| m.len())
}

fn is_sp(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn is_alnum_ascii(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

fn is_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

/// `Sp (Newline Sp)?` inside a tag: spaces with at most one line break.
fn spnl(i: &[u8]) -> Span<'_> {
    recognize(tuple((
        take_while(is_sp),
        opt(tuple((
            alt((tag("\r\n"), tag("\n"), tag("\r"))),
            take_while(is_sp),
        ))),
    )))(i)
}

/// `'&' '#' [Xx] [0-9a-fA-F]+ ';'`
pub(crate) fn hex_entity(i: &[u8]) -> Option<usize> {
    matched_len(recognize(tuple((
        tag("&#"),
        alt((char('x'), char('X'))),
        take_while1(is_hex),
        char(';'),
    )))(i))
}

/// `'&' '#' [0-9]+ ';'`
pub(crate) fn dec_entity(i: &[u8]) -> Option<usize> {
    matched_len(recognize(tuple((
        tag("&#"),
        take_while1(|b: u8| b.is_ascii_digit()),
        char(';'),
    )))(i))
}

/// `'&' [A-Za-z0-9]+ ';'`
pub(crate) fn char_entity(i: &[u8]) -> Option<usize> {
    matched_len(recognize(tuple((
        char('&'),
        take_while1(is_alnum_ascii),
        char(';'),
    )))(i))
}

/// `"<!--" (!"-->" .)* "-->"`
pub(crate) fn html_comment(i: &[u8]) -> Option<usize> {
    matched_len(recognize(tuple((
        tag("<!--"),
        take_until("-->"),
        tag("-->"),
    )))(i))
}

/// `'"' (!'"' .)* '"' | '\'' (!'\'' .)* '\''`
fn quoted(i: &[u8]) -> Span<'_> {
    recognize(alt((
        tuple((char('"'), take_while(|b| b != b'"'), char('"'))),
        tuple((char('\''), take_while(|b| b != b'\''), char('\''))),
    )))(i)
}

/// `(AlphanumericAscii | '-')+ Spnl ('=' Spnl (Quoted | (!'>' Nonspacechar)+))? Spnl`
fn html_attribute(i: &[u8]) -> Span<'_> {
    recognize(tuple((
        take_while1(|b: u8| is_alnum_ascii(b) || b == b'-'),
        spnl,
        opt(tuple((
            char('='),
            spnl,
            alt((
                quoted,
                take_while1(|b: u8| b != b'>' && !is_sp(b) && b != b'\n' && b != b'\r'),
            )),
        ))),
        spnl,
    )))(i)
}

/// Attribute run after a tag name.
pub(crate) fn html_attributes(i: &[u8]) -> Option<usize> {
    matched_len(recognize(many0(html_attribute))(i))
}

/// Generic inline tag: `'<' Spnl '/'? AlphanumericAscii+ Spnl
/// HtmlAttribute* '/'? Spnl '>'`
pub(crate) fn html_tag(i: &[u8]) -> Option<usize> {
    matched_len(recognize(tuple((
        char('<'),
        spnl,
        opt(char('/')),
        take_while1(is_alnum_ascii),
        spnl,
        many0(html_attribute),
        opt(char('/')),
        spnl,
        char('>'),
    )))(i))
}

/// Autolink body after `<`: `[A-Za-z]+ "://" (!Newline !'>' .)+`
pub(crate) fn autolink_url(i: &[u8]) -> Option<usize> {
    matched_len(recognize(tuple((
        take_while1(|b: u8| b.is_ascii_alphabetic()),
        tag("://"),
        take_while1(|b: u8| b != b'\n' && b != b'\r' && b != b'>'),
    )))(i))
}

fn is_email_local(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'+' | b'_' | b'.' | b'/' | b'!' | b'%' | b'~' | b'$')
}

/// Autolink body after `<` / `<mailto:`: `[-A-Za-z0-9+_./!%~$]+ '@'
/// (!Newline !'>' .)+`
pub(crate) fn autolink_email(i: &[u8]) -> Option<usize> {
    matched_len(recognize(tuple((
        take_while1(is_email_local),
        char('@'),
        take_while1(|b: u8| b != b'\n' && b != b'\r' && b != b'>'),
    )))(i))
}
