// ABOUTME: Inline Markdown scanner for emphasis, underline, code, links and images
// ABOUTME: Tokenizes left to right, then nests marks with a recursive-descent pass

use crate::node::{push_text, Element, RichNode, Tag};

/// Parses one line of inline Markdown into rich-text nodes.
///
/// Recognized: `**strong**`, `*em*`, `__underline__`, `` `code` ``,
/// `![alt](src)` and `[text](href)`. Anything unmatched stays literal text.
pub fn parse_inline(s: &str) -> Vec<RichNode> {
    let tokens = tokenize(s);
    let mut out = Vec::new();
    build(&tokens, &mut out);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Strong,
    Emphasis,
    Underline,
}

impl Mark {
    fn tag(self) -> Tag {
        match self {
            Mark::Strong => Tag::Bold,
            Mark::Emphasis => Tag::Italic,
            Mark::Underline => Tag::Underline,
        }
    }

    fn literal(self) -> &'static str {
        match self {
            Mark::Strong => "**",
            Mark::Emphasis => "*",
            Mark::Underline => "__",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Text(String),
    Delim(Mark),
    Code(String),
    Image { alt: String, src: String },
    LinkOpen,
    LinkClose { href: String },
}

/// Byte cursor over a line. Every construct starts and ends on an ASCII
/// byte, so slicing at recorded positions stays on char boundaries.
#[derive(Clone)]
struct Cursor<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    fn starts_with(&self, pat: &[u8]) -> bool {
        self.s.as_bytes()[self.i..].starts_with(pat)
    }

    /// First occurrence of `pat` in `[from, limit)`.
    fn find(&self, pat: &[u8], from: usize, limit: usize) -> Option<usize> {
        let bytes = self.s.as_bytes().get(from..limit)?;
        bytes
            .windows(pat.len())
            .position(|w| w == pat)
            .map(|pos| from + pos)
    }
}

/// A link whose text is still being scanned.
struct PendingLink {
    close_at: usize,
    href: String,
    resume_at: usize,
}

/// Bracketed target `[text](target)` starting at `open`: returns the
/// position of `]`, the target and the position after `)`.
fn bracket_target(cur: &Cursor<'_>, open: usize, limit: usize) -> Option<(usize, String, usize)> {
    let close = cur.find(b"](", open, limit)?;
    let paren = cur.find(b")", close + 2, limit)?;
    Some((close, cur.s[close + 2..paren].to_string(), paren + 1))
}

/// Link counterpart of [`bracket_target`]. Whole `![alt](src)` spans inside
/// the link text are stepped over, so a linked image closes on the outer `](`.
fn link_target(cur: &Cursor<'_>, open: usize, limit: usize) -> Option<(usize, String, usize)> {
    let bytes = cur.s.as_bytes();
    let mut j = open;
    while j + 1 < limit {
        if bytes[j] == b'!' && bytes[j + 1] == b'[' {
            if let Some((_, _, after)) = bracket_target(cur, j + 2, limit) {
                j = after;
                continue;
            }
        }
        if bytes[j] == b']' && bytes[j + 1] == b'(' {
            let paren = cur.find(b")", j + 2, limit)?;
            return Some((j, cur.s[j + 2..paren].to_string(), paren + 1));
        }
        j += 1;
    }
    None
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut cur = Cursor::new(s);
    let mut tokens = Vec::new();
    let mut pending: Vec<PendingLink> = Vec::new();
    let mut text_start = 0;

    fn flush_text(tokens: &mut Vec<Token>, s: &str, start: usize, end: usize) {
        if end > start {
            tokens.push(Token::Text(s[start..end].to_string()));
        }
    }

    while !cur.eof() {
        let limit = pending.last().map_or(s.len(), |link| link.close_at);

        if cur.i == limit {
            if let Some(link) = pending.pop() {
                flush_text(&mut tokens, s, text_start, cur.i);
                tokens.push(Token::LinkClose { href: link.href });
                cur.i = link.resume_at;
                text_start = cur.i;
            }
            continue;
        }

        match cur.peek() {
            Some(b'`') => {
                if let Some(end) = cur.find(b"`", cur.i + 1, limit) {
                    if end > cur.i + 1 {
                        flush_text(&mut tokens, s, text_start, cur.i);
                        tokens.push(Token::Code(s[cur.i + 1..end].to_string()));
                        cur.i = end + 1;
                        text_start = cur.i;
                        continue;
                    }
                }
            }
            Some(b'!') if cur.starts_with(b"![") => {
                if let Some((close, src, after)) = bracket_target(&cur, cur.i + 2, limit) {
                    flush_text(&mut tokens, s, text_start, cur.i);
                    tokens.push(Token::Image {
                        alt: s[cur.i + 2..close].to_string(),
                        src,
                    });
                    cur.i = after;
                    text_start = cur.i;
                    continue;
                }
            }
            Some(b'[') => {
                if let Some((close, href, after)) = link_target(&cur, cur.i + 1, limit) {
                    flush_text(&mut tokens, s, text_start, cur.i);
                    tokens.push(Token::LinkOpen);
                    pending.push(PendingLink {
                        close_at: close,
                        href,
                        resume_at: after,
                    });
                    cur.i += 1;
                    text_start = cur.i;
                    continue;
                }
            }
            Some(b'*') | Some(b'_') => {
                let mark = if cur.starts_with(b"**") {
                    Some(Mark::Strong)
                } else if cur.starts_with(b"__") {
                    Some(Mark::Underline)
                } else if cur.peek() == Some(b'*') {
                    Some(Mark::Emphasis)
                } else {
                    None
                };
                if let Some(mark) = mark {
                    flush_text(&mut tokens, s, text_start, cur.i);
                    tokens.push(Token::Delim(mark));
                    cur.i += mark.literal().len();
                    text_start = cur.i;
                    continue;
                }
            }
            _ => {}
        }
        cur.i += 1;
    }

    flush_text(&mut tokens, s, text_start, s.len());
    tokens
}

fn build(tokens: &[Token], out: &mut Vec<RichNode>) {
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Text(text) => push_text(out, text),
            Token::Code(code) => out.push(RichNode::element(Tag::Code, vec![RichNode::text(code)])),
            Token::Image { alt, src } => out.push(
                Element::new(Tag::Image)
                    .with_attr("src", src)
                    .with_attr("alt", alt)
                    .into(),
            ),
            Token::LinkOpen => {
                if let Some(close) = matching_link_close(tokens, i) {
                    let href = match &tokens[close] {
                        Token::LinkClose { href } => href.as_str(),
                        _ => "",
                    };
                    let mut children = Vec::new();
                    build(&tokens[i + 1..close], &mut children);
                    out.push(
                        Element::new(Tag::Anchor)
                            .with_attr("href", href)
                            .with_attr("target", "_blank")
                            .with_attr("rel", "noopener noreferrer")
                            .with_children(children)
                            .into(),
                    );
                    i = close + 1;
                    continue;
                }
                push_text(out, "[");
            }
            Token::LinkClose { href } => push_text(out, &format!("]({})", href)),
            Token::Delim(mark) => {
                if let Some(close) = closing_delim(tokens, i, *mark) {
                    let mut children = Vec::new();
                    build(&tokens[i + 1..close], &mut children);
                    out.push(RichNode::element(mark.tag(), children));
                    i = close + 1;
                    continue;
                }
                push_text(out, mark.literal());
            }
        }
        i += 1;
    }
}

fn matching_link_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (j, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LinkOpen => depth += 1,
            Token::LinkClose { .. } => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

/// Next delimiter of the same kind at the same link depth, with at least one
/// token in between. Marks never cross a link boundary.
fn closing_delim(tokens: &[Token], open: usize, mark: Mark) -> Option<usize> {
    let mut j = open + 1;
    while j < tokens.len() {
        match &tokens[j] {
            Token::LinkOpen => j = matching_link_close(tokens, j)?,
            Token::LinkClose { .. } => return None,
            Token::Delim(other) if *other == mark && j > open + 1 => return Some(j),
            _ => {}
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RichNode {
        RichNode::text(s)
    }

    fn el(tag: Tag, children: Vec<RichNode>) -> RichNode {
        RichNode::element(tag, children)
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse_inline("just words"), vec![text("just words")]);
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_bold_italic_underline_code() {
        assert_eq!(
            parse_inline("**b** *i* __u__ `c`"),
            vec![
                el(Tag::Bold, vec![text("b")]),
                text(" "),
                el(Tag::Italic, vec![text("i")]),
                text(" "),
                el(Tag::Underline, vec![text("u")]),
                text(" "),
                el(Tag::Code, vec![text("c")]),
            ]
        );
    }

    #[test]
    fn test_italic_nested_in_bold() {
        assert_eq!(
            parse_inline("**a*b*c**"),
            vec![el(
                Tag::Bold,
                vec![text("a"), el(Tag::Italic, vec![text("b")]), text("c")]
            )]
        );
    }

    #[test]
    fn test_single_star_never_matches_double() {
        assert_eq!(parse_inline("*a**"), vec![text("*a**")]);
        assert_eq!(parse_inline("****"), vec![text("****")]);
    }

    #[test]
    fn test_single_underscore_is_literal() {
        assert_eq!(parse_inline("snake_case_name"), vec![text("snake_case_name")]);
    }

    #[test]
    fn test_code_span_is_raw() {
        assert_eq!(
            parse_inline("`**not bold**`"),
            vec![el(Tag::Code, vec![text("**not bold**")])]
        );
        assert_eq!(parse_inline("a ` b"), vec![text("a ` b")]);
        assert_eq!(parse_inline("``"), vec![text("``")]);
    }

    #[test]
    fn test_image_before_link() {
        let nodes = parse_inline("![cat](cat.png)");
        assert_eq!(
            nodes,
            vec![Element::new(Tag::Image)
                .with_attr("src", "cat.png")
                .with_attr("alt", "cat")
                .into()]
        );
    }

    #[test]
    fn test_linked_image() {
        let nodes = parse_inline("[![alt](pic.png)](https://x.y)");
        assert_eq!(nodes.len(), 1);
        let link = nodes[0].as_element().unwrap();
        assert_eq!(link.tag, Tag::Anchor);
        assert_eq!(link.attr("href"), Some("https://x.y"));
        assert_eq!(
            link.children,
            vec![Element::new(Tag::Image)
                .with_attr("src", "pic.png")
                .with_attr("alt", "alt")
                .into()]
        );
    }

    #[test]
    fn test_image_beside_link_text() {
        let nodes = parse_inline("[logo ![l](l.svg) home](/)");
        let link = nodes[0].as_element().unwrap();
        assert_eq!(link.attr("href"), Some("/"));
        assert_eq!(link.children.len(), 3);
        assert_eq!(link.children[0], text("logo "));
        assert_eq!(link.children[1].tag(), Some(Tag::Image));
        assert_eq!(link.children[2], text(" home"));
    }

    #[test]
    fn test_link_opens_in_new_tab() {
        let nodes = parse_inline("see [docs](https://example.com) now");
        assert_eq!(nodes.len(), 3);
        let link = nodes[1].as_element().unwrap();
        assert_eq!(link.tag, Tag::Anchor);
        assert_eq!(link.attr("href"), Some("https://example.com"));
        assert_eq!(link.attr("target"), Some("_blank"));
        assert_eq!(link.children, vec![text("docs")]);
        assert_eq!(nodes[2], text(" now"));
    }

    #[test]
    fn test_marks_inside_link_text() {
        let nodes = parse_inline("[**bold** link](u)");
        let link = nodes[0].as_element().unwrap();
        assert_eq!(
            link.children,
            vec![el(Tag::Bold, vec![text("bold")]), text(" link")]
        );
    }

    #[test]
    fn test_mark_does_not_cross_link_boundary() {
        let nodes = parse_inline("[a *b](u) c*");
        let link = nodes[0].as_element().unwrap();
        assert_eq!(link.children, vec![text("a *b")]);
        assert_eq!(nodes[1], text(" c*"));
    }

    #[test]
    fn test_bold_spanning_link() {
        let nodes = parse_inline("**a [b](u) c**");
        let bold = nodes[0].as_element().unwrap();
        assert_eq!(bold.tag, Tag::Bold);
        assert_eq!(bold.children.len(), 3);
        assert_eq!(bold.children[1].tag(), Some(Tag::Anchor));
    }

    #[test]
    fn test_unclosed_link_is_literal() {
        assert_eq!(parse_inline("[not a link"), vec![text("[not a link")]);
        assert_eq!(parse_inline("[text](no close"), vec![text("[text](no close")]);
    }

    #[test]
    fn test_multibyte_text_survives() {
        assert_eq!(
            parse_inline("héllo **wörld** ✓"),
            vec![
                text("héllo "),
                el(Tag::Bold, vec![text("wörld")]),
                text(" ✓")
            ]
        );
    }
}
