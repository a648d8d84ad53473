// ABOUTME: Parses line-oriented Markdown into directional rich-text blocks
// ABOUTME: Classifies each line in priority order and accumulates list items

use crate::inline::parse_inline;
use crate::node::{Element, RichNode, Tag, DIR_ATTR, DIR_AUTO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    fn tag(self) -> Tag {
        match self {
            ListKind::Ordered => Tag::OrderedList,
            ListKind::Unordered => Tag::UnorderedList,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Heading(u8, &'a str),
    Quote(&'a str),
    Rule,
    Checkbox(bool, &'a str),
    Item(ListKind, &'a str),
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }

    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if (1..=6).contains(&hashes) {
        let rest = &line[hashes..];
        if rest.starts_with(|c: char| c == ' ' || c == '\t') && !rest.trim().is_empty() {
            return Line::Heading(hashes as u8, rest.trim());
        }
    }

    if let Some(rest) = line.strip_prefix('>') {
        return Line::Quote(rest.strip_prefix(' ').unwrap_or(rest));
    }

    if line.trim_end() == "---" {
        return Line::Rule;
    }

    if let Some(rest) = line.strip_prefix("[ ] ") {
        return Line::Checkbox(false, rest);
    }
    if let Some(rest) = line
        .strip_prefix("[x] ")
        .or_else(|| line.strip_prefix("[X] "))
    {
        return Line::Checkbox(true, rest);
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Line::Item(ListKind::Ordered, rest);
        }
    }

    if let Some(rest) = line.strip_prefix("- ") {
        return Line::Item(ListKind::Unordered, rest);
    }

    Line::Text(line)
}

fn directional(tag: Tag, children: Vec<RichNode>) -> RichNode {
    Element::new(tag)
        .with_attr(DIR_ATTR, DIR_AUTO)
        .with_children(children)
        .into()
}

fn checkbox(checked: bool) -> RichNode {
    let input = Element::new(Tag::Checkbox).with_attr("type", "checkbox");
    if checked {
        input.with_attr("checked", "").into()
    } else {
        input.into()
    }
}

#[derive(Debug)]
struct OpenList {
    kind: ListKind,
    items: Vec<RichNode>,
}

/// Transient state for one parse pass: finished blocks plus the list being
/// accumulated.
#[derive(Debug, Default)]
struct ParseContext {
    blocks: Vec<RichNode>,
    open: Option<OpenList>,
}

impl ParseContext {
    fn flush(&mut self) {
        if let Some(list) = self.open.take() {
            self.blocks.push(directional(list.kind.tag(), list.items));
        }
    }

    fn push_block(&mut self, block: RichNode) {
        self.flush();
        self.blocks.push(block);
    }

    fn push_item(&mut self, kind: ListKind, item: RichNode) {
        if self.open.as_ref().is_some_and(|list| list.kind != kind) {
            self.flush();
        }
        self.open
            .get_or_insert_with(|| OpenList {
                kind,
                items: Vec::new(),
            })
            .items
            .push(item);
    }

    fn finish(mut self) -> Vec<RichNode> {
        self.flush();
        self.blocks
    }
}

/// Parses Markdown source into a forest of directional blocks.
///
/// Every non-blank line becomes exactly one top-level block or list item.
/// A blank line becomes an empty placeholder block. Consecutive `>` lines
/// stay separate blockquotes.
pub fn parse_markdown(source: &str) -> Vec<RichNode> {
    let mut ctx = ParseContext::default();

    for line in source.lines() {
        match classify(line) {
            Line::Blank => ctx.push_block(directional(
                Tag::Block,
                vec![Element::new(Tag::LineBreak).into()],
            )),
            Line::Heading(level, content) => {
                let tag = Tag::heading(level).unwrap_or(Tag::Heading(6));
                ctx.push_block(directional(tag, parse_inline(content)));
            }
            Line::Quote(content) => {
                ctx.push_block(directional(Tag::Blockquote, parse_inline(content)))
            }
            Line::Rule => ctx.push_block(directional(Tag::Rule, Vec::new())),
            Line::Checkbox(checked, content) => {
                let mut children = vec![checkbox(checked)];
                children.extend(parse_inline(content));
                ctx.push_block(directional(Tag::Block, children));
            }
            Line::Item(kind, content) => {
                ctx.push_item(kind, directional(Tag::ListItem, parse_inline(content)))
            }
            Line::Text(content) => ctx.push_block(directional(Tag::Block, parse_inline(content))),
        }
    }

    ctx.finish()
}
