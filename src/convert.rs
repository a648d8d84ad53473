// ABOUTME: Converts rich-text trees into canonical Markdown text
// ABOUTME: Post-order walk with per-pass list numbering and newline normalization

use crate::node::{Element, RichNode, Tag};

/// Transient state threaded through one serialization pass.
#[derive(Debug, Default)]
struct ConvertContext {
    list: Option<ListScope>,
}

#[derive(Debug, Clone, Copy)]
enum ListScope {
    Ordered { next: usize },
    Unordered,
}

/// Serializes a rich-text forest into Markdown.
///
/// Text is emitted verbatim, so Markdown metacharacters in prose are not
/// escaped. Attributes without a Markdown equivalent (such as the direction
/// hint) are dropped.
pub fn to_markdown(nodes: &[RichNode]) -> String {
    let mut ctx = ConvertContext::default();
    let mut out = String::new();

    for node in nodes {
        let rendered = serialize_node(node, &mut ctx);
        match node.tag() {
            Some(tag) if tag.is_block() => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&rendered);
                if !tag.is_list() {
                    out.push('\n');
                }
            }
            _ => out.push_str(&rendered),
        }
    }

    collapse_newlines(&out).trim().to_string()
}

fn serialize_node(node: &RichNode, ctx: &mut ConvertContext) -> String {
    match node {
        RichNode::Text(text) => text.clone(),
        RichNode::Element(el) => serialize_element(el, ctx),
    }
}

fn serialize_children(children: &[RichNode], ctx: &mut ConvertContext) -> String {
    children
        .iter()
        .map(|child| serialize_node(child, ctx))
        .collect()
}

fn serialize_element(el: &Element, ctx: &mut ConvertContext) -> String {
    match el.tag {
        Tag::Heading(level) => {
            let level = usize::from(level.clamp(1, 6));
            format!("{} {}", "#".repeat(level), serialize_children(&el.children, ctx))
        }
        Tag::Paragraph => format!("{}\n", serialize_children(&el.children, ctx)),
        Tag::Blockquote => format!("> {}", serialize_children(&el.children, ctx)),
        Tag::Bold => format!("**{}**", serialize_children(&el.children, ctx)),
        Tag::Italic => format!("*{}*", serialize_children(&el.children, ctx)),
        Tag::Underline => format!("__{}__", serialize_children(&el.children, ctx)),
        Tag::Code => format!("`{}`", serialize_children(&el.children, ctx)),
        Tag::Anchor => format!(
            "[{}]({})",
            serialize_children(&el.children, ctx),
            el.attr("href").unwrap_or("")
        ),
        Tag::Image => format!(
            "![{}]({})",
            el.attr("alt").unwrap_or(""),
            el.attr("src").unwrap_or("")
        ),
        Tag::Rule => "---".to_string(),
        Tag::OrderedList => serialize_list(el, ListScope::Ordered { next: 1 }, ctx),
        Tag::UnorderedList => serialize_list(el, ListScope::Unordered, ctx),
        Tag::ListItem => serialize_list_item(el, ctx),
        Tag::Block => match single_checkbox(el) {
            Some(checked) => {
                let mark = if checked { "[x]" } else { "[ ]" };
                format!("{} {}", mark, el.text_content().trim())
            }
            None => serialize_children(&el.children, ctx),
        },
        Tag::LineBreak | Tag::Checkbox => String::new(),
    }
}

/// Each list opens its own numbering scope for its direct items; the
/// enclosing scope is restored afterwards so nested lists never leak counters.
fn serialize_list(el: &Element, scope: ListScope, ctx: &mut ConvertContext) -> String {
    let outer = ctx.list.replace(scope);
    let body: String = el
        .children
        .iter()
        .filter(|child| !child.is_blank_text())
        .map(|child| serialize_node(child, ctx))
        .collect();
    ctx.list = outer;

    format!("\n{}\n", body.trim())
}

fn serialize_list_item(el: &Element, ctx: &mut ConvertContext) -> String {
    let marker = match ctx.list.as_mut() {
        Some(ListScope::Ordered { next }) => {
            let marker = format!("{}. ", next);
            *next += 1;
            marker
        }
        Some(ListScope::Unordered) | None => "- ".to_string(),
    };

    let content = serialize_children(&el.children, ctx);
    let indent = " ".repeat(marker.len());
    let content = content.trim().replace('\n', &format!("\n{}", indent));

    format!("{}{}\n", marker, content)
}

/// `Some(checked)` when the block holds exactly one checkbox descendant.
fn single_checkbox(el: &Element) -> Option<bool> {
    if el.count_tag(Tag::Checkbox) != 1 {
        return None;
    }
    find_checkbox(&el.children).map(Element::is_checked)
}

fn find_checkbox(children: &[RichNode]) -> Option<&Element> {
    children.iter().find_map(|child| {
        let el = child.as_element()?;
        if el.tag == Tag::Checkbox {
            Some(el)
        } else {
            find_checkbox(&el.children)
        }
    })
}

/// Collapses runs of three or more newlines to exactly two.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run > 2 {
                continue;
            }
        } else {
            run = 0;
        }
        out.push(c);
    }
    out
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

    fn item(s: &str) -> RichNode {
        el(Tag::ListItem, vec![text(s)])
    }

    fn checkbox(checked: bool) -> RichNode {
        let input = Element::new(Tag::Checkbox).with_attr("type", "checkbox");
        if checked {
            input.with_attr("checked", "").into()
        } else {
            input.into()
        }
    }

    #[test]
    fn test_empty_forest() {
        assert_eq!(to_markdown(&[]), "");
    }

    #[test]
    fn test_headings_all_levels() {
        for level in 1..=6u8 {
            let nodes = vec![el(Tag::Heading(level), vec![text("Title")])];
            let expected = format!("{} Title", "#".repeat(level as usize));
            assert_eq!(to_markdown(&nodes), expected);
        }
    }

    #[test]
    fn test_inline_marks() {
        let nodes = vec![el(
            Tag::Paragraph,
            vec![
                el(Tag::Bold, vec![text("b")]),
                text(" "),
                el(Tag::Italic, vec![text("i")]),
                text(" "),
                el(Tag::Underline, vec![text("u")]),
                text(" "),
                el(Tag::Code, vec![text("c")]),
            ],
        )];
        assert_eq!(to_markdown(&nodes), "**b** *i* __u__ `c`");
    }

    #[test]
    fn test_anchor_and_image_defaults() {
        let link = Element::new(Tag::Anchor)
            .with_attr("href", "https://example.com")
            .with_children(vec![text("site")]);
        let nodes = vec![el(
            Tag::Block,
            vec![
                link.into(),
                text(" "),
                el(Tag::Anchor, vec![text("bare")]),
                text(" "),
                Element::new(Tag::Image).with_attr("src", "a.png").into(),
            ],
        )];
        assert_eq!(
            to_markdown(&nodes),
            "[site](https://example.com) [bare]() ![](a.png)"
        );
    }

    #[test]
    fn test_paragraphs_separated_by_blank_line() {
        let nodes = vec![
            el(Tag::Paragraph, vec![text("one")]),
            el(Tag::Paragraph, vec![text("two")]),
        ];
        assert_eq!(to_markdown(&nodes), "one\n\ntwo");
    }

    #[test]
    fn test_blockquote_and_rule() {
        let nodes = vec![
            el(Tag::Blockquote, vec![text("quoted")]),
            Element::new(Tag::Rule).into(),
            el(Tag::Block, vec![text("after")]),
        ];
        assert_eq!(to_markdown(&nodes), "> quoted\n---\nafter");
    }

    #[test]
    fn test_ordered_list_numbers_by_position() {
        let nodes = vec![el(Tag::OrderedList, vec![item("a"), item("b"), item("c")])];
        assert_eq!(to_markdown(&nodes), "1. a\n2. b\n3. c");
    }

    #[test]
    fn test_each_ordered_list_restarts() {
        let nodes = vec![
            el(Tag::OrderedList, vec![item("a"), item("b")]),
            el(Tag::Block, vec![text("between")]),
            el(Tag::OrderedList, vec![item("c")]),
        ];
        assert_eq!(to_markdown(&nodes), "1. a\n2. b\nbetween\n\n1. c");
    }

    #[test]
    fn test_nested_ordered_list_does_not_leak_counter() {
        let nested = el(Tag::OrderedList, vec![item("x"), item("y")]);
        let nodes = vec![el(
            Tag::OrderedList,
            vec![
                el(Tag::ListItem, vec![text("a"), nested]),
                item("b"),
            ],
        )];
        assert_eq!(to_markdown(&nodes), "1. a\n   1. x\n   2. y\n2. b");
    }

    #[test]
    fn test_list_ignores_whitespace_between_items() {
        let nodes = vec![el(
            Tag::UnorderedList,
            vec![text("\n  "), item("one"), text("\n  "), item("two"), text("\n")],
        )];
        assert_eq!(to_markdown(&nodes), "- one\n- two");
    }

    #[test]
    fn test_checkbox_block() {
        let nodes = vec![
            el(Tag::Block, vec![checkbox(true), text(" Buy milk ")]),
            el(Tag::Block, vec![checkbox(false), text("Todo")]),
        ];
        assert_eq!(to_markdown(&nodes), "[x] Buy milk\n[ ] Todo");
    }

    #[test]
    fn test_block_with_two_checkboxes_passes_through() {
        let nodes = vec![el(
            Tag::Block,
            vec![checkbox(true), text("a"), checkbox(false), text("b")],
        )];
        assert_eq!(to_markdown(&nodes), "ab");
    }

    #[test]
    fn test_standalone_checkbox_and_line_break_are_empty() {
        let nodes = vec![el(
            Tag::Paragraph,
            vec![text("a"), Element::new(Tag::LineBreak).into(), text("b")],
        )];
        assert_eq!(to_markdown(&nodes), "ab");
        let nodes = vec![el(Tag::Paragraph, vec![el(Tag::Bold, vec![checkbox(true)])])];
        assert_eq!(to_markdown(&nodes), "****");
    }

    #[test]
    fn test_newline_inserted_before_block_after_inline_text() {
        let nodes = vec![text("loose"), el(Tag::Heading(2), vec![text("Next")])];
        assert_eq!(to_markdown(&nodes), "loose\n## Next");
    }

    #[test]
    fn test_collapse_newlines() {
        assert_eq!(collapse_newlines("a\n\n\n\nb\n\nc\nd"), "a\n\nb\n\nc\nd");
    }

    #[test]
    fn test_direction_attribute_is_dropped() {
        let block = Element::new(Tag::Block)
            .with_attr("dir", "auto")
            .with_children(vec![text("plain")]);
        assert_eq!(to_markdown(&[block.into()]), "plain");
    }
}

#[cfg(test)]
mod snapshot_tests {
    use super::*;
    use crate::html::parse_fragment;

    #[test]
    fn test_stored_markup_snapshot() {
        let markup = concat!(
            "<h1 dir=\"auto\">Weekly notes</h1>",
            "<p dir=\"auto\">Some <strong>bold</strong> and <em>soft</em> words.</p>",
            "<blockquote dir=\"auto\">A quote</blockquote>",
            "<ul><li>first</li><li>second</li></ul>",
            "<ol><li>one</li><li>two</li></ol>",
            "<div dir=\"auto\"><input type=\"checkbox\" checked>Ship it</div>",
            "<hr>",
            "<p dir=\"auto\"><a href=\"https://example.com\">link</a></p>",
        );

        let markdown = to_markdown(&parse_fragment(markup));

        insta::assert_snapshot!(markdown, @r"
# Weekly notes
Some **bold** and *soft* words.

> A quote

- first
- second

1. one
2. two
[x] Ship it
---
[link](https://example.com)
");
    }
}
