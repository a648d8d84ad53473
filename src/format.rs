// ABOUTME: Active-style queries and formatting toggles over the rich-text tree
// ABOUTME: Selections are node paths, so no rendered surface is needed

use crate::node::{
    ancestors, ensure_direction, push_node, resolve, resolve_mut, siblings_mut, Element, NodePath,
    RichNode, Tag,
};

const DEFAULT_URL: &str = "https://";

/// A byte range inside one text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: NodePath,
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(anchor: impl Into<NodePath>, start: usize, end: usize) -> Self {
        Selection {
            anchor: anchor.into(),
            start,
            end,
        }
    }

    pub fn caret(anchor: impl Into<NodePath>, offset: usize) -> Self {
        Self::new(anchor, offset, offset)
    }

    fn text<'a>(&self, forest: &'a [RichNode]) -> Option<&'a str> {
        match resolve(forest, &self.anchor)? {
            RichNode::Text(text) => text.get(self.start..self.end),
            RichNode::Element(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveStyles {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub heading: Option<u8>,
    pub blockquote: bool,
    pub link: bool,
}

/// Styles applying at `anchor`, found by walking its ancestors outward.
pub fn active_styles(forest: &[RichNode], anchor: &NodePath) -> ActiveStyles {
    let mut styles = ActiveStyles::default();
    for (_, tag) in ancestors(forest, anchor) {
        match tag {
            Tag::Bold => styles.bold = true,
            Tag::Italic => styles.italic = true,
            Tag::Underline => styles.underline = true,
            Tag::Heading(level) => {
                styles.heading.get_or_insert(level);
            }
            Tag::Blockquote => styles.blockquote = true,
            Tag::Anchor => styles.link = true,
            _ => {}
        }
    }
    styles
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    Heading(u8),
    Blockquote,
    Link,
    Unlink,
}

/// Asks the user for a link target, seeded with `initial`.
pub trait UrlPrompt {
    fn prompt(&mut self, initial: &str) -> Option<String>;
}

impl<F> UrlPrompt for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn prompt(&mut self, initial: &str) -> Option<String> {
        self(initial)
    }
}

/// Applies `command` at `selection`. Returns whether the tree changed.
///
/// Inline marks and block formats toggle: when the format already applies on
/// the selection's ancestor chain it is removed instead.
pub fn apply_format(
    forest: &mut Vec<RichNode>,
    selection: &Selection,
    command: FormatCommand,
    prompt: &mut dyn UrlPrompt,
) -> bool {
    let Some(selected) = selection.text(forest) else {
        return false;
    };
    if command != FormatCommand::Unlink && selected.trim().is_empty() {
        return false;
    }

    let changed = match command {
        FormatCommand::Bold => toggle_mark(forest, selection, Tag::Bold),
        FormatCommand::Italic => toggle_mark(forest, selection, Tag::Italic),
        FormatCommand::Underline => toggle_mark(forest, selection, Tag::Underline),
        FormatCommand::Heading(level) => match Tag::heading(level) {
            Some(tag) => toggle_block(forest, selection, tag),
            None => false,
        },
        FormatCommand::Blockquote => toggle_block(forest, selection, Tag::Blockquote),
        FormatCommand::Link => link(forest, selection, prompt),
        FormatCommand::Unlink => match nearest(forest, &selection.anchor, |t| t == Tag::Anchor) {
            Some(path) => unwrap_element(forest, &path),
            None => false,
        },
    };

    if changed && matches!(command, FormatCommand::Heading(_) | FormatCommand::Blockquote) {
        ensure_direction(forest);
    }
    changed
}

fn nearest(forest: &[RichNode], anchor: &NodePath, want: impl Fn(Tag) -> bool) -> Option<NodePath> {
    ancestors(forest, anchor)
        .into_iter()
        .find(|(_, tag)| want(*tag))
        .map(|(path, _)| path)
}

fn toggle_mark(forest: &mut Vec<RichNode>, selection: &Selection, mark: Tag) -> bool {
    match nearest(forest, &selection.anchor, |t| t == mark) {
        Some(path) => unwrap_element(forest, &path),
        None => wrap_selection(forest, selection, Element::new(mark)),
    }
}

fn toggle_block(forest: &mut Vec<RichNode>, selection: &Selection, tag: Tag) -> bool {
    let is_block = |t: Tag| {
        matches!(
            t,
            Tag::Heading(_) | Tag::Paragraph | Tag::Blockquote | Tag::Block
        )
    };
    let Some(path) = nearest(forest, &selection.anchor, is_block) else {
        return false;
    };
    let Some(block) = resolve_mut(forest, &path).and_then(RichNode::as_element_mut)
    else {
        return false;
    };

    block.tag = if block.tag == tag { Tag::Paragraph } else { tag };
    true
}

fn link(forest: &mut Vec<RichNode>, selection: &Selection, prompt: &mut dyn UrlPrompt) -> bool {
    let existing = nearest(forest, &selection.anchor, |t| t == Tag::Anchor);

    let initial = existing
        .as_ref()
        .and_then(|path| resolve(forest, path))
        .and_then(RichNode::as_element)
        .and_then(|el| el.attr("href"))
        .unwrap_or(DEFAULT_URL)
        .to_string();

    let url = match prompt.prompt(&initial) {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => return false,
    };

    match existing {
        Some(path) => match resolve_mut(forest, &path).and_then(RichNode::as_element_mut)
        {
            Some(anchor) => {
                anchor.attrs.insert("href".into(), url);
                true
            }
            None => false,
        },
        None => wrap_selection(
            forest,
            selection,
            Element::new(Tag::Anchor)
                .with_attr("href", &url)
                .with_attr("target", "_blank")
                .with_attr("rel", "noopener noreferrer"),
        ),
    }
}

/// Splits the anchor text node around the selection and wraps the middle.
fn wrap_selection(forest: &mut Vec<RichNode>, selection: &Selection, wrapper: Element) -> bool {
    let Some((siblings, idx)) = siblings_mut(forest, &selection.anchor) else {
        return false;
    };
    let RichNode::Text(text) = &siblings[idx] else {
        return false;
    };
    let (Some(before), Some(middle), Some(after)) = (
        text.get(..selection.start),
        text.get(selection.start..selection.end),
        text.get(selection.end..),
    ) else {
        return false;
    };

    let mut replacement = Vec::with_capacity(3);
    if !before.is_empty() {
        replacement.push(RichNode::text(before));
    }
    replacement.push(wrapper.with_children(vec![RichNode::text(middle)]).into());
    if !after.is_empty() {
        replacement.push(RichNode::text(after));
    }

    siblings.splice(idx..=idx, replacement);
    true
}

/// Replaces the element at `path` with its children, merging adjacent text.
fn unwrap_element(forest: &mut Vec<RichNode>, path: &NodePath) -> bool {
    let Some((siblings, idx)) = siblings_mut(forest, path) else {
        return false;
    };
    let children = match siblings.remove(idx) {
        RichNode::Element(el) => el.children,
        text => vec![text],
    };

    let tail = siblings.split_off(idx);
    for node in children.into_iter().chain(tail) {
        push_node(siblings, node);
    }
    true
}
