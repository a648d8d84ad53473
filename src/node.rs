// ABOUTME: Rich-text tree model shared by the serializer, parser and editor
// ABOUTME: Closed tag vocabulary, attributes, text content and node paths

use std::collections::BTreeMap;

pub type Attributes = BTreeMap<String, String>;

pub const DIR_ATTR: &str = "dir";
pub const DIR_AUTO: &str = "auto";

/// The fixed tag vocabulary of the editable surface.
///
/// Headings carry their level; use [`Tag::heading`] to build one so the level
/// stays within `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Heading(u8),
    Paragraph,
    Blockquote,
    Bold,
    Italic,
    Underline,
    Code,
    Anchor,
    Image,
    LineBreak,
    Rule,
    OrderedList,
    UnorderedList,
    ListItem,
    Block,
    Checkbox,
}

impl Tag {
    pub fn heading(level: u8) -> Option<Tag> {
        (1..=6).contains(&level).then_some(Tag::Heading(level))
    }

    /// Tags allowed at the top level of a document fragment.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Tag::Heading(_)
                | Tag::Paragraph
                | Tag::Blockquote
                | Tag::OrderedList
                | Tag::UnorderedList
                | Tag::ListItem
                | Tag::Block
                | Tag::Rule
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, Tag::OrderedList | Tag::UnorderedList)
    }

    pub fn html_name(self) -> &'static str {
        match self {
            Tag::Heading(1) => "h1",
            Tag::Heading(2) => "h2",
            Tag::Heading(3) => "h3",
            Tag::Heading(4) => "h4",
            Tag::Heading(5) => "h5",
            Tag::Heading(_) => "h6",
            Tag::Paragraph => "p",
            Tag::Blockquote => "blockquote",
            Tag::Bold => "strong",
            Tag::Italic => "em",
            Tag::Underline => "u",
            Tag::Code => "code",
            Tag::Anchor => "a",
            Tag::Image => "img",
            Tag::LineBreak => "br",
            Tag::Rule => "hr",
            Tag::OrderedList => "ol",
            Tag::UnorderedList => "ul",
            Tag::ListItem => "li",
            Tag::Block => "div",
            Tag::Checkbox => "input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    pub attrs: Attributes,
    pub children: Vec<RichNode>,
}

impl Element {
    pub fn new(tag: Tag) -> Self {
        Element {
            tag,
            attrs: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_children(mut self, children: Vec<RichNode>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// `checked` is a boolean attribute: presence means checked.
    pub fn is_checked(&self) -> bool {
        self.attrs.contains_key("checked")
    }

    /// Counts descendants carrying `tag`.
    pub fn count_tag(&self, tag: Tag) -> usize {
        self.children
            .iter()
            .map(|child| usize::from(child.tag() == Some(tag)) + child.count_tag(tag))
            .sum()
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_text_content(&mut out);
        }
        out
    }
}

impl From<Element> for RichNode {
    fn from(element: Element) -> Self {
        RichNode::Element(element)
    }
}

/// A node of the editable tree: literal text or a tagged element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichNode {
    Text(String),
    Element(Element),
}

impl RichNode {
    pub fn text(text: impl Into<String>) -> Self {
        RichNode::Text(text.into())
    }

    pub fn element(tag: Tag, children: Vec<RichNode>) -> Self {
        RichNode::Element(Element::new(tag).with_children(children))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            RichNode::Element(el) => Some(el),
            RichNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            RichNode::Element(el) => Some(el),
            RichNode::Text(_) => None,
        }
    }

    pub fn tag(&self) -> Option<Tag> {
        self.as_element().map(|el| el.tag)
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, RichNode::Text(t) if t.trim().is_empty())
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text_content(&mut out);
        out
    }

    fn push_text_content(&self, out: &mut String) {
        match self {
            RichNode::Text(t) => out.push_str(t),
            RichNode::Element(el) => {
                for child in &el.children {
                    child.push_text_content(out);
                }
            }
        }
    }

    /// Counts descendants (not including `self`) carrying `tag`.
    pub fn count_tag(&self, tag: Tag) -> usize {
        self.as_element().map_or(0, |el| el.count_tag(tag))
    }
}

/// Appends text to a node list, merging with a trailing text node.
pub fn push_text(nodes: &mut Vec<RichNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(RichNode::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(RichNode::text(text));
    }
}

/// Appends a node, merging adjacent text.
pub fn push_node(nodes: &mut Vec<RichNode>, node: RichNode) {
    match node {
        RichNode::Text(t) => push_text(nodes, &t),
        element => nodes.push(element),
    }
}

/// Text as the rendering surface lays it out: blocks on their own lines,
/// paragraph-like blocks followed by a blank line.
pub fn rendered_text(forest: &[RichNode]) -> String {
    let mut out = String::new();
    for node in forest {
        push_rendered(node, &mut out);
    }
    out
}

fn push_rendered(node: &RichNode, out: &mut String) {
    match node {
        RichNode::Text(t) => out.push_str(t),
        RichNode::Element(el) => {
            if el.tag == Tag::LineBreak {
                out.push('\n');
                return;
            }
            if el.tag.is_block() && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            for child in &el.children {
                push_rendered(child, out);
            }
            match el.tag {
                Tag::Heading(_) | Tag::Paragraph | Tag::Blockquote => out.push_str("\n\n"),
                Tag::Block | Tag::ListItem | Tag::Rule => out.push('\n'),
                _ => {}
            }
        }
    }
}

/// Marks every paragraph-like block with the automatic direction hint,
/// leaving explicit directions alone.
pub fn ensure_direction(forest: &mut [RichNode]) {
    for node in forest.iter_mut() {
        if let RichNode::Element(el) = node {
            if matches!(
                el.tag,
                Tag::Block | Tag::Paragraph | Tag::Heading(_) | Tag::Blockquote
            ) && !el.attrs.contains_key(DIR_ATTR)
            {
                el.attrs.insert(DIR_ATTR.into(), DIR_AUTO.into());
            }
            ensure_direction(&mut el.children);
        }
    }
}

/// Index path from the forest root down to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn new(indices: Vec<usize>) -> Self {
        NodePath(indices)
    }

    pub fn parent(&self) -> Option<NodePath> {
        let (_, parent) = self.0.split_last()?;
        (!parent.is_empty()).then(|| NodePath(parent.to_vec()))
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        NodePath(indices)
    }
}

pub fn resolve<'a>(forest: &'a [RichNode], path: &NodePath) -> Option<&'a RichNode> {
    let (first, rest) = path.0.split_first()?;
    let mut node = forest.get(*first)?;
    for &i in rest {
        node = node.as_element()?.children.get(i)?;
    }
    Some(node)
}

pub fn resolve_mut<'a>(forest: &'a mut [RichNode], path: &NodePath) -> Option<&'a mut RichNode> {
    let (first, rest) = path.0.split_first()?;
    let mut node = forest.get_mut(*first)?;
    for &i in rest {
        node = node.as_element_mut()?.children.get_mut(i)?;
    }
    Some(node)
}

/// The list holding the node at `path`, plus the node's index in it.
pub fn siblings_mut<'a>(
    forest: &'a mut Vec<RichNode>,
    path: &NodePath,
) -> Option<(&'a mut Vec<RichNode>, usize)> {
    let (last, parent) = path.0.split_last()?;
    if parent.is_empty() {
        return (*last < forest.len()).then_some((forest, *last));
    }
    let parent = resolve_mut(forest, &NodePath(parent.to_vec()))?;
    let children = &mut parent.as_element_mut()?.children;
    (*last < children.len()).then_some((children, *last))
}

/// Element ancestors of the node at `path`, innermost first.
pub fn ancestors(forest: &[RichNode], path: &NodePath) -> Vec<(NodePath, Tag)> {
    let mut found = Vec::new();
    let mut prefix = path.parent();
    while let Some(current) = prefix {
        if let Some(tag) = resolve(forest, &current).and_then(RichNode::tag) {
            found.push((current.clone(), tag));
        }
        prefix = current.parent();
    }
    found
}
