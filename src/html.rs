// ABOUTME: Stored-markup codec between HTML fragments and rich-text trees
// ABOUTME: Parses with html5ever into an RcDom and renders back through its serializer

//! Documents are persisted as the markup the editing surface renders. This
//! module maps that markup onto the closed [`Tag`] vocabulary and back.
//!
//! | Markup                          | Tag                         |
//! |---------------------------------|-----------------------------|
//! | `h1`..`h6`                      | `Heading(1..=6)`            |
//! | `p`, `blockquote`, `div`        | `Paragraph`, `Blockquote`, `Block` |
//! | `strong`/`b`, `em`/`i`, `u`, `code` | inline marks            |
//! | `a`, `img`, `br`, `hr`          | `Anchor`, `Image`, `LineBreak`, `Rule` |
//! | `ol`, `ul`, `li`                | lists                       |
//! | `input type=checkbox`           | `Checkbox`                  |
//!
//! Other elements are transparent (their children are kept in place);
//! scripts, styles and non-checkbox inputs are dropped entirely.

use crate::node::{push_node, Attributes, Element, RichNode, Tag, DIR_ATTR, DIR_AUTO};
use crate::{Error, Result};
use html5ever::tendril::TendrilSink;
use html5ever::{
    ns, parse_document, serialize, serialize::SerializeOpts, serialize::TraversalScope, Attribute,
    LocalName, ParseOpts, QualName,
};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

enum Mapping {
    Keep(Tag),
    Transparent,
    Drop,
}

fn map_element(name: &str, attrs: &Attributes) -> Mapping {
    let tag = match name {
        "h1" => Tag::Heading(1),
        "h2" => Tag::Heading(2),
        "h3" => Tag::Heading(3),
        "h4" => Tag::Heading(4),
        "h5" => Tag::Heading(5),
        "h6" => Tag::Heading(6),
        "p" => Tag::Paragraph,
        "blockquote" => Tag::Blockquote,
        "strong" | "b" => Tag::Bold,
        "em" | "i" => Tag::Italic,
        "u" => Tag::Underline,
        "code" => Tag::Code,
        "a" => Tag::Anchor,
        "img" => Tag::Image,
        "br" => Tag::LineBreak,
        "hr" => Tag::Rule,
        "ol" => Tag::OrderedList,
        "ul" => Tag::UnorderedList,
        "li" => Tag::ListItem,
        "div" => Tag::Block,
        "input"
            if attrs
                .get("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) =>
        {
            Tag::Checkbox
        }
        "input" | "script" | "style" | "template" | "noscript" | "head" | "title" | "meta"
        | "link" => return Mapping::Drop,
        _ => return Mapping::Transparent,
    };
    Mapping::Keep(tag)
}

/// Parses a markup fragment into a rich-text forest.
///
/// Never fails: the parser recovers from malformed markup the way browsers
/// do. Stray top-level inline content is wrapped into a directional block.
pub fn parse_fragment(markup: &str) -> Vec<RichNode> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(markup);

    let mut nodes = Vec::new();
    if let Some(body) = find_element(&dom.document, "body") {
        for child in body.children.borrow().iter() {
            convert_handle(child, &mut nodes);
        }
    }
    wrap_inline_runs(nodes)
}

fn find_element(handle: &Handle, local: &str) -> Option<Handle> {
    if let NodeData::Element { ref name, .. } = handle.data {
        if &*name.local == local {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, local))
}

fn convert_handle(handle: &Handle, out: &mut Vec<RichNode>) {
    match handle.data {
        NodeData::Text { ref contents } => push_node(out, RichNode::text(&**contents.borrow())),
        NodeData::Element {
            ref name,
            ref attrs,
            ..
        } => {
            let attrs: Attributes = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect();

            let mapping = map_element(&name.local, &attrs);
            if matches!(mapping, Mapping::Drop) {
                return;
            }

            let mut children = Vec::new();
            for child in handle.children.borrow().iter() {
                convert_handle(child, &mut children);
            }

            match mapping {
                Mapping::Keep(tag) => out.push(RichNode::Element(Element {
                    tag,
                    attrs,
                    children,
                })),
                Mapping::Transparent => {
                    for child in children {
                        push_node(out, child);
                    }
                }
                Mapping::Drop => {}
            }
        }
        _ => {}
    }
}

fn wrap_inline_runs(nodes: Vec<RichNode>) -> Vec<RichNode> {
    fn flush_run(run: &mut Vec<RichNode>, out: &mut Vec<RichNode>) {
        if run.iter().all(RichNode::is_blank_text) {
            run.clear();
            return;
        }
        out.push(
            Element::new(Tag::Block)
                .with_attr(DIR_ATTR, DIR_AUTO)
                .with_children(std::mem::take(run))
                .into(),
        );
    }

    let mut out = Vec::new();
    let mut run = Vec::new();
    for node in nodes {
        if node.tag().is_some_and(Tag::is_block) {
            flush_run(&mut run, &mut out);
            out.push(node);
        } else {
            push_node(&mut run, node);
        }
    }
    flush_run(&mut run, &mut out);
    out
}

/// Renders a rich-text forest as a markup fragment.
pub fn render_fragment(nodes: &[RichNode]) -> Result<String> {
    let container = create_element("div", &Attributes::new());
    for node in nodes {
        container.children.borrow_mut().push(build_handle(node));
    }

    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        create_missing_parent: true,
        ..Default::default()
    };

    let mut output = Vec::new();
    let serializable = SerializableHandle::from(container);
    serialize(&mut output, &serializable, opts)
        .map_err(|e| Error::Markup(format!("HTML serialization failed: {e}")))?;

    String::from_utf8(output).map_err(|e| Error::Markup(format!("UTF-8 conversion failed: {e}")))
}

fn build_handle(node: &RichNode) -> Handle {
    match node {
        RichNode::Text(text) => create_text(text),
        RichNode::Element(el) => {
            let handle = if el.tag == Tag::Checkbox && !el.attrs.contains_key("type") {
                let mut attrs = el.attrs.clone();
                attrs.insert("type".into(), "checkbox".into());
                create_element(el.tag.html_name(), &attrs)
            } else {
                create_element(el.tag.html_name(), &el.attrs)
            };
            for child in &el.children {
                handle.children.borrow_mut().push(build_handle(child));
            }
            handle
        }
    }
}

fn create_element(tag: &str, attrs: &Attributes) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name.as_str())),
            value: value.clone().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

/// Serde adapter persisting a forest as its markup string.
pub mod serde_markup {
    use crate::node::RichNode;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(nodes: &[RichNode], serializer: S) -> Result<S::Ok, S::Error> {
        let markup = super::render_fragment(nodes).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&markup)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RichNode>, D::Error> {
        let markup = String::deserialize(deserializer)?;
        Ok(super::parse_fragment(&markup))
    }
}
