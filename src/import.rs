// ABOUTME: File import into rich-text documents
// ABOUTME: Markdown goes through the parser, other text becomes one paragraph per line

use crate::model::{Frontmatter, UNTITLED};
use crate::node::{Element, RichNode, Tag, DIR_ATTR, DIR_AUTO};
use crate::parse::parse_markdown;
use crate::Result;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Imported {
    pub title: String,
    pub content: Vec<RichNode>,
}

/// Splits a leading `---` YAML block from the body. Unparseable YAML leaves
/// the whole source as body.
pub fn split_frontmatter(source: &str) -> (Option<Frontmatter>, &str) {
    let Some(rest) = source.strip_prefix("---\n") else {
        return (None, source);
    };

    let (yaml, body) = if let Some(end) = rest.find("\n---\n") {
        (&rest[..end], &rest[end + 5..])
    } else if let Some(yaml) = rest.strip_suffix("\n---") {
        (yaml, "")
    } else {
        return (None, source);
    };

    match serde_yaml::from_str::<Frontmatter>(yaml) {
        Ok(fm) => (Some(fm), body),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unparseable frontmatter");
            (None, source)
        }
    }
}

pub fn import_markdown(source: &str, fallback_title: &str) -> Imported {
    let (fm, body) = split_frontmatter(source);
    let title = fm
        .and_then(|fm| fm.title)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    let body = body.trim_start_matches(|c: char| c == '\n' || c == '\r');
    Imported {
        title,
        content: parse_markdown(body),
    }
}

/// One directional paragraph per line, text taken literally.
pub fn import_plain_text(text: &str) -> Vec<RichNode> {
    text.lines()
        .map(|line| {
            let children = if line.is_empty() {
                Vec::new()
            } else {
                vec![RichNode::text(line)]
            };
            Element::new(Tag::Paragraph)
                .with_attr(DIR_ATTR, DIR_AUTO)
                .with_children(children)
                .into()
        })
        .collect()
}

pub fn import_file(path: &Path) -> Result<Imported> {
    let source = fs::read_to_string(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let is_markdown = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"));

    tracing::debug!(path = %path.display(), markdown = is_markdown, "importing file");
    if is_markdown {
        Ok(import_markdown(&source, &stem))
    } else {
        Ok(Imported {
            title: stem,
            content: import_plain_text(&source),
        })
    }
}
