// ABOUTME: Serde data models for stored documents and export frontmatter
// ABOUTME: Content is persisted as rendered markup, timestamps as RFC 3339

use crate::html::serde_markup;
use crate::node::RichNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNTITLED: &str = "Untitled Document";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default, with = "serde_markup")]
    pub content: Vec<RichNode>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

fn untitled() -> String {
    UNTITLED.to_string()
}

impl Document {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Document {
            id: id.into(),
            title: untitled(),
            content: Vec::new(),
            created: now,
            updated: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frontmatter {
    #[serde(default)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub generator: Option<String>,
}
