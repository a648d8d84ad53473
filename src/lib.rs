// ABOUTME: Public library API for focusmd documents and Markdown conversion
// ABOUTME: Re-exports core modules for external use

pub mod cli;
pub mod convert;
pub mod error;
pub mod export;
pub mod format;
pub mod html;
pub mod import;
pub mod inline;
pub mod model;
pub mod node;
pub mod parse;
pub mod session;
pub mod storage;
pub mod util;

pub use convert::to_markdown;
pub use error::{Error, Result};
pub use model::{Document, Frontmatter};
pub use node::{Element, RichNode, Tag};
pub use parse::parse_markdown;
