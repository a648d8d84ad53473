// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Maps store, import and export failures to distinct exit codes

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] serde_yaml::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    #[error("Markup error: {0}")]
    Markup(String),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotFound(_) => 2,
            Error::Parse(_) => 5,
            Error::Frontmatter(_) => 5,
            Error::Filesystem(_) => 6,
            Error::Archive(_) => 6,
            Error::QuotaExceeded { .. } => 7,
            Error::Markup(_) => 8,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
