// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines all subcommands and global flags with env fallbacks

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "focusmd")]
#[command(about = "Distraction-free documents with Markdown import and export", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true, env = "FOCUSMD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Storage quota in bytes (unlimited when unset)
    #[arg(long, global = true, env = "FOCUSMD_QUOTA_BYTES", value_parser = parse_quota)]
    pub quota_bytes: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

fn parse_quota(s: &str) -> Result<u64, String> {
    let bytes: u64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid byte count: {}", s))?;
    if bytes == 0 {
        return Err("quota must be greater than zero".into());
    }
    Ok(bytes)
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List all documents (default)
    List,

    /// Create an empty document and make it current
    New,

    /// Print a document as Markdown
    Show {
        /// Document ID
        id: String,

        /// Print the stored markup instead
        #[arg(long)]
        html: bool,
    },

    /// Import a Markdown or plain text file as a new document
    Import {
        /// File to import
        file: PathBuf,
    },

    /// Export one document (the current one by default) as Markdown
    Export {
        /// Document ID
        id: Option<String>,

        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Prepend a YAML frontmatter block
        #[arg(long)]
        frontmatter: bool,
    },

    /// Export every document into one zip archive
    ExportAll {
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Prepend a YAML frontmatter block
        #[arg(long)]
        frontmatter: bool,
    },

    /// Rename a document
    Rename {
        /// Document ID
        id: String,

        /// New title
        title: String,
    },

    /// Delete a document
    Delete {
        /// Document ID
        id: String,
    },

    /// Word and paragraph counts (the current document by default)
    Stats {
        /// Document ID
        id: Option<String>,
    },

    /// Convert a markup file to Markdown on stdout
    ToMarkdown {
        /// Markup file
        file: PathBuf,
    },

    /// Convert a Markdown file to markup on stdout
    ToHtml {
        /// Markdown file
        file: PathBuf,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::List)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quota_valid() {
        assert_eq!(parse_quota("5242880").unwrap(), 5_242_880);
        assert_eq!(parse_quota(" 10 ").unwrap(), 10);
    }

    #[test]
    fn test_parse_quota_invalid() {
        assert!(parse_quota("0").is_err());
        assert!(parse_quota("lots").is_err());
        assert!(parse_quota("-1").is_err());
    }

    #[test]
    fn test_default_command_is_list() {
        let cli = Cli::try_parse_from(["focusmd"]).unwrap();
        assert!(matches!(cli.command(), Commands::List));
    }

    #[test]
    fn test_export_flags() {
        let cli = Cli::try_parse_from([
            "focusmd",
            "export",
            "doc_1",
            "--out",
            "/tmp/out",
            "--frontmatter",
        ])
        .unwrap();
        match cli.command() {
            Commands::Export {
                id,
                out,
                frontmatter,
            } => {
                assert_eq!(id.as_deref(), Some("doc_1"));
                assert_eq!(out, Some(PathBuf::from("/tmp/out")));
                assert!(frontmatter);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_kebab_case_subcommands() {
        let cli = Cli::try_parse_from(["focusmd", "to-markdown", "page.html"]).unwrap();
        assert!(matches!(cli.command(), Commands::ToMarkdown { .. }));
        let cli = Cli::try_parse_from(["focusmd", "export-all", "--frontmatter"]).unwrap();
        assert!(matches!(cli.command(), Commands::ExportAll { frontmatter: true, .. }));
    }
}
