// ABOUTME: Markdown export of stored documents, singly or as a bundle
// ABOUTME: Derives filenames from content, writes files or one zip archive atomically

use crate::convert::to_markdown;
use crate::model::{Document, Frontmatter};
use crate::storage::write_atomic;
use crate::util::filename_stem;
use crate::Result;
use chrono::{DateTime, Datelike, Timelike, Utc};
use filetime::FileTime;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const GENERATOR: &str = concat!("focusmd ", env!("CARGO_PKG_VERSION"));
pub const ARCHIVE_NAME: &str = "focus-writings.zip";

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub frontmatter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub filename: String,
    pub contents: String,
    pub modified: DateTime<Utc>,
}

/// Filename for exported Markdown: the first line without its heading
/// marker, or the stored title when that line is empty.
pub fn export_filename(markdown: &str, fallback_title: &str) -> String {
    let first = markdown.lines().next().unwrap_or("");
    let first = first.trim_start_matches('#').trim();
    let source = if first.is_empty() {
        fallback_title
    } else {
        first
    };

    let stem = filename_stem(source);
    if stem.is_empty() {
        "untitled.md".to_string()
    } else {
        format!("{}.md", stem)
    }
}

pub fn export_document(doc: &Document, options: &ExportOptions) -> Result<Export> {
    let markdown = to_markdown(&doc.content);
    let filename = export_filename(&markdown, &doc.title);

    let mut contents = String::new();
    if options.frontmatter {
        let fm = Frontmatter {
            doc_id: Some(doc.id.clone()),
            title: Some(doc.title.clone()),
            created: Some(doc.created),
            updated: Some(doc.updated),
            generator: Some(GENERATOR.to_string()),
        };
        contents.push_str(&format!("---\n{}---\n\n", serde_yaml::to_string(&fm)?));
    }
    if !markdown.is_empty() {
        contents.push_str(&markdown);
        contents.push('\n');
    }

    tracing::debug!(id = %doc.id, filename = %filename, "exported document");
    Ok(Export {
        filename,
        contents,
        modified: doc.updated,
    })
}

/// Exports keyed by filename. A repeated name replaces the earlier export.
#[derive(Debug, Default)]
pub struct ExportBundle {
    entries: Vec<Export>,
}

impl ExportBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, export: Export) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.filename == export.filename)
        {
            Some(existing) => {
                tracing::debug!(filename = %export.filename, "bundle name collision, replacing");
                *existing = export;
            }
            None => self.entries.push(export),
        }
    }

    pub fn get(&self, filename: &str) -> Option<&Export> {
        self.entries.iter().find(|e| e.filename == filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Export> {
        self.entries.iter()
    }
}

pub fn export_all<'a>(
    docs: impl IntoIterator<Item = &'a Document>,
    options: &ExportOptions,
) -> Result<ExportBundle> {
    let mut bundle = ExportBundle::new();
    for doc in docs {
        bundle.insert(export_document(doc, options)?);
    }
    Ok(bundle)
}

pub fn write_export(export: &Export, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(&export.filename);
    write_atomic(&path, export.contents.as_bytes(), out_dir)?;

    let mtime = FileTime::from_unix_time(
        export.modified.timestamp(),
        export.modified.timestamp_subsec_nanos(),
    );
    filetime::set_file_mtime(&path, mtime)?;

    Ok(path)
}

fn zip_time(at: &DateTime<Utc>) -> zip::DateTime {
    zip::DateTime::from_date_and_time(
        u16::try_from(at.year()).unwrap_or(1980),
        at.month() as u8,
        at.day() as u8,
        at.hour() as u8,
        at.minute() as u8,
        at.second() as u8,
    )
    .unwrap_or_default()
}

/// Packs every export into one zip archive held in memory.
pub fn archive_bundle(bundle: &ExportBundle) -> Result<Vec<u8>> {
    let pb = ProgressBar::new(bundle.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} docs")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for export in bundle.iter() {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip_time(&export.modified));
        writer.start_file(export.filename.as_str(), options)?;
        writer.write_all(export.contents.as_bytes())?;
        pb.inc(1);
    }
    let bytes = writer.finish()?.into_inner();

    pb.finish_with_message(format!("archived {} docs", bundle.len()));
    Ok(bytes)
}

/// Writes the bundle to `out_dir/focus-writings.zip`.
pub fn write_archive(bundle: &ExportBundle, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(ARCHIVE_NAME);
    write_atomic(&path, &archive_bundle(bundle)?, out_dir)?;
    tracing::debug!(path = %path.display(), entries = bundle.len(), "wrote export archive");
    Ok(path)
}
