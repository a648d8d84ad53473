// ABOUTME: Integration tests for end-to-end workflows
// ABOUTME: Import, edit, persist, reopen and export through the file-backed store

use assert_fs::prelude::*;
use chrono::{TimeZone, Utc};
use focusmd::{
    export::{export_all, export_document, write_archive, write_export, ExportOptions},
    html::{parse_fragment, render_fragment},
    import::import_file,
    parse_markdown,
    session::{Session, SessionConfig, SessionEvent},
    storage::{FileStore, Library, Paths},
    to_markdown, Error, Result,
};
use std::fs;
use std::io::Read;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn open_library(data_dir: &std::path::Path, quota: Option<u64>) -> Result<Library<FileStore>> {
    let paths = Paths::new(Some(data_dir.to_path_buf()))?;
    Library::open(FileStore::open(&paths, quota)?)
}

#[test]
fn test_import_persist_reopen_export() -> Result<()> {
    let data = TempDir::new().unwrap();
    let inbox = assert_fs::TempDir::new().unwrap();
    let source = inbox.child("weekly.md");
    source
        .write_str("---\ntitle: Weekly Review\n---\n\n# Weekly Review\n\n1. ship\n2. rest\n[x] Done\n")
        .unwrap();

    let id = {
        let mut library = open_library(data.path(), None)?;
        let imported = import_file(source.path())?;
        library.add_document(
            &imported.title,
            imported.content,
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        )?
    };

    let library = open_library(data.path(), None)?;
    assert_eq!(library.current_id(), Some(id.as_str()));
    let doc = library.get(&id)?;
    assert_eq!(doc.title, "Weekly Review");

    let export = export_document(doc, &ExportOptions::default())?;
    assert_eq!(export.filename, "weekly_review.md");
    assert_eq!(export.contents, "# Weekly Review\n\n1. ship\n2. rest\n[x] Done\n");

    let out = TempDir::new().unwrap();
    let path = write_export(&export, out.path())?;
    assert_eq!(fs::read_to_string(&path)?, export.contents);

    let mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(&path)?);
    assert_eq!(mtime.unix_seconds(), doc.updated.timestamp());

    Ok(())
}

#[test]
fn test_session_autosave_survives_reopen() -> Result<()> {
    let data = TempDir::new().unwrap();
    let t0 = Instant::now();

    let id = {
        let library = open_library(data.path(), None)?;
        let mut session = Session::open(library, SessionConfig::default())?;
        session.input(parse_markdown("Morning pages\nthree more words"), t0);
        let events = session.tick(t0 + Duration::from_millis(1500));
        assert!(matches!(events[0], SessionEvent::Saved { .. }));
        session.document_id().to_string()
    };

    let library = open_library(data.path(), None)?;
    let doc = library.get(&id)?;
    assert_eq!(doc.title, "Morning pages");
    assert_eq!(to_markdown(&doc.content), "Morning pages\nthree more words");
    Ok(())
}

#[test]
fn test_quota_exceeded_leaves_store_intact() -> Result<()> {
    let data = TempDir::new().unwrap();
    let mut library = open_library(data.path(), Some(1_024))?;
    let now = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
    let id = library.create_document(now)?;
    library.save_content(&id, parse_markdown("short note"), now)?;

    let huge = format!("![photo](data:image/png;base64,{})", "A".repeat(4_096));
    let err = library
        .save_content(&id, parse_markdown(&huge), now)
        .unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }));

    let reopened = open_library(data.path(), Some(1_024))?;
    assert_eq!(reopened.get(&id)?.title, "short note");
    Ok(())
}

#[test]
fn test_export_all_writes_archive() -> Result<()> {
    let data = TempDir::new().unwrap();
    let mut library = open_library(data.path(), None)?;
    let base = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();

    for (i, text) in ["# Alpha\nbody", "# Beta", "# Alpha\nnewer"].iter().enumerate() {
        let at = base + chrono::Duration::minutes(i as i64);
        let id = library.create_document(at)?;
        library.save_content(&id, parse_markdown(text), at)?;
    }

    let bundle = export_all(library.list(), &ExportOptions::default())?;
    assert_eq!(bundle.len(), 2);

    let out = assert_fs::TempDir::new().unwrap();
    let path = write_archive(&bundle, out.path())?;
    assert_eq!(path, out.path().join("focus-writings.zip"));

    let mut archive = zip::ZipArchive::new(fs::File::open(&path)?)?;
    assert_eq!(archive.len(), 2);

    let mut beta = String::new();
    archive.by_name("beta.md")?.read_to_string(&mut beta)?;
    assert_eq!(beta, "# Beta\n");

    // Newest first, so the older Alpha lands in the archive last.
    let mut alpha = String::new();
    archive.by_name("alpha.md")?.read_to_string(&mut alpha)?;
    assert_eq!(alpha, "# Alpha\nbody\n");
    Ok(())
}

#[test]
fn test_markup_conversion_workflow() -> Result<()> {
    let markup = "<h2>Notes</h2><ul><li>alpha</li><li><b>beta</b></li></ul><p>see <a href=\"https://example.com\">site</a></p>";
    let markdown = to_markdown(&parse_fragment(markup));
    assert_eq!(
        markdown,
        "## Notes\n\n- alpha\n- **beta**\nsee [site](https://example.com)"
    );

    let reparsed = parse_markdown(&markdown);
    let stored = render_fragment(&reparsed)?;
    assert_eq!(to_markdown(&parse_fragment(&stored)), to_markdown(&reparsed));
    Ok(())
}
