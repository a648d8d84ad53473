// ABOUTME: CLI entrypoint for focusmd command
// ABOUTME: Handles logging setup, error exit codes and command dispatch

use chrono::Utc;
use clap::Parser;
use focusmd::{
    cli::{Cli, Commands},
    convert::to_markdown,
    export::{export_all, export_document, write_archive, write_export, ExportOptions},
    html::{parse_fragment, render_fragment},
    import::import_file,
    parse::parse_markdown,
    storage::{FileStore, Library, Paths},
    util::{count, format_date},
    Result,
};
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("focusmd: [E{}] {}", e.exit_code(), e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let command = cli.command();

    // Pure conversions need no document store.
    match &command {
        Commands::ToMarkdown { file } => {
            let markup = fs::read_to_string(file)?;
            println!("{}", to_markdown(&parse_fragment(&markup)));
            return Ok(());
        }
        Commands::ToHtml { file } => {
            let markdown = fs::read_to_string(file)?;
            println!("{}", render_fragment(&parse_markdown(&markdown))?);
            return Ok(());
        }
        _ => {}
    }

    let paths = Paths::new(cli.data_dir)?;
    let store = FileStore::open(&paths, cli.quota_bytes)?;
    let mut library = Library::open(store)?;

    match command {
        Commands::List => {
            if library.is_empty() {
                println!("No documents yet. Create one with `focusmd new`.");
            }
            let current = library.current_id().map(str::to_string);
            for doc in library.list() {
                let marker = if current.as_deref() == Some(doc.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {}  {}  {}",
                    marker,
                    doc.id,
                    format_date(&doc.updated),
                    doc.title
                );
            }
        }
        Commands::New => {
            let id = library.create_document(Utc::now())?;
            println!("{}", id);
        }
        Commands::Show { id, html } => {
            let doc = library.get(&id)?;
            if html {
                println!("{}", render_fragment(&doc.content)?);
            } else {
                println!("{}", to_markdown(&doc.content));
            }
        }
        Commands::Import { file } => {
            let imported = import_file(&file)?;
            let id = library.add_document(&imported.title, imported.content, Utc::now())?;
            println!("Imported {} as {}", file.display(), id);
        }
        Commands::Export {
            id,
            out,
            frontmatter,
        } => {
            let id = match id {
                Some(id) => id,
                None => library.ensure_current(Utc::now())?,
            };
            let export = export_document(library.get(&id)?, &ExportOptions { frontmatter })?;
            let out_dir = out.unwrap_or_else(|| paths.exports_dir.clone());
            let path = write_export(&export, &out_dir)?;
            println!("{}", path.display());
        }
        Commands::ExportAll { out, frontmatter } => {
            let bundle = export_all(library.list(), &ExportOptions { frontmatter })?;
            let out_dir = out.unwrap_or_else(|| paths.exports_dir.clone());
            let path = write_archive(&bundle, &out_dir)?;
            println!("Wrote {} documents to {}", bundle.len(), path.display());
        }
        Commands::Rename { id, title } => {
            library.rename(&id, &title)?;
        }
        Commands::Delete { id } => {
            library.delete(&id, Utc::now())?;
        }
        Commands::Stats { id } => {
            let id = match id {
                Some(id) => id,
                None => library.ensure_current(Utc::now())?,
            };
            println!("{}", count(&library.get(&id)?.content));
        }
        Commands::ToMarkdown { .. } | Commands::ToHtml { .. } => {}
    }

    Ok(())
}
