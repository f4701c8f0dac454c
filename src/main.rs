mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, ImportArgs, PaginateArgs, ReadArgs, RemoveArgs};
use novel_quest::stores::{FileBackend, FileLocalStore, ScrollSink};
use novel_quest::{
    Account, Collaborators, ContentFetcher, Document, Library, NovelQuestError, Paginator,
    ReaderConfig, ReadingPosition, ReadingSession, Result, ViewportEvent,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let result = match &cli.command {
        Commands::Paginate(args) => handle_paginate_command(&cli, args).await,
        Commands::Import(args) => handle_import_command(&cli, args).await,
        Commands::Library => handle_library_command(&cli).await,
        Commands::Remove(args) => handle_remove_command(&cli, args).await,
        Commands::Read(args) => handle_read_command(&cli, args).await,
        Commands::Position => handle_position_command(&cli).await,
    };

    if let Err(e) = result {
        error!("Operation failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// The read loop prints pages itself, so scroll commands are only logged.
struct TerminalScroll;

impl ScrollSink for TerminalScroll {
    fn scroll_to_page(&self, index: usize) {
        debug!("Scrolling to page {}", index + 1);
    }
}

struct App {
    config: ReaderConfig,
    local: Arc<FileLocalStore>,
    account: Option<Account>,
}

impl App {
    fn library(&self) -> Result<Library> {
        let account = self.account.clone().ok_or(NovelQuestError::NotAuthenticated)?;
        Ok(Library::new(account, self.local.clone()))
    }

    fn session(&self) -> Result<ReadingSession> {
        ReadingSession::new(
            self.config.clone(),
            Collaborators {
                local: self.local.clone(),
                scroll: Arc::new(TerminalScroll),
                account: self.account.clone(),
            },
        )
    }
}

async fn load_config(cli: &Cli) -> Result<ReaderConfig> {
    let mut config = match &cli.config {
        Some(path) => ReaderConfig::load(path).await?,
        None => ReaderConfig::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }

    config.validate()?;
    Ok(config)
}

async fn build_app(cli: &Cli) -> Result<App> {
    let config = load_config(cli).await?;
    let local = Arc::new(FileLocalStore::open(config.device_store_path())?);

    let account = cli.user.as_ref().map(|owner_id| {
        let backend = Arc::new(FileBackend::new(config.backend_dir()));
        Account {
            owner_id: owner_id.clone(),
            documents: backend.clone(),
            positions: backend,
        }
    });

    Ok(App {
        config,
        local,
        account,
    })
}

async fn handle_paginate_command(cli: &Cli, args: &PaginateArgs) -> Result<()> {
    let config = load_config(cli).await?;
    ContentFetcher::validate_source(&args.source)?;

    let fetcher = ContentFetcher::new(&config)?;
    let fetched = fetcher.fetch_content(&args.source).await?;

    let paginator = Paginator::new(config.page_size)?;
    let pages = paginator.paginate(&fetched.content);
    let stats = paginator.stats(&pages);

    println!("\n=== Pagination for '{}' ===", fetched.name);
    println!("Source type: {:?}", fetched.source_type);
    println!("Total words: {}", stats.total_words);
    println!("Page size: {} words", stats.page_size);
    println!("Total pages: {}", stats.total_pages);
    println!("Average words per page: {:.1}", stats.avg_words_per_page);
    println!("Last page: {} words", stats.last_page_words);

    if args.detailed {
        println!("\nPage Details:");
        for page in &pages {
            println!(
                "  Page {}: {} words | {}",
                page.index + 1,
                page.word_count,
                preview(&page.content)
            );
        }
    }

    if let Some(json_path) = &args.json_output {
        let json_content = serde_json::to_string_pretty(&serde_json::json!({
            "name": fetched.name,
            "source_type": fetched.source_type,
            "stats": stats,
            "pages": pages,
        }))
        .context("Failed to serialize pagination results")?;

        tokio::fs::write(json_path, json_content)
            .await
            .context("Failed to write JSON pagination file")?;

        info!("Pagination results written to: {}", json_path.display());
    }

    Ok(())
}

async fn handle_import_command(cli: &Cli, args: &ImportArgs) -> Result<()> {
    let app = build_app(cli).await?;
    let library = app.library()?;

    ContentFetcher::validate_source(&args.source)?;
    let fetcher = ContentFetcher::new(&app.config)?;
    let fetched = fetcher.fetch_content(&args.source).await?;

    let document = library.import(fetched).await?;
    let pages = Paginator::new(app.config.page_size)?.paginate(&document.content);

    info!(
        "Imported '{}' as {} ({} pages)",
        document.name,
        document.id,
        pages.len()
    );
    println!("{}", document.id);
    Ok(())
}

async fn handle_library_command(cli: &Cli) -> Result<()> {
    let app = build_app(cli).await?;
    let library = app.library()?;
    let documents = library.list().await?;

    if documents.is_empty() {
        println!("Library is empty.");
        return Ok(());
    }

    let paginator = Paginator::new(app.config.page_size)?;
    println!("\n=== Library ({} documents) ===", documents.len());
    for document in &documents {
        println!(
            "  {}  {}  {} pages  {}",
            document.id,
            document.timestamp.format("%Y-%m-%d %H:%M"),
            paginator.paginate(&document.content).len(),
            document.name
        );
    }

    Ok(())
}

async fn handle_remove_command(cli: &Cli, args: &RemoveArgs) -> Result<()> {
    let app = build_app(cli).await?;
    app.library()?.remove(&args.id).await?;
    println!("Removed {}", args.id);
    Ok(())
}

async fn handle_position_command(cli: &Cli) -> Result<()> {
    let app = build_app(cli).await?;
    let session = app.session()?;
    let (local, remote) = session.saved_positions().await;

    println!("\n=== Saved Positions ===");
    println!("Device:  {}", describe_position(local.as_ref()));
    match &app.account {
        Some(account) => println!(
            "Account ({}): {}",
            account.owner_id,
            describe_position(remote.as_ref())
        ),
        None => println!("Account: not signed in"),
    }

    Ok(())
}

async fn handle_read_command(cli: &Cli, args: &ReadArgs) -> Result<()> {
    let app = build_app(cli).await?;
    let mut session = app.session()?;
    let explicit = args.page.map(|page| page.saturating_sub(1));

    let decision = match (&args.source, &args.doc) {
        (Some(source), _) => {
            let document = fetch_unsaved_document(&app.config, source).await?;
            Some(session.open(document, explicit).await?)
        }
        (None, Some(id)) => {
            let document = app.library()?.get(id).await?;
            Some(session.open(document, explicit).await?)
        }
        (None, None) => session.resume().await?,
    };

    let Some(decision) = decision else {
        println!("Nothing to resume. Pass a SOURCE or --doc ID.");
        return Ok(());
    };

    info!(
        "Opened at page {} ({:?}{})",
        decision.page_index + 1,
        decision.source,
        if decision.clamped { ", clamped" } else { "" }
    );

    // The terminal shows the restored page in full.
    session.handle_viewport(ViewportEvent::new(decision.page_index, true, 1.0));
    print_current_page(&session);
    println!("Commands: next | prev | view <page> [ratio] | show | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        let current = session.current_page();

        let event = match parts.next() {
            Some("next") | Some("n") => match next_page(current, session.pages().len()) {
                Some(page) => ViewportEvent::new(page, true, 1.0),
                None => {
                    println!("Already on the last page.");
                    continue;
                }
            },
            Some("prev") | Some("p") => ViewportEvent::new(current.saturating_sub(1), true, 1.0),
            Some("view") | Some("v") => {
                let page = parts.next().and_then(|p| p.parse::<usize>().ok());
                let ratio = parts
                    .next()
                    .and_then(|r| r.parse::<f64>().ok())
                    .unwrap_or(1.0);
                match page {
                    Some(page) if page > 0 => ViewportEvent::new(page - 1, true, ratio),
                    _ => {
                        println!("Usage: view <page> [ratio]");
                        continue;
                    }
                }
            }
            Some("show") | Some("s") => {
                print_current_page(&session);
                continue;
            }
            Some("quit") | Some("q") => break,
            Some(other) => {
                println!("Unknown command: {}", other);
                continue;
            }
            None => continue,
        };

        if session.handle_viewport(event) {
            print_current_page(&session);
        }
    }

    session.flush().await;
    session.close();
    Ok(())
}

async fn fetch_unsaved_document(config: &ReaderConfig, source: &str) -> Result<Document> {
    ContentFetcher::validate_source(source)?;
    let fetched = ContentFetcher::new(config)?.fetch_content(source).await?;

    Ok(Document {
        id: uuid::Uuid::new_v4().to_string(),
        name: fetched.name,
        content: fetched.content,
        timestamp: chrono::Utc::now(),
    })
}

fn print_current_page(session: &ReadingSession) {
    let (Some(document), Some(page)) = (session.document(), session.current_page_content())
    else {
        return;
    };

    println!(
        "\n--- {} | page {}/{} ---",
        document.name,
        page.index + 1,
        session.pages().len()
    );
    println!("{}", page.content);
}

/// The page after `current`, or `None` on the last page.
fn next_page(current: usize, page_count: usize) -> Option<usize> {
    let next = current + 1;
    (next < page_count).then_some(next)
}

fn describe_position(position: Option<&ReadingPosition>) -> String {
    match position {
        Some(p) => format!(
            "document {} page {} (saved {})",
            p.document_id,
            p.page_index + 1,
            p.timestamp.to_rfc3339()
        ),
        None => "none".to_string(),
    }
}

fn preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
