use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nq")]
#[command(about = "Novel Quest: paginate documents and read them with saved reading positions")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the device store and account data
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Signed-in user; enables the account library and remote positions
    #[arg(short, long, global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Words per page
    #[arg(long, global = true, value_name = "N")]
    pub page_size: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Paginate a document and report its pages
    Paginate(PaginateArgs),

    /// Import a document into the user's library
    Import(ImportArgs),

    /// List documents in the user's library
    Library,

    /// Remove a document from the user's library
    Remove(RemoveArgs),

    /// Open a reading session (resumes the last document if none is given)
    Read(ReadArgs),

    /// Show saved reading positions
    Position,
}

#[derive(Args)]
pub struct PaginateArgs {
    /// Input source (file path, PDF, or URL)
    #[arg(required = true, value_name = "SOURCE")]
    pub source: String,

    /// Show per-page word counts and previews
    #[arg(long)]
    pub detailed: bool,

    /// Write the pages and statistics to a JSON file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Input source (file path, PDF, or URL)
    #[arg(required = true, value_name = "SOURCE")]
    pub source: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Document id, as shown by `library`
    #[arg(required = true, value_name = "ID")]
    pub id: String,
}

#[derive(Args)]
pub struct ReadArgs {
    /// Input source to read without importing it
    #[arg(value_name = "SOURCE", conflicts_with = "doc")]
    pub source: Option<String>,

    /// Library document id to read
    #[arg(long, value_name = "ID")]
    pub doc: Option<String>,

    /// Start on this page (1-based), ignoring saved positions
    #[arg(long, value_name = "N")]
    pub page: Option<usize>,
}
