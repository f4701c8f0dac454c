use thiserror::Error;

#[derive(Error, Debug)]
pub enum NovelQuestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("PDF extraction error: {reason}")]
    Pdf { reason: String },

    #[error("HTTP status error: {status}")]
    HttpStatus { status: u16 },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("This operation requires a signed-in user (use --user)")]
    NotAuthenticated,

    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NovelQuestError>;
