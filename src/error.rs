use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LitresError {
    #[error("Request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("Failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog request failed: {status} ({body}) GET {url}")]
    RemoteApi {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to download file {url}: {reason}")]
    Transfer { url: String, reason: String },
    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid session credentials: {0}")]
    Credentials(String),
    #[error("Unable to find a book id in url: {0}")]
    InvalidBookUrl(String),
    #[error("Download cancelled")]
    Cancelled,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LitresError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LitresError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Errors that make every further book attempt pointless.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, LitresError::Credentials(_) | LitresError::Cancelled)
    }
}

pub type Result<T> = anyhow::Result<T, LitresError>;
