use std::path::Path;

use futures::stream::{self, StreamExt};
use log::{error, info};

use crate::{
    downloader::{BookDownloader, BookFailure, BookReport},
    error::{LitresError, Result},
};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// How many books may be downloaded at the same time.
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// One entry per input url, in input order.
    pub outcomes: Vec<std::result::Result<BookReport, BookFailure>>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Book urls from a text file: one per line, blank lines and `#` comments skipped.
pub async fn read_url_list(path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LitresError::filesystem(path, e))?;
    Ok(parse_url_list(&text))
}

pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Runs the downloader over many urls. A failed book is recorded and the batch moves on.
pub struct BatchRunner<'a> {
    downloader: &'a BookDownloader<'a>,
    options: BatchOptions,
}

impl<'a> BatchRunner<'a> {
    pub fn new(downloader: &'a BookDownloader<'a>, options: BatchOptions) -> Self {
        Self {
            downloader,
            options,
        }
    }

    pub async fn run(&self, urls: &[String]) -> BatchSummary {
        let total = urls.len();
        info!("Found {} urls to process", total);

        let outcomes = stream::iter(urls.iter().enumerate())
            .map(|(idx, url)| async move {
                info!("Processing url {}/{}: {}", idx + 1, total, url);
                let outcome = self.downloader.download(url).await;
                if let Err(failure) = &outcome {
                    error!("Failed to download book: {}", failure);
                    self.downloader.report_failure(failure).await;
                }
                outcome
            })
            .buffered(self.options.jobs.max(1))
            .collect::<Vec<_>>()
            .await;

        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        let summary = BatchSummary {
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        };

        info!("Download summary:");
        info!("Total urls processed: {}", summary.total());
        info!("Successfully downloaded: {}", summary.succeeded);
        info!("Failed to download: {}", summary.failed);
        summary
    }
}
