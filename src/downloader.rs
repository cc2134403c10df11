use std::{
    fmt,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    book::{book_id_from_url, BookInfo},
    client::{Authenticated, LitresClient},
    error::LitresError,
    fetch::{until_cancelled, AssetFetcher},
    fs_utils, opf,
    notify::Notifier,
    paths::{create_book_folder, sanitize_segment},
    progress::ProgressReporter,
};

pub const COVER_FILE: &str = "cover.jpg";

/// Where a book download currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookStage {
    ResolvingMetadata,
    PreparingFolder,
    FetchingCover,
    WritingMetadata,
    EnumeratingFiles,
    /// Index into the ordered file list.
    FetchingFiles(usize),
    Done,
}

impl fmt::Display for BookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookStage::ResolvingMetadata => write!(f, "resolving metadata"),
            BookStage::PreparingFolder => write!(f, "preparing folder"),
            BookStage::FetchingCover => write!(f, "fetching cover"),
            BookStage::WritingMetadata => write!(f, "writing metadata"),
            BookStage::EnumeratingFiles => write!(f, "listing files"),
            BookStage::FetchingFiles(idx) => write!(f, "fetching file #{}", idx + 1),
            BookStage::Done => write!(f, "done"),
        }
    }
}

/// A book that could not be completed.
#[derive(Error, Debug)]
#[error("{url}: {stage} failed: {source}")]
pub struct BookFailure {
    pub url: String,
    pub stage: BookStage,
    pub source: LitresError,
}

#[derive(Debug, Clone)]
pub struct BookReport {
    pub book: BookInfo,
    pub folder: PathBuf,
    pub files: usize,
    pub bytes: u64,
    /// Best effort steps that did not work out.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output: PathBuf,
    pub fix_permissions: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from("."),
            fix_permissions: cfg!(unix),
        }
    }
}

/// Downloads one book at a time: metadata, folder, cover, `metadata.opf`, then every audio
/// file in catalog order. The first failing file aborts the book.
pub struct BookDownloader<'a> {
    client: &'a LitresClient<Authenticated>,
    options: &'a DownloadOptions,
    progress: &'a dyn ProgressReporter,
    notifier: &'a dyn Notifier,
    cancel: CancellationToken,
}

impl<'a> BookDownloader<'a> {
    pub fn new(
        client: &'a LitresClient<Authenticated>,
        options: &'a DownloadOptions,
        progress: &'a dyn ProgressReporter,
        notifier: &'a dyn Notifier,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            options,
            progress,
            notifier,
            cancel,
        }
    }

    async fn advisory(&self, warnings: &mut Vec<String>, message: String) {
        warn!("{}", message);
        self.notifier.notify(&message).await;
        warnings.push(message);
    }

    /// Tell the notifier which book failed. Cancellation is reported once by the caller.
    pub async fn report_failure(&self, failure: &BookFailure) {
        if !matches!(failure.source, LitresError::Cancelled) {
            self.notifier.notify(&format!("Error: {}", failure)).await;
        }
    }

    async fn fetch_cover(&self, book: &BookInfo, folder: &Path) -> Result<(), LitresError> {
        let url = self.client.cover_url(book)?;
        AssetFetcher::new(self.client, self.progress, self.cancel.clone())
            .fetch(&url, &folder.join(COVER_FILE))
            .await?;
        Ok(())
    }

    pub async fn download(&self, url: &str) -> Result<BookReport, BookFailure> {
        let mut stage = BookStage::ResolvingMetadata;
        let fail = |stage: BookStage| {
            move |source: LitresError| BookFailure {
                url: url.to_string(),
                stage,
                source,
            }
        };

        if self.cancel.is_cancelled() {
            return Err(fail(stage)(LitresError::Cancelled));
        }

        let book_id = book_id_from_url(url).map_err(fail(stage))?;
        let book = until_cancelled(&self.cancel, self.client.fetch_book_info(&book_id))
            .await
            .map_err(fail(stage))?;
        info!("Resolved book {}: {} ({})", book_id, book.title, book.author);
        self.notifier
            .notify(&format!(
                "Starting download:\n{}\nauthor: {}",
                book.title, book.author
            ))
            .await;

        stage = BookStage::PreparingFolder;
        debug!("Book {}: {}", book_id, stage);
        let folder = create_book_folder(&self.options.output, &book)
            .await
            .map_err(fail(stage))?;
        info!("Downloading files into {}", folder.display());

        let mut warnings = Vec::new();

        stage = BookStage::FetchingCover;
        debug!("Book {}: {}", book_id, stage);
        if book.cover.is_empty() {
            debug!("Book {} has no cover", book_id);
        } else if let Err(err) = self.fetch_cover(&book, &folder).await {
            if matches!(err, LitresError::Cancelled) {
                return Err(fail(stage)(err));
            }
            self.advisory(&mut warnings, format!("Cover of {} skipped: {}", book.title, err))
                .await;
        }

        stage = BookStage::WritingMetadata;
        debug!("Book {}: {}", book_id, stage);
        if let Err(err) = opf::write_metadata(&folder, &book).await {
            self.advisory(
                &mut warnings,
                format!("{} of {} skipped: {}", opf::METADATA_FILE, book.title, err),
            )
            .await;
        }

        stage = BookStage::EnumeratingFiles;
        debug!("Book {}: {}", book_id, stage);
        let tasks = until_cancelled(&self.cancel, self.client.fetch_download_tasks(&book_id))
            .await
            .map_err(fail(stage))?;
        info!("Book {} has {} files", book_id, tasks.len());

        let fetcher = AssetFetcher::new(self.client, self.progress, self.cancel.clone());
        let mut bytes = 0;
        for (idx, task) in tasks.iter().enumerate() {
            stage = BookStage::FetchingFiles(idx);
            let fallback = format!("{}.mp3", task.file_id);
            let dest = folder.join(sanitize_segment(&task.filename, &fallback));
            bytes += fetcher.fetch(&task.url, &dest).await.map_err(fail(stage))?;
        }

        stage = BookStage::Done;
        debug!("Book {}: {}", book_id, stage);
        self.notifier
            .notify(&format!(
                "Finished download:\n{}\nauthor: {}",
                book.title, book.author
            ))
            .await;

        if self.options.fix_permissions {
            if let Err(err) = fs_utils::open_permissions_async(&folder).await {
                self.advisory(
                    &mut warnings,
                    format!("Permissions of {} unchanged: {}", folder.display(), err),
                )
                .await;
            }
        }

        Ok(BookReport {
            book,
            folder,
            files: tasks.len(),
            bytes,
            warnings,
        })
    }
}
