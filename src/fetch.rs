use std::{fmt::Display, future::Future, path::Path};

use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use log::{debug, error, info};
use reqwest::Url;
use tokio::{fs::File, io::AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::{
    client::{Authenticated, LitresClient},
    error::{LitresError, Result},
    progress::{FileProgress, ProgressReporter},
};

/// Bytes written (and reported) per step.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Streams single files to disk with the session of `client`.
pub struct AssetFetcher<'a> {
    client: &'a LitresClient<Authenticated>,
    progress: &'a dyn ProgressReporter,
    cancel: CancellationToken,
}

impl<'a> AssetFetcher<'a> {
    pub fn new(
        client: &'a LitresClient<Authenticated>,
        progress: &'a dyn ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            progress,
            cancel,
        }
    }

    /// Download `url` into `dest`, replacing any existing file. Returns the number of bytes written.
    pub async fn fetch(&self, url: &Url, dest: &Path) -> Result<u64> {
        if self.cancel.is_cancelled() {
            return Err(LitresError::Cancelled);
        }
        info!("Downloading {}", url);

        let response = until_cancelled(&self.cancel, async {
            self.client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| LitresError::Transfer {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
        })
        .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = LitresError::Transfer {
                url: url.to_string(),
                reason: format!("{} ({})", status, body),
            };
            error!("{}", err);
            return Err(err);
        }

        let expected = response.content_length();
        let name = dest
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let mut progress = self.progress.start_file(&name, expected);

        let result = write_stream(
            response.bytes_stream(),
            expected,
            url.as_str(),
            dest,
            progress.as_mut(),
            &self.cancel,
        )
        .await;

        match &result {
            Ok(written) => {
                progress.finish();
                debug!("Saved {} bytes to {}", written, dest.display());
            }
            Err(err) => {
                progress.abandon();
                error!("{}", err);
            }
        }
        result
    }
}

/// Drive `fut` unless `cancel` fires first.
pub async fn until_cancelled<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LitresError::Cancelled),
        result = fut => result,
    }
}

/// Write every chunk of `stream` to a freshly truncated `dest`, then compare the byte count
/// with `expected` when the server announced one.
pub async fn write_stream<S, E>(
    stream: S,
    expected: Option<u64>,
    url: &str,
    dest: &Path,
    progress: &mut dyn FileProgress,
    cancel: &CancellationToken,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    pin_mut!(stream);
    let mut file = File::create(dest)
        .await
        .map_err(|e| LitresError::filesystem(dest, e))?;
    let mut written: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LitresError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else { break };
        let chunk = chunk.map_err(|e| LitresError::Transfer {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        for block in chunk.chunks(BLOCK_SIZE) {
            file.write_all(block)
                .await
                .map_err(|e| LitresError::filesystem(dest, e))?;
            written += block.len() as u64;
            progress.set_written(written);
        }
    }

    file.flush()
        .await
        .map_err(|e| LitresError::filesystem(dest, e))?;

    match expected {
        Some(expected) if expected != written => Err(LitresError::Transfer {
            url: url.to_string(),
            reason: format!(
                "failed to download file: expected {} bytes, received {}",
                expected, written
            ),
        }),
        _ => Ok(written),
    }
}
