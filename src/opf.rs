use std::path::{Path, PathBuf};

use anyhow::Context;
use askama::Template;

use crate::{
    book::BookInfo,
    error::{LitresError, Result},
    templates::MetadataOpf,
};

pub const METADATA_FILE: &str = "metadata.opf";
const LANGUAGE: &str = "ru";

pub fn render_metadata(book: &BookInfo) -> Result<String> {
    Ok(MetadataOpf {
        book,
        language: LANGUAGE,
    }
    .render()
    .context("failed to render metadata.opf")?)
}

/// Write `metadata.opf` describing `book` into `folder`.
pub async fn write_metadata(folder: &Path, book: &BookInfo) -> Result<PathBuf> {
    let path = folder.join(METADATA_FILE);
    let xml = render_metadata(book)?;
    tokio::fs::write(&path, xml)
        .await
        .map_err(|e| LitresError::filesystem(&path, e))?;
    Ok(path)
}
