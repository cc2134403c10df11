use std::path::{Path, PathBuf};

use sanitize_filename::Options;

use crate::{
    book::BookInfo,
    error::{LitresError, Result},
};

const SANITIZE: Options<'static> = Options {
    truncate: true,
    windows: true,
    replacement: "",
};

/// Make `name` usable as a single path component. Falls back to `fallback`
/// when nothing printable is left.
pub fn sanitize_segment(name: &str, fallback: &str) -> String {
    let cleaned = sanitize_filename::sanitize_with_options(name.trim(), SANITIZE);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

fn leaf_name(book: &BookInfo) -> String {
    if book.series_num == 0 {
        return book.title.clone();
    }
    if book.narrator.is_empty() {
        format!("{:02} - {}", book.series_num, book.title)
    } else {
        format!("{:02} - {} - {}", book.series_num, book.title, book.narrator)
    }
}

/// `root/[author/][series/]<title>` where a numbered series entry becomes
/// `NN - <title> - <narrator>`.
pub fn plan_book_folder(root: &Path, book: &BookInfo) -> PathBuf {
    let fallback = book.id.to_string();
    let mut folder = root.to_path_buf();

    if !book.author.is_empty() {
        folder.push(sanitize_segment(&book.author, &fallback));
    }
    if !book.series.is_empty() {
        folder.push(sanitize_segment(&book.series, &fallback));
    }
    folder.push(sanitize_segment(&leaf_name(book), &fallback));
    folder
}

/// Plan the folder of `book` and create it with all parents.
pub async fn create_book_folder(root: &Path, book: &BookInfo) -> Result<PathBuf> {
    let folder = plan_book_folder(root, book);
    tokio::fs::create_dir_all(&folder)
        .await
        .map_err(|e| LitresError::filesystem(&folder, e))?;
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> BookInfo {
        BookInfo {
            id: 42,
            author: "Ivanov Ivan".to_string(),
            title: "Test Book".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn author_and_title() {
        assert_eq!(
            plan_book_folder(Path::new("/out"), &book()),
            PathBuf::from("/out/Ivanov Ivan/Test Book")
        );
    }

    #[test]
    fn numbered_series_entry() {
        let mut book = book();
        book.series = "Cycle".to_string();
        book.series_num = 2;
        book.narrator = "Smirnova Anna".to_string();
        assert_eq!(
            plan_book_folder(Path::new("/out"), &book),
            PathBuf::from("/out/Ivanov Ivan/Cycle/02 - Test Book - Smirnova Anna")
        );

        book.narrator.clear();
        assert_eq!(
            plan_book_folder(Path::new("/out"), &book),
            PathBuf::from("/out/Ivanov Ivan/Cycle/02 - Test Book")
        );
    }

    #[test]
    fn series_without_position_keeps_plain_title() {
        let mut book = book();
        book.series = "Cycle".to_string();
        assert_eq!(
            plan_book_folder(Path::new("/out"), &book),
            PathBuf::from("/out/Ivanov Ivan/Cycle/Test Book")
        );
    }

    #[test]
    fn no_author() {
        let mut book = book();
        book.author.clear();
        assert_eq!(
            plan_book_folder(Path::new("/out"), &book),
            PathBuf::from("/out/Test Book")
        );
    }

    #[test]
    fn segments_are_sanitized_independently() {
        let mut book = book();
        book.author = "AC/DC".to_string();
        book.title = "What? <Why>: \"Because\"".to_string();
        let folder = plan_book_folder(Path::new("/out"), &book);
        assert_eq!(folder, PathBuf::from("/out/ACDC/What Why Because"));
        assert_eq!(folder.components().count(), 4);
    }

    #[test]
    fn unusable_title_falls_back_to_id() {
        let mut book = book();
        book.title = "???".to_string();
        assert_eq!(
            plan_book_folder(Path::new("/out"), &book),
            PathBuf::from("/out/Ivanov Ivan/42")
        );
    }

    #[tokio::test]
    async fn creation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_book_folder(dir.path(), &book()).await.unwrap();
        let second = create_book_folder(dir.path(), &book()).await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn parent_that_is_a_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::write(&root, b"not a dir").unwrap();
        assert!(matches!(
            create_book_folder(&root, &book()).await,
            Err(LitresError::Filesystem { .. })
        ));
    }
}
