use std::{io, path::Path};

/// Equivalent of `chmod -R ugo+rwX folder`: everybody may read and write,
/// directories (and files already executable by someone) become traversable.
#[cfg(unix)]
pub fn open_permissions(folder: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(folder)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mode = metadata.permissions().mode();
    let mut new_mode = mode | 0o666;
    if metadata.is_dir() || mode & 0o111 != 0 {
        new_mode |= 0o111;
    }
    if new_mode != mode {
        std::fs::set_permissions(folder, std::fs::Permissions::from_mode(new_mode))?;
    }

    if metadata.is_dir() {
        for entry in std::fs::read_dir(folder)? {
            open_permissions(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn open_permissions(_folder: &Path) -> io::Result<()> {
    Ok(())
}

pub async fn open_permissions_async(folder: &Path) -> io::Result<()> {
    let folder = folder.to_path_buf();
    tokio::task::spawn_blocking(move || open_permissions(&folder)).await?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn mode(path: &Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[tokio::test]
    async fn opens_files_and_directories_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let book = dir.path().join("author/book");
        std::fs::create_dir_all(&book).unwrap();
        let track = book.join("01.mp3");
        std::fs::write(&track, b"x").unwrap();
        std::fs::set_permissions(&track, std::fs::Permissions::from_mode(0o600)).unwrap();
        std::fs::set_permissions(&book, std::fs::Permissions::from_mode(0o700)).unwrap();

        open_permissions_async(&dir.path().join("author")).await.unwrap();

        assert_eq!(mode(&book), 0o777);
        assert_eq!(mode(&track), 0o666);
    }
}
