mod snapshot;
mod token;

use std::{
    io,
    path::{Path, PathBuf},
    process,
};

pub use snapshot::SnapshotManager;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Writes `contents` to a uniquely named sibling of `path` and renames it into
/// place, so readers never observe a half-written file and concurrent writers
/// never share a temp file.
///
/// With `private` set the file is readable by its owner only (unix).
async fn write_atomic(path: &Path, contents: &str, private: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    let tmp = tmp_path(path);
    let result = async {
        if private {
            restrict_permissions(&tmp).await?;
        }
        async_fs::write(&tmp, contents).await?;
        async_fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        let _ = async_fs::remove_file(&tmp).await;
    }
    result
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(
        ".{}.{:08x}.tmp",
        process::id(),
        rand::random::<u32>()
    ));
    PathBuf::from(name)
}

/// Creates `tmp` empty with mode `0600` before any content is written.
#[cfg(unix)]
async fn restrict_permissions(tmp: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    async_fs::write(tmp, "").await?;
    async_fs::set_permissions(tmp, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_tmp: &Path) -> io::Result<()> {
    Ok(())
}
