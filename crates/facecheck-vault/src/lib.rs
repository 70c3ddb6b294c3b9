//! facecheck-vault — encrypted on-disk secure storage.
//!
//! Implements the [`facecheck_core::SecureStore`] capability with one
//! AES-256-GCM encrypted file per key, standing in for the platform
//! keystore on hosts that do not have one.

pub mod key;
pub mod vault;

pub use key::{KeyError, VaultKey};
pub use vault::FileVault;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Atomically replace `path` with `contents`.
///
/// The data goes to a temp file in the same directory (created 0600),
/// is synced, then renamed over `path`. Runs on the blocking pool.
pub(crate) async fn write_private(path: PathBuf, contents: Vec<u8>) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| err.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}
